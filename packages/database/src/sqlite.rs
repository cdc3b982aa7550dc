//! `SQLite`-backed document store.
//!
//! All collections share one `documents` table. Fields are stored as a
//! JSON object in a text column; the server timestamp is stored as a
//! fixed-width RFC 3339 string so that lexical order matches time order.
//! Uses `switchy_database`, following the same patterns as the
//! conversation storage this layout was modelled on.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use moosicbox_json_utils::database::ToValue as _;
use switchy_database::{Database, DatabaseValue};
use switchy_database_connection::init_sqlite_rusqlite;
use tokio::sync::broadcast;

use crate::{
    ChangeFeed, Collection, Document, DocumentStore, Fields, StoreError, server_timestamp,
    strip_reserved,
};

/// Default path for the document database.
pub const DEFAULT_DB_PATH: &str = "data/alert_sphere.db";

/// A [`DocumentStore`] persisted in a `SQLite` file.
pub struct SqliteStore {
    db: Box<dyn Database>,
    feed: ChangeFeed,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore").finish_non_exhaustive()
    }
}

fn db_err(e: impl std::fmt::Display) -> StoreError {
    StoreError::Database(e.to_string())
}

fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Database(format!("Invalid created_at {s:?}: {e}")))
}

/// Binds a guard value the way `json_extract` reports it.
fn guard_value(expected: Option<&serde_json::Value>) -> Result<DatabaseValue, StoreError> {
    match expected {
        None | Some(serde_json::Value::Null) => Ok(DatabaseValue::Null),
        Some(serde_json::Value::String(s)) => Ok(DatabaseValue::String(s.clone())),
        Some(serde_json::Value::Number(n)) => n
            .as_i64()
            .map(DatabaseValue::Int64)
            .or_else(|| n.as_f64().map(DatabaseValue::Real64))
            .ok_or_else(|| StoreError::InvalidFields {
                message: format!("unsupported guard number {n}"),
            }),
        Some(other) => Err(StoreError::InvalidFields {
            message: format!("unsupported guard value {other}"),
        }),
    }
}

fn parse_fields(json: &str) -> Result<Fields, StoreError> {
    match serde_json::from_str(json)? {
        serde_json::Value::Object(map) => Ok(map),
        _ => Err(StoreError::InvalidFields {
            message: "stored fields are not an object".to_string(),
        }),
    }
}

impl SqliteStore {
    /// Opens (or creates) the database at `path` and ensures the schema
    /// exists.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the database cannot be opened or schema
    /// creation fails.
    pub async fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = init_sqlite_rusqlite(Some(path)).map_err(db_err)?;
        ensure_schema(db.as_ref()).await?;

        log::info!("Opened document store at {}", path.display());

        Ok(Self {
            db,
            feed: ChangeFeed::new(),
        })
    }

    fn row_to_document(row: &switchy_database::Row) -> Result<Document, StoreError> {
        let id: String = row.to_value("id").map_err(db_err)?;
        let created_at: String = row.to_value("created_at").map_err(db_err)?;
        let fields: String = row.to_value("fields").map_err(db_err)?;

        Ok(Document {
            id,
            created_at: parse_timestamp(&created_at)?,
            fields: parse_fields(&fields)?,
        })
    }
}

/// Creates the documents table if it doesn't already exist.
async fn ensure_schema(db: &dyn Database) -> Result<(), StoreError> {
    db.exec_raw(
        "CREATE TABLE IF NOT EXISTS documents (
            seq         INTEGER PRIMARY KEY AUTOINCREMENT,
            id          TEXT NOT NULL UNIQUE,
            collection  TEXT NOT NULL,
            created_at  TEXT NOT NULL,
            fields      TEXT NOT NULL
        )",
    )
    .await
    .map_err(db_err)?;

    db.exec_raw(
        "CREATE INDEX IF NOT EXISTS idx_documents_collection_created
         ON documents (collection, created_at DESC, seq DESC)",
    )
    .await
    .map_err(db_err)?;

    Ok(())
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn create(&self, collection: Collection, fields: Fields) -> Result<Document, StoreError> {
        let doc = Document {
            id: uuid::Uuid::new_v4().to_string(),
            created_at: server_timestamp(),
            fields: strip_reserved(fields),
        };

        self.db
            .exec_raw_params(
                "INSERT INTO documents (id, collection, created_at, fields)
                 VALUES ($1, $2, $3, $4)",
                &[
                    DatabaseValue::String(doc.id.clone()),
                    DatabaseValue::String(collection.as_str().to_string()),
                    DatabaseValue::String(format_timestamp(doc.created_at)),
                    DatabaseValue::String(serde_json::to_string(&doc.fields)?),
                ],
            )
            .await
            .map_err(db_err)?;

        log::debug!("Created {collection}/{}", doc.id);
        self.feed.notify(collection);
        Ok(doc)
    }

    async fn list(&self, collection: Collection) -> Result<Vec<Document>, StoreError> {
        let rows = self
            .db
            .query_raw_params(
                "SELECT id, created_at, fields FROM documents
                 WHERE collection = $1
                 ORDER BY created_at DESC, seq DESC",
                &[DatabaseValue::String(collection.as_str().to_string())],
            )
            .await
            .map_err(db_err)?;

        rows.iter().map(Self::row_to_document).collect()
    }

    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Document>, StoreError> {
        let rows = self
            .db
            .query_raw_params(
                "SELECT id, created_at, fields FROM documents
                 WHERE collection = $1 AND id = $2",
                &[
                    DatabaseValue::String(collection.as_str().to_string()),
                    DatabaseValue::String(id.to_string()),
                ],
            )
            .await
            .map_err(db_err)?;

        rows.first().map(Self::row_to_document).transpose()
    }

    async fn update(
        &self,
        collection: Collection,
        id: &str,
        fields: Fields,
    ) -> Result<(), StoreError> {
        let mut doc = self
            .get(collection, id)
            .await?
            .ok_or_else(|| StoreError::NotFound {
                collection,
                id: id.to_string(),
            })?;
        doc.fields.extend(strip_reserved(fields));

        self.db
            .exec_raw_params(
                "UPDATE documents SET fields = $1 WHERE collection = $2 AND id = $3",
                &[
                    DatabaseValue::String(serde_json::to_string(&doc.fields)?),
                    DatabaseValue::String(collection.as_str().to_string()),
                    DatabaseValue::String(id.to_string()),
                ],
            )
            .await
            .map_err(db_err)?;

        log::debug!("Updated {collection}/{id}");
        self.feed.notify(collection);
        Ok(())
    }

    async fn update_if(
        &self,
        collection: Collection,
        id: &str,
        field: &str,
        expected: Option<&serde_json::Value>,
        fields: Fields,
    ) -> Result<bool, StoreError> {
        let rows = self
            .db
            .query_raw_params(
                "UPDATE documents SET fields = json_patch(fields, $1)
                 WHERE collection = $2 AND id = $3 AND json_extract(fields, $4) IS $5
                 RETURNING id",
                &[
                    DatabaseValue::String(serde_json::to_string(&strip_reserved(fields))?),
                    DatabaseValue::String(collection.as_str().to_string()),
                    DatabaseValue::String(id.to_string()),
                    DatabaseValue::String(format!("$.{field}")),
                    guard_value(expected)?,
                ],
            )
            .await
            .map_err(db_err)?;

        if rows.is_empty() {
            if self.get(collection, id).await?.is_none() {
                return Err(StoreError::NotFound {
                    collection,
                    id: id.to_string(),
                });
            }
            log::debug!("Skipped update of {collection}/{id}: {field} changed");
            return Ok(false);
        }

        log::debug!("Updated {collection}/{id}");
        self.feed.notify(collection);
        Ok(true)
    }

    fn changes(&self, collection: Collection) -> broadcast::Receiver<()> {
        self.feed.subscribe(collection)
    }
}
