#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Document storage and live collection subscriptions for alert sphere.
//!
//! Records live in four named collections. A [`DocumentStore`] assigns
//! each new document an ID and a server timestamp, lists a collection
//! newest-first, applies partial field updates, and publishes a change
//! notification after every write. The [`live`] module turns those
//! notifications into full-list snapshots.
//!
//! Two stores are provided: [`memory::MemoryStore`] for development and
//! tests, and [`sqlite::SqliteStore`] backed by `switchy_database`.

pub mod live;
pub mod memory;
pub mod sqlite;

use alert_sphere_alert_models::{Broadcast, IncidentReport, RescueTeam, Resource};
use async_trait::async_trait;
use chrono::{DateTime, SubsecRound as _, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::broadcast;

/// Field map of a stored document, excluding its ID and timestamp.
pub type Fields = serde_json::Map<String, serde_json::Value>;

/// Field name under which the document ID is exposed when decoding.
pub const ID_FIELD: &str = "id";

/// Field name under which the server timestamp is exposed when decoding.
/// Also the ordering key of every collection.
pub const CREATED_AT_FIELD: &str = "createdAt";

/// Buffered change notifications per subscriber before it is marked lagged.
const CHANGE_CHANNEL_CAPACITY: usize = 16;

/// Errors that can occur during store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database query error.
    #[error("Database error: {0}")]
    Database(String),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No document with the given ID exists in the collection.
    #[error("No document {id} in {collection}")]
    NotFound {
        /// Collection that was searched.
        collection: Collection,
        /// Requested document ID.
        id: String,
    },

    /// Fields to write were not a JSON object.
    #[error("Invalid fields: {message}")]
    InvalidFields {
        /// Description of what went wrong.
        message: String,
    },
}

/// The named collections held by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Collection {
    Incidents,
    RescueTeams,
    Resources,
    Broadcasts,
}

impl Collection {
    /// Returns all collections.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Incidents,
            Self::RescueTeams,
            Self::Resources,
            Self::Broadcasts,
        ]
    }

    /// Stable name used in storage and URLs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Incidents => "incidents",
            Self::RescueTeams => "rescueTeams",
            Self::Resources => "resources",
            Self::Broadcasts => "broadcasts",
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Collection {
    type Err = UnknownCollectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| UnknownCollectionError {
                name: s.to_string(),
            })
    }
}

/// Error returned when parsing an unknown collection name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown collection: {name}")]
pub struct UnknownCollectionError {
    /// The name that was provided.
    pub name: String,
}

/// A stored document: server-assigned identity plus its fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Store-assigned unique ID.
    pub id: String,
    /// Store-assigned creation time.
    pub created_at: DateTime<Utc>,
    /// All other stored fields.
    pub fields: Fields,
}

impl Document {
    /// Decodes the document into a typed record. The ID and creation time
    /// are exposed as the `id` and `createdAt` fields.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Json`] if the fields do not match `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, StoreError> {
        let mut object = self.fields.clone();
        object.insert(
            ID_FIELD.to_string(),
            serde_json::Value::String(self.id.clone()),
        );
        object.insert(
            CREATED_AT_FIELD.to_string(),
            serde_json::to_value(self.created_at)?,
        );
        Ok(serde_json::from_value(serde_json::Value::Object(object))?)
    }
}

/// Serializes `value` into a field map suitable for [`DocumentStore::create`].
///
/// # Errors
///
/// Returns [`StoreError::InvalidFields`] if `value` does not serialize to
/// a JSON object.
pub fn encode_fields<T: Serialize>(value: &T) -> Result<Fields, StoreError> {
    match serde_json::to_value(value)? {
        serde_json::Value::Object(map) => Ok(map),
        other => Err(StoreError::InvalidFields {
            message: format!("expected an object, got {other}"),
        }),
    }
}

/// Removes fields the store assigns itself so callers cannot overwrite
/// identity or ordering.
pub(crate) fn strip_reserved(mut fields: Fields) -> Fields {
    fields.remove(ID_FIELD);
    fields.remove(CREATED_AT_FIELD);
    fields
}

/// Current time at the precision the stores persist.
pub(crate) fn server_timestamp() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// A document database with per-collection ordering and change
/// notifications.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Creates a document, assigning its ID and server timestamp.
    async fn create(&self, collection: Collection, fields: Fields) -> Result<Document, StoreError>;

    /// Lists a collection ordered by creation time, newest first.
    async fn list(&self, collection: Collection) -> Result<Vec<Document>, StoreError>;

    /// Fetches a single document.
    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Document>, StoreError>;

    /// Merges `fields` into an existing document.
    async fn update(&self, collection: Collection, id: &str, fields: Fields)
    -> Result<(), StoreError>;

    /// Merges `fields` into an existing document only if its `field`
    /// currently holds `expected` (`None` meaning absent). The check and
    /// the write happen as one step.
    ///
    /// Returns `false`, writing nothing, if the guard did not match.
    async fn update_if(
        &self,
        collection: Collection,
        id: &str,
        field: &str,
        expected: Option<&serde_json::Value>,
        fields: Fields,
    ) -> Result<bool, StoreError>;

    /// Subscribes to change notifications for a collection. One message is
    /// published after every successful write.
    fn changes(&self, collection: Collection) -> broadcast::Receiver<()>;
}

/// One broadcast channel per collection, notified after each write.
#[derive(Debug)]
pub struct ChangeFeed {
    incidents: broadcast::Sender<()>,
    rescue_teams: broadcast::Sender<()>,
    resources: broadcast::Sender<()>,
    broadcasts: broadcast::Sender<()>,
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeFeed {
    /// Creates a feed with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            incidents: broadcast::channel(CHANGE_CHANNEL_CAPACITY).0,
            rescue_teams: broadcast::channel(CHANGE_CHANNEL_CAPACITY).0,
            resources: broadcast::channel(CHANGE_CHANNEL_CAPACITY).0,
            broadcasts: broadcast::channel(CHANGE_CHANNEL_CAPACITY).0,
        }
    }

    const fn sender(&self, collection: Collection) -> &broadcast::Sender<()> {
        match collection {
            Collection::Incidents => &self.incidents,
            Collection::RescueTeams => &self.rescue_teams,
            Collection::Resources => &self.resources,
            Collection::Broadcasts => &self.broadcasts,
        }
    }

    /// Returns a receiver for future notifications on `collection`.
    #[must_use]
    pub fn subscribe(&self, collection: Collection) -> broadcast::Receiver<()> {
        self.sender(collection).subscribe()
    }

    /// Notifies all current subscribers of `collection`.
    pub fn notify(&self, collection: Collection) {
        // No receivers is not an error: nobody is watching yet.
        let _ = self.sender(collection).send(());
    }
}

/// A typed record held in a fixed collection.
pub trait Record: DeserializeOwned + Clone + Send + Sync + 'static {
    /// Collection the record lives in.
    const COLLECTION: Collection;

    /// Decodes a stored document into this record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the document does not match the record
    /// shape.
    fn decode(doc: &Document) -> Result<Self, StoreError> {
        doc.decode()
    }
}

impl Record for IncidentReport {
    const COLLECTION: Collection = Collection::Incidents;
}

impl Record for RescueTeam {
    const COLLECTION: Collection = Collection::RescueTeams;
}

impl Record for Resource {
    const COLLECTION: Collection = Collection::Resources;
}

impl Record for Broadcast {
    const COLLECTION: Collection = Collection::Broadcasts;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collection_names_round_trip() {
        for &c in Collection::all() {
            assert_eq!(c.as_str().parse::<Collection>().unwrap(), c);
        }
        assert_eq!(Collection::RescueTeams.to_string(), "rescueTeams");
        assert!("teams".parse::<Collection>().is_err());
    }

    #[test]
    fn decode_exposes_id_and_timestamp() {
        let doc = Document {
            id: "b1".to_string(),
            created_at: "2025-03-01T10:00:00Z".parse().unwrap(),
            fields: encode_fields(&serde_json::json!({
                "title": "Evacuate",
                "message": "Move to higher ground"
            }))
            .unwrap(),
        };

        let broadcast: Broadcast = doc.decode().unwrap();
        assert_eq!(broadcast.id, "b1");
        assert_eq!(broadcast.title, "Evacuate");
        assert_eq!(broadcast.created_at, doc.created_at);
    }

    #[test]
    fn encode_rejects_non_objects() {
        assert!(matches!(
            encode_fields(&"just a string"),
            Err(StoreError::InvalidFields { .. })
        ));
    }

    #[test]
    fn reserved_fields_are_stripped() {
        let fields = encode_fields(&serde_json::json!({
            "id": "forged",
            "createdAt": "1970-01-01T00:00:00Z",
            "title": "kept"
        }))
        .unwrap();
        let stripped = strip_reserved(fields);
        assert_eq!(stripped.len(), 1);
        assert!(stripped.contains_key("title"));
    }

    #[tokio::test]
    async fn feed_notifies_only_the_written_collection() {
        let feed = ChangeFeed::new();
        let mut incidents = feed.subscribe(Collection::Incidents);
        let mut teams = feed.subscribe(Collection::RescueTeams);

        feed.notify(Collection::Incidents);

        assert!(incidents.try_recv().is_ok());
        assert!(teams.try_recv().is_err());
    }
}
