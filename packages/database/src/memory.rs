//! In-process document store.
//!
//! Holds every document in a single vector behind a [`RwLock`]. Used for
//! local development (when no database path is configured) and in tests.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::{RwLock, broadcast};

use crate::{
    ChangeFeed, Collection, Document, DocumentStore, Fields, StoreError, server_timestamp,
    strip_reserved,
};

#[derive(Debug)]
struct Entry {
    collection: Collection,
    seq: u64,
    doc: Document,
}

/// A [`DocumentStore`] that keeps documents in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<Vec<Entry>>,
    next_seq: AtomicU64,
    feed: ChangeFeed,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn create(&self, collection: Collection, fields: Fields) -> Result<Document, StoreError> {
        let doc = Document {
            id: uuid::Uuid::new_v4().to_string(),
            created_at: server_timestamp(),
            fields: strip_reserved(fields),
        };

        self.entries.write().await.push(Entry {
            collection,
            seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
            doc: doc.clone(),
        });

        log::debug!("Created {collection}/{}", doc.id);
        self.feed.notify(collection);
        Ok(doc)
    }

    async fn list(&self, collection: Collection) -> Result<Vec<Document>, StoreError> {
        let entries = self.entries.read().await;
        let mut matching: Vec<&Entry> = entries
            .iter()
            .filter(|e| e.collection == collection)
            .collect();
        matching.sort_by(|a, b| {
            b.doc
                .created_at
                .cmp(&a.doc.created_at)
                .then(b.seq.cmp(&a.seq))
        });
        Ok(matching.into_iter().map(|e| e.doc.clone()).collect())
    }

    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Document>, StoreError> {
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .find(|e| e.collection == collection && e.doc.id == id)
            .map(|e| e.doc.clone()))
    }

    async fn update(
        &self,
        collection: Collection,
        id: &str,
        fields: Fields,
    ) -> Result<(), StoreError> {
        {
            let mut entries = self.entries.write().await;
            let entry = entries
                .iter_mut()
                .find(|e| e.collection == collection && e.doc.id == id)
                .ok_or_else(|| StoreError::NotFound {
                    collection,
                    id: id.to_string(),
                })?;
            entry.doc.fields.extend(strip_reserved(fields));
        }

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
        {
            let mut entries = self.entries.write().await;
            let entry = entries
                .iter_mut()
                .find(|e| e.collection == collection && e.doc.id == id)
                .ok_or_else(|| StoreError::NotFound {
                    collection,
                    id: id.to_string(),
                })?;
            if entry.doc.fields.get(field) != expected {
                log::debug!("Skipped update of {collection}/{id}: {field} changed");
                return Ok(false);
            }
            entry.doc.fields.extend(strip_reserved(fields));
        }

        log::debug!("Updated {collection}/{id}");
        self.feed.notify(collection);
        Ok(true)
    }

    fn changes(&self, collection: Collection) -> broadcast::Receiver<()> {
        self.feed.subscribe(collection)
    }
}
