//! Live collection subscriptions.
//!
//! [`subscribe`] is the single adapter used for every record kind: it
//! opens a standing query on one collection and yields the complete,
//! newest-first list each time the collection changes. Snapshots always
//! replace the previous list wholesale; there are no partial updates.
//!
//! [`LiveList`] drives a subscription on a background task and exposes
//! the latest [`ListState`], which reports loading until the first
//! snapshot arrives.

use std::marker::PhantomData;
use std::sync::Arc;

use futures::Stream;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use crate::{DocumentStore, Record, StoreError};

/// A standing query on the collection of `T`.
///
/// Dropping the query (or calling [`LiveQuery::unsubscribe`]) releases it.
pub struct LiveQuery<T> {
    store: Arc<dyn DocumentStore>,
    changes: broadcast::Receiver<()>,
    primed: bool,
    _record: PhantomData<fn() -> T>,
}

/// Opens a live query on `T`'s collection, ordered by creation time
/// descending.
///
/// The change subscription is taken before the first read, so no write
/// that lands between the initial snapshot and the next one is missed.
#[must_use]
pub fn subscribe<T: Record>(store: Arc<dyn DocumentStore>) -> LiveQuery<T> {
    let changes = store.changes(T::COLLECTION);
    LiveQuery {
        store,
        changes,
        primed: false,
        _record: PhantomData,
    }
}

/// Reads and decodes the full current list of `T`.
///
/// Documents that fail to decode are skipped with a warning so that one
/// malformed record does not blank the whole list.
///
/// # Errors
///
/// Returns [`StoreError`] if the store cannot be read.
pub async fn read_snapshot<T: Record>(store: &dyn DocumentStore) -> Result<Vec<T>, StoreError> {
    let docs = store.list(T::COLLECTION).await?;
    let mut records = Vec::with_capacity(docs.len());
    for doc in &docs {
        match T::decode(doc) {
            Ok(record) => records.push(record),
            Err(e) => log::warn!("Skipping undecodable {}/{}: {e}", T::COLLECTION, doc.id),
        }
    }
    Ok(records)
}

impl<T: Record> LiveQuery<T> {
    /// Waits for the next snapshot.
    ///
    /// The first call returns the current list immediately. Later calls
    /// wait for a change; any burst of changes that arrived in the
    /// meantime collapses into a single re-read. Returns `None` once the
    /// store's change feed has shut down.
    pub async fn next_snapshot(&mut self) -> Option<Result<Vec<T>, StoreError>> {
        if self.primed {
            match self.changes.recv().await {
                Ok(()) | Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => return None,
            }
            loop {
                match self.changes.try_recv() {
                    Ok(()) | Err(TryRecvError::Lagged(_)) => {}
                    Err(TryRecvError::Empty | TryRecvError::Closed) => break,
                }
            }
        }
        self.primed = true;
        Some(read_snapshot::<T>(self.store.as_ref()).await)
    }

    /// Converts the query into a stream of snapshots.
    pub fn into_stream(self) -> impl Stream<Item = Result<Vec<T>, StoreError>> {
        let mut query = self;
        async_stream::stream! {
            while let Some(snapshot) = query.next_snapshot().await {
                yield snapshot;
            }
        }
    }

    /// Releases the subscription.
    pub fn unsubscribe(self) {
        log::debug!("Unsubscribed from {}", T::COLLECTION);
        drop(self);
    }
}

/// The list held by a view for one collection.
#[derive(Debug, Clone, PartialEq)]
pub struct ListState<T> {
    items: Option<Vec<T>>,
}

impl<T> Default for ListState<T> {
    fn default() -> Self {
        Self { items: None }
    }
}

impl<T> ListState<T> {
    /// A list that has not received its first snapshot.
    #[must_use]
    pub const fn loading() -> Self {
        Self { items: None }
    }

    /// `true` only before the first snapshot has been applied.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.items.is_none()
    }

    /// Current items; empty while loading.
    #[must_use]
    pub fn items(&self) -> &[T] {
        self.items.as_deref().unwrap_or_default()
    }

    /// Number of items currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items().len()
    }

    /// Whether no items are currently held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items().is_empty()
    }

    /// Replaces the held list with `snapshot`.
    pub fn apply(&mut self, snapshot: Vec<T>) {
        self.items = Some(snapshot);
    }
}

/// A live query driven on a background task, publishing each snapshot
/// into a shared [`ListState`].
///
/// Must be opened from within a Tokio runtime. Dropping the list (or
/// calling [`LiveList::unsubscribe`]) stops the task and releases the
/// subscription.
pub struct LiveList<T> {
    state: watch::Receiver<ListState<T>>,
    task: JoinHandle<()>,
}

impl<T: Record> LiveList<T> {
    /// Subscribes to `T`'s collection and starts applying snapshots.
    #[must_use]
    pub fn open(store: Arc<dyn DocumentStore>) -> Self {
        let (tx, rx) = watch::channel(ListState::loading());
        let mut query = subscribe::<T>(store);

        let task = tokio::spawn(async move {
            while let Some(result) = query.next_snapshot().await {
                match result {
                    Ok(items) => {
                        tx.send_modify(|state| state.apply(items));
                    }
                    Err(e) => {
                        log::error!("Failed to read {} snapshot: {e}", T::COLLECTION);
                    }
                }
            }
        });

        Self { state: rx, task }
    }

    /// A copy of the current list state.
    #[must_use]
    pub fn state(&self) -> ListState<T> {
        self.state.borrow().clone()
    }

    /// `true` until the first snapshot has been applied.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.state.borrow().is_loading()
    }

    /// Waits for the next snapshot to be applied.
    ///
    /// Returns `false` if the driving task has stopped.
    pub async fn changed(&mut self) -> bool {
        self.state.changed().await.is_ok()
    }

    /// Waits until the first snapshot has been applied and returns the
    /// state at that point.
    ///
    /// Returns `None` if the driving task stopped before loading.
    pub async fn loaded(&mut self) -> Option<ListState<T>> {
        self.state
            .wait_for(|state| !state.is_loading())
            .await
            .ok()
            .map(|state| state.clone())
    }

    /// Stops the driving task and releases the subscription.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl<T> Drop for LiveList<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use alert_sphere_alert_models::Broadcast;
    use futures::StreamExt as _;
    use serde_json::json;

    use super::*;
    use crate::memory::MemoryStore;
    use crate::{Collection, encode_fields};

    async fn add_broadcast(store: &dyn DocumentStore, title: &str) {
        store
            .create(
                Collection::Broadcasts,
                encode_fields(&json!({"title": title, "message": "m"})).unwrap(),
            )
            .await
            .unwrap();
    }

    #[test]
    fn list_state_loads_once() {
        let mut state = ListState::<u32>::loading();
        assert!(state.is_loading());
        assert!(state.items().is_empty());

        state.apply(vec![]);
        assert!(!state.is_loading());
        assert!(state.is_empty());

        state.apply(vec![3, 2, 1]);
        assert_eq!(state.items(), [3, 2, 1]);
        state.apply(vec![1]);
        assert_eq!(state.items(), [1]);
    }

    #[tokio::test]
    async fn first_snapshot_is_immediate_and_later_ones_follow_writes() {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        add_broadcast(store.as_ref(), "one").await;

        let mut query = subscribe::<Broadcast>(Arc::clone(&store));
        let first = query.next_snapshot().await.unwrap().unwrap();
        assert_eq!(first.len(), 1);

        add_broadcast(store.as_ref(), "two").await;
        let second = query.next_snapshot().await.unwrap().unwrap();
        let titles: Vec<&str> = second.iter().map(|b| b.title.as_str()).collect();
        assert_eq!(titles, ["two", "one"]);
    }

    #[tokio::test]
    async fn bursts_of_writes_collapse_into_one_snapshot() {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let mut query = subscribe::<Broadcast>(Arc::clone(&store));
        assert!(query.next_snapshot().await.unwrap().unwrap().is_empty());

        for i in 0..40 {
            add_broadcast(store.as_ref(), &format!("b{i}")).await;
        }

        let snapshot = query.next_snapshot().await.unwrap().unwrap();
        assert_eq!(snapshot.len(), 40);
        assert_eq!(snapshot[0].title, "b39");
    }

    #[tokio::test]
    async fn undecodable_documents_are_skipped() {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        add_broadcast(store.as_ref(), "good").await;
        store
            .create(
                Collection::Broadcasts,
                encode_fields(&json!({"title": 42})).unwrap(),
            )
            .await
            .unwrap();

        let snapshot = read_snapshot::<Broadcast>(store.as_ref()).await.unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].title, "good");
    }

    #[tokio::test]
    async fn stream_yields_snapshots() {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let mut stream = std::pin::pin!(subscribe::<Broadcast>(Arc::clone(&store)).into_stream());

        assert!(stream.next().await.unwrap().unwrap().is_empty());
        add_broadcast(store.as_ref(), "alert").await;
        assert_eq!(stream.next().await.unwrap().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn live_list_reports_loading_then_tracks_changes() {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let mut list = LiveList::<Broadcast>::open(Arc::clone(&store));

        let loaded = list.loaded().await.unwrap();
        assert!(loaded.is_empty());
        assert!(!list.is_loading());

        add_broadcast(store.as_ref(), "flood warning").await;
        assert!(list.changed().await);
        assert_eq!(list.state().items()[0].title, "flood warning");

        list.unsubscribe();
    }
}
