//! In-process [`DocumentStore`] implementation.
//!
//! Backs tests and embedders that have no network client. Behaves like the
//! real collaborator from the core's point of view: generated document ids,
//! full-collection snapshots pushed to every live subscriber on each change,
//! newest-first ordering by `createdAt`.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::error::RemoteError;
use crate::storage::remote::{
    CollectionSnapshot, DocumentStore, SnapshotHandler, SubscriptionHandle,
};

type SharedHandler = Arc<dyn Fn(CollectionSnapshot) + Send + Sync>;

#[derive(Default)]
struct Inner {
    collections: HashMap<String, Vec<(String, serde_json::Value)>>,
    subscribers: HashMap<String, Vec<(u64, SharedHandler)>>,
    next_subscriber: u64,
}

impl Inner {
    /// Current snapshot of a collection: documents with their id merged in,
    /// sorted by `createdAt` descending; ties resolve newest-inserted first.
    fn snapshot_of(&self, collection: &str) -> CollectionSnapshot {
        let docs = match self.collections.get(collection) {
            Some(docs) => docs,
            None => return Vec::new(),
        };

        let mut indexed: Vec<(usize, i64, serde_json::Value)> = docs
            .iter()
            .enumerate()
            .map(|(idx, (id, fields))| {
                let mut doc = fields.clone();
                if let Some(map) = doc.as_object_mut() {
                    map.insert("id".to_string(), serde_json::Value::String(id.clone()));
                }
                let created_at = fields.get("createdAt").and_then(|v| v.as_i64()).unwrap_or(0);
                (idx, created_at, doc)
            })
            .collect();

        indexed.sort_by(|a, b| b.1.cmp(&a.1).then(b.0.cmp(&a.0)));
        indexed.into_iter().map(|(_, _, doc)| doc).collect()
    }

    fn handlers_of(&self, collection: &str) -> Vec<SharedHandler> {
        self.subscribers
            .get(collection)
            .map(|subs| subs.iter().map(|(_, h)| Arc::clone(h)).collect())
            .unwrap_or_default()
    }
}

/// In-memory document store with change notification.
#[derive(Clone, Default)]
pub struct MemoryDocumentStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot and subscriber list are taken under the lock; handlers run
    /// outside it so they may call back into the store.
    fn notify(&self, collection: &str) {
        let (snapshot, handlers) = {
            let inner = self.inner.lock().expect("store lock poisoned");
            (inner.snapshot_of(collection), inner.handlers_of(collection))
        };

        for handler in handlers {
            handler(snapshot.clone());
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn create(
        &self,
        collection: &str,
        fields: serde_json::Value,
    ) -> Result<String, RemoteError> {
        let id = Uuid::new_v4().to_string();
        {
            let mut inner = self.inner.lock().expect("store lock poisoned");
            inner
                .collections
                .entry(collection.to_string())
                .or_default()
                .push((id.clone(), fields));
        }
        self.notify(collection);
        Ok(id)
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), RemoteError> {
        let removed = {
            let mut inner = self.inner.lock().expect("store lock poisoned");
            match inner.collections.get_mut(collection) {
                Some(docs) => {
                    let before = docs.len();
                    docs.retain(|(doc_id, _)| doc_id != id);
                    docs.len() < before
                }
                None => false,
            }
        };

        if removed {
            self.notify(collection);
        }
        Ok(())
    }

    async fn subscribe(
        &self,
        collection: &str,
        handler: SnapshotHandler,
    ) -> Result<SubscriptionHandle, RemoteError> {
        let handler: SharedHandler = Arc::from(handler);

        let (subscriber_id, initial) = {
            let mut inner = self.inner.lock().expect("store lock poisoned");
            let subscriber_id = inner.next_subscriber;
            inner.next_subscriber += 1;
            inner
                .subscribers
                .entry(collection.to_string())
                .or_default()
                .push((subscriber_id, Arc::clone(&handler)));
            (subscriber_id, inner.snapshot_of(collection))
        };

        // Initial delivery so a new subscriber starts from the current state.
        handler(initial);

        let inner = Arc::clone(&self.inner);
        let collection = collection.to_string();
        Ok(SubscriptionHandle::new(move || {
            if let Ok(mut inner) = inner.lock() {
                if let Some(subs) = inner.subscribers.get_mut(&collection) {
                    subs.retain(|(id, _)| *id != subscriber_id);
                }
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_create_assigns_unique_ids() {
        let store = MemoryDocumentStore::new();
        let a = store
            .create("journal_entries", serde_json::json!({"createdAt": 1}))
            .await
            .unwrap();
        let b = store
            .create("journal_entries", serde_json::json!({"createdAt": 2}))
            .await
            .unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_subscriber_receives_initial_and_change_snapshots() {
        let store = MemoryDocumentStore::new();
        let deliveries = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&deliveries);
        let _sub = store
            .subscribe(
                "transactions",
                Box::new(move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .await
            .unwrap();

        // One initial delivery, then one per mutation.
        assert_eq!(deliveries.load(Ordering::SeqCst), 1);

        let id = store
            .create("transactions", serde_json::json!({"createdAt": 1}))
            .await
            .unwrap();
        store.delete("transactions", &id).await.unwrap();
        assert_eq!(deliveries.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_delete_of_absent_id_does_not_notify() {
        let store = MemoryDocumentStore::new();
        let deliveries = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&deliveries);
        let _sub = store
            .subscribe(
                "transactions",
                Box::new(move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .await
            .unwrap();

        store.delete("transactions", "no-such-id").await.unwrap();
        assert_eq!(deliveries.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unsubscribe_stops_deliveries() {
        let store = MemoryDocumentStore::new();
        let deliveries = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&deliveries);
        let sub = store
            .subscribe(
                "journal_entries",
                Box::new(move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .await
            .unwrap();

        sub.unsubscribe();
        store
            .create("journal_entries", serde_json::json!({"createdAt": 1}))
            .await
            .unwrap();
        assert_eq!(deliveries.load(Ordering::SeqCst), 1);
    }
}
