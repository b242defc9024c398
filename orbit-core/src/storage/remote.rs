//! Remote document store adapter.
//!
//! The document store itself is an external collaborator: this module only
//! defines the interface the core depends on ([`DocumentStore`]) and the
//! [`Backend`] implementation that adapts it. Reads come from a cached state
//! replaced wholesale on every subscription snapshot; mutations go through
//! `create`/`delete` under an explicit per-call timeout and a bounded retry.

use async_trait::async_trait;
use log::warn;
use serde::de::DeserializeOwned;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use shared::{
    now_epoch_secs, JournalEntry, LocalState, Mood, Transaction,
};

use crate::error::{RemoteError, StorageError};
use crate::storage::{Backend, TransactionDraft};

/// Per-user sub-collection holding journal entries.
pub const ENTRIES_COLLECTION: &str = "journal_entries";
/// Per-user sub-collection holding transactions.
pub const TRANSACTIONS_COLLECTION: &str = "transactions";

/// Full-collection snapshot as delivered by the store: one JSON document per
/// item, `id` included, sorted by creation time descending.
pub type CollectionSnapshot = Vec<serde_json::Value>;

/// Callback invoked with a fresh snapshot on every collection change.
pub type SnapshotHandler = Box<dyn Fn(CollectionSnapshot) + Send + Sync>;

/// Interface to the external per-user document collection API. The core
/// never inspects the store's consistency or internal retry behavior.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Create a document and return its generated identifier.
    async fn create(
        &self,
        collection: &str,
        fields: serde_json::Value,
    ) -> Result<String, RemoteError>;

    /// Delete a document by identifier.
    async fn delete(&self, collection: &str, id: &str) -> Result<(), RemoteError>;

    /// Subscribe to collection changes. The handler receives the full
    /// collection on every change, newest first.
    async fn subscribe(
        &self,
        collection: &str,
        handler: SnapshotHandler,
    ) -> Result<SubscriptionHandle, RemoteError>;
}

/// Live change subscription. Unsubscribing (explicitly or by dropping the
/// handle) is the only cancellation point in the system.
pub struct SubscriptionHandle {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl SubscriptionHandle {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn unsubscribe(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl std::fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionHandle")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

/// Timeout and bounded-retry policy applied to every remote call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub timeout: Duration,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            timeout: Duration::from_secs(5),
            backoff: Duration::from_millis(200),
        }
    }
}

/// [`Backend`] over an external document store, used in remote mode.
pub struct RemoteBackend {
    store: Arc<dyn DocumentStore>,
    policy: RetryPolicy,
    cache: Arc<RwLock<LocalState>>,
}

impl RemoteBackend {
    pub fn new(store: Arc<dyn DocumentStore>, policy: RetryPolicy) -> Self {
        Self {
            store,
            policy,
            cache: Arc::new(RwLock::new(LocalState::default())),
        }
    }

    /// Register subscriptions on both collections so the cached state tracks
    /// the store. Must be called once before the backend serves reads; the
    /// returned handles keep the subscriptions alive.
    pub async fn start(&self) -> Result<Vec<SubscriptionHandle>, RemoteError> {
        let entries_cache = Arc::clone(&self.cache);
        let entries_sub = self
            .store
            .subscribe(
                ENTRIES_COLLECTION,
                Box::new(move |snapshot| {
                    let entries = decode_snapshot::<JournalEntry>(ENTRIES_COLLECTION, snapshot);
                    entries_cache.write().expect("cache lock poisoned").entries = entries;
                }),
            )
            .await?;

        let tx_cache = Arc::clone(&self.cache);
        let tx_sub = self
            .store
            .subscribe(
                TRANSACTIONS_COLLECTION,
                Box::new(move |snapshot| {
                    let transactions =
                        decode_snapshot::<Transaction>(TRANSACTIONS_COLLECTION, snapshot);
                    tx_cache.write().expect("cache lock poisoned").transactions = transactions;
                }),
            )
            .await?;

        Ok(vec![entries_sub, tx_sub])
    }

    /// Run a remote call under the configured timeout, retrying up to the
    /// configured number of attempts with a fixed backoff in between.
    async fn with_retry<T, F, Fut>(&self, what: &str, mut call: F) -> Result<T, RemoteError>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, RemoteError>>,
    {
        let mut last_err = RemoteError::Unavailable("no attempts made".to_string());

        for attempt in 1..=self.policy.attempts.max(1) {
            match tokio::time::timeout(self.policy.timeout, call()).await {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(e)) => {
                    warn!("{} failed (attempt {}/{}): {}", what, attempt, self.policy.attempts, e);
                    last_err = e;
                }
                Err(_) => {
                    warn!(
                        "{} timed out after {:?} (attempt {}/{})",
                        what, self.policy.timeout, attempt, self.policy.attempts
                    );
                    last_err = RemoteError::Timeout(self.policy.timeout);
                }
            }

            if attempt < self.policy.attempts {
                tokio::time::sleep(self.policy.backoff).await;
            }
        }

        Err(last_err)
    }
}

/// Decode a snapshot, skipping documents that do not match the model. A
/// malformed document is the store's problem, not a reason to drop the rest.
fn decode_snapshot<T: DeserializeOwned>(collection: &str, snapshot: CollectionSnapshot) -> Vec<T> {
    snapshot
        .into_iter()
        .filter_map(|doc| match serde_json::from_value(doc) {
            Ok(item) => Some(item),
            Err(e) => {
                warn!("Skipping malformed document in {}: {}", collection, e);
                None
            }
        })
        .collect()
}

#[async_trait]
impl Backend for RemoteBackend {
    async fn snapshot(&self) -> Result<LocalState, StorageError> {
        Ok(self.cache.read().expect("cache lock poisoned").clone())
    }

    async fn add_entry(&self, text: &str, mood: Mood) -> Result<JournalEntry, StorageError> {
        if text.trim().is_empty() {
            return Err(shared::ValidationError::EmptyText.into());
        }

        let created_at = now_epoch_secs();
        let fields = serde_json::json!({
            "text": text,
            "mood": mood,
            "createdAt": created_at,
        });

        let id = self
            .with_retry("create journal entry", || {
                let store = Arc::clone(&self.store);
                let fields = fields.clone();
                async move { store.create(ENTRIES_COLLECTION, fields).await }
            })
            .await?;

        Ok(JournalEntry {
            id,
            text: text.to_string(),
            mood,
            created_at,
        })
    }

    async fn add_transaction(
        &self,
        draft: TransactionDraft,
    ) -> Result<Transaction, StorageError> {
        draft.validate()?;

        let created_at = now_epoch_secs();
        let fields = serde_json::json!({
            "amount": draft.amount,
            "description": draft.description,
            "type": draft.kind,
            "category": draft.category,
            "createdAt": created_at,
        });

        let id = self
            .with_retry("create transaction", || {
                let store = Arc::clone(&self.store);
                let fields = fields.clone();
                async move { store.create(TRANSACTIONS_COLLECTION, fields).await }
            })
            .await?;

        Ok(Transaction {
            id,
            amount: draft.amount,
            description: draft.description,
            kind: draft.kind,
            category: draft.category,
            created_at,
        })
    }

    async fn remove_entry(&self, id: &str) -> Result<(), StorageError> {
        self.with_retry("delete journal entry", || {
            let store = Arc::clone(&self.store);
            let id = id.to_string();
            async move { store.delete(ENTRIES_COLLECTION, &id).await }
        })
        .await?;
        Ok(())
    }

    async fn remove_transaction(&self, id: &str) -> Result<(), StorageError> {
        self.with_retry("delete transaction", || {
            let store = Arc::clone(&self.store);
            let id = id.to_string();
            async move { store.delete(TRANSACTIONS_COLLECTION, &id).await }
        })
        .await?;
        Ok(())
    }
}
