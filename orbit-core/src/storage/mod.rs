//! # Storage
//!
//! The persistence seam of the client. A [`Backend`] is selected exactly once
//! at session start (local document or remote document store) and injected
//! into everything that reads or mutates data; call sites never branch on the
//! active mode themselves.

use async_trait::async_trait;
use shared::{Category, JournalEntry, LocalState, Mood, Transaction, TransactionType};

use crate::error::StorageError;

pub mod local;
pub mod memory;
pub mod remote;

pub use local::{LocalBackend, LocalStore};
pub use memory::MemoryDocumentStore;
pub use remote::{
    CollectionSnapshot, DocumentStore, RemoteBackend, RetryPolicy, SnapshotHandler,
    SubscriptionHandle, ENTRIES_COLLECTION, TRANSACTIONS_COLLECTION,
};

/// Input for a new transaction, before an id and timestamp are assigned.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionDraft {
    pub amount: f64,
    pub description: String,
    pub kind: TransactionType,
    pub category: Category,
}

impl TransactionDraft {
    /// Write-boundary validation: a draft that fails here is never persisted.
    pub fn validate(&self) -> Result<(), shared::ValidationError> {
        shared::validate_amount(self.amount)?;
        if self.description.trim().is_empty() {
            return Err(shared::ValidationError::EmptyDescription);
        }
        Ok(())
    }
}

/// The polymorphic persistence interface.
///
/// All mutations and reads flow through whichever implementation the session
/// selected at startup. In-memory lists held by callers are caches of
/// [`Backend::snapshot`]; they carry no authority of their own.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Current full state, both collections most-recent-first.
    async fn snapshot(&self) -> Result<LocalState, StorageError>;

    /// Create a journal entry. The backend assigns the id and timestamp.
    async fn add_entry(&self, text: &str, mood: Mood) -> Result<JournalEntry, StorageError>;

    /// Create a transaction. The backend assigns the id and timestamp.
    async fn add_transaction(&self, draft: TransactionDraft)
        -> Result<Transaction, StorageError>;

    /// Delete an entry by id. Deleting an absent id is a no-op.
    async fn remove_entry(&self, id: &str) -> Result<(), StorageError>;

    /// Delete a transaction by id. Deleting an absent id is a no-op.
    async fn remove_transaction(&self, id: &str) -> Result<(), StorageError>;
}
