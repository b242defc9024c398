//! Local persistence store: one JSON document per application instance,
//! written atomically via a temp file and rename.
//!
//! Reads are infallible by design: a missing, unreadable, or corrupt document
//! is logged and treated as empty state. Writes return a `Result`, but
//! routine add/delete callers log and continue on failure; only the import
//! path treats a failed write as fatal.

use async_trait::async_trait;
use log::{info, warn};
use std::fs;
use std::path::{Path, PathBuf};

use shared::{
    local_document_id, now_epoch_secs, JournalEntry, LocalState, Mood, Transaction,
};

use crate::error::StorageError;
use crate::storage::{Backend, TransactionDraft};

/// Durable key-value-style store holding the single `LocalState` document,
/// namespaced by instance identifier.
#[derive(Debug, Clone)]
pub struct LocalStore {
    path: PathBuf,
}

impl LocalStore {
    /// Store for the given instance identifier inside `data_dir`. At most one
    /// document exists per identifier.
    pub fn new(data_dir: &Path, app_id: &str) -> Self {
        Self {
            path: data_dir.join(format!("orbit-{}.json", app_id)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the document. Absent or unparseable content yields empty state;
    /// the failure is logged, never surfaced.
    pub fn load(&self) -> LocalState {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return LocalState::default();
            }
            Err(e) => {
                warn!(
                    "Could not read local document {}: {}. Treating as empty state",
                    self.path.display(),
                    e
                );
                return LocalState::default();
            }
        };

        match serde_json::from_str(&raw) {
            Ok(state) => state,
            Err(e) => {
                warn!(
                    "Local document {} is unparseable: {}. Treating as empty state",
                    self.path.display(),
                    e
                );
                LocalState::default()
            }
        }
    }

    /// Serialize and write the whole document atomically.
    pub fn save(&self, state: &LocalState) -> Result<(), StorageError> {
        let json = serde_json::to_string_pretty(state)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| StorageError::Write {
                    path: parent.display().to_string(),
                    source: e,
                })?;
            }
        }

        // Write to a temp file and rename so a crash mid-write never leaves a
        // truncated document behind.
        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, json).map_err(|e| StorageError::Write {
            path: temp_path.display().to_string(),
            source: e,
        })?;
        fs::rename(&temp_path, &self.path).map_err(|e| StorageError::Write {
            path: self.path.display().to_string(),
            source: e,
        })?;

        Ok(())
    }

    /// Append a journal entry: generate an id, stamp `created_at`, prepend,
    /// persist. A failed routine save is logged and the updated in-memory
    /// state is still returned.
    pub fn append_entry(
        &self,
        text: &str,
        mood: Mood,
    ) -> Result<(JournalEntry, LocalState), StorageError> {
        if text.trim().is_empty() {
            return Err(shared::ValidationError::EmptyText.into());
        }

        let now = now_epoch_secs();
        let entry = JournalEntry {
            id: local_document_id(now),
            text: text.to_string(),
            mood,
            created_at: now,
        };

        let mut state = self.load();
        state.entries.insert(0, entry.clone());
        self.save_routine(&state);

        Ok((entry, state))
    }

    /// Append a transaction after write-boundary validation. Same save
    /// semantics as [`LocalStore::append_entry`].
    pub fn append_transaction(
        &self,
        draft: TransactionDraft,
    ) -> Result<(Transaction, LocalState), StorageError> {
        draft.validate()?;

        let now = now_epoch_secs();
        let transaction = Transaction {
            id: local_document_id(now),
            amount: draft.amount,
            description: draft.description,
            kind: draft.kind,
            category: draft.category,
            created_at: now,
        };

        let mut state = self.load();
        state.transactions.insert(0, transaction.clone());
        self.save_routine(&state);

        Ok((transaction, state))
    }

    /// Remove an entry by id and persist. Removing an absent id is a no-op,
    /// not an error.
    pub fn remove_entry(&self, id: &str) -> LocalState {
        let mut state = self.load();
        let before = state.entries.len();
        state.entries.retain(|e| e.id != id);

        if state.entries.len() < before {
            self.save_routine(&state);
        } else {
            info!("No journal entry with id {} to remove", id);
        }
        state
    }

    /// Remove a transaction by id and persist. Same no-op semantics.
    pub fn remove_transaction(&self, id: &str) -> LocalState {
        let mut state = self.load();
        let before = state.transactions.len();
        state.transactions.retain(|t| t.id != id);

        if state.transactions.len() < before {
            self.save_routine(&state);
        } else {
            info!("No transaction with id {} to remove", id);
        }
        state
    }

    /// Routine save: log and continue on failure. The caller keeps the fresh
    /// in-memory state even when the persisted copy is now stale.
    fn save_routine(&self, state: &LocalState) {
        if let Err(e) = self.save(state) {
            warn!(
                "Failed to persist local document {}: {}. Continuing with in-memory state",
                self.path.display(),
                e
            );
        }
    }
}

/// [`Backend`] over the local store, used in local-only mode.
#[derive(Debug, Clone)]
pub struct LocalBackend {
    store: LocalStore,
}

impl LocalBackend {
    pub fn new(store: LocalStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &LocalStore {
        &self.store
    }
}

#[async_trait]
impl Backend for LocalBackend {
    async fn snapshot(&self) -> Result<LocalState, StorageError> {
        Ok(self.store.load())
    }

    async fn add_entry(&self, text: &str, mood: Mood) -> Result<JournalEntry, StorageError> {
        let (entry, _) = self.store.append_entry(text, mood)?;
        Ok(entry)
    }

    async fn add_transaction(
        &self,
        draft: TransactionDraft,
    ) -> Result<Transaction, StorageError> {
        let (transaction, _) = self.store.append_transaction(draft)?;
        Ok(transaction)
    }

    async fn remove_entry(&self, id: &str) -> Result<(), StorageError> {
        self.store.remove_entry(id);
        Ok(())
    }

    async fn remove_transaction(&self, id: &str) -> Result<(), StorageError> {
        self.store.remove_transaction(id);
        Ok(())
    }
}
