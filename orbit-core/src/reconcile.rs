//! Import/export reconciler.
//!
//! Serializes the local state to a portable file and merges or replaces
//! local state on import. The reconciler operates only against the local
//! persistence store; remote mode exports nothing through this path.
//!
//! Unlike routine saves, a failed write here aborts the whole import and
//! propagates, so a half-applied import can never be observed.

use chrono::Utc;
use log::{info, warn};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use shared::{ExportPayload, HasId, LocalState};

use crate::error::{ExportError, ImportError};
use crate::storage::LocalStore;

/// How incoming records are reconciled with existing local records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportMode {
    /// Incoming state verbatim; existing records are discarded.
    Replace,
    /// Combine by unique identifier; see [`merge_states`] for the tie-break.
    Merge,
}

/// Result of an import attempt that parsed successfully.
#[derive(Debug, Clone, PartialEq)]
pub enum ImportOutcome {
    /// The final state, already persisted.
    Applied(LocalState),
    /// The user declined the foreign-instance confirmation; nothing changed.
    Declined,
}

/// Reconciler bound to one local store and instance identifier.
pub struct Reconciler<'a> {
    store: &'a LocalStore,
    app_id: &'a str,
}

impl<'a> Reconciler<'a> {
    pub fn new(store: &'a LocalStore, app_id: &'a str) -> Self {
        Self { store, app_id }
    }

    /// Build the export wrapper from the store's current contents, falling
    /// back to the caller's in-memory lists when the store is empty. Both
    /// arrays are always present in the payload, possibly empty.
    pub fn export_payload(&self, fallback: &LocalState) -> ExportPayload {
        let stored = self.store.load();
        let data = if stored.is_empty() && !fallback.is_empty() {
            warn!("Local store is empty; exporting in-memory state instead");
            fallback.clone()
        } else {
            stored
        };

        ExportPayload {
            app_id: self.app_id.to_string(),
            exported_at: Utc::now().to_rfc3339(),
            data,
        }
    }

    /// Write the export file into `dir` and return its path. The filename is
    /// `orbit-export-<appId>-<timestamp>.json`; colons in the ISO 8601
    /// timestamp are replaced with dashes for filesystem portability.
    pub fn export_to_dir(
        &self,
        dir: &Path,
        fallback: &LocalState,
    ) -> Result<PathBuf, ExportError> {
        let payload = self.export_payload(fallback);
        let json = serde_json::to_string_pretty(&payload)?;

        let stamp = payload.exported_at.replace(':', "-");
        let path = dir.join(format!("orbit-export-{}-{}.json", payload.app_id, stamp));

        std::fs::write(&path, json).map_err(|e| ExportError::Write {
            path: path.display().to_string(),
            source: e,
        })?;

        info!(
            "Exported {} entries and {} transactions to {}",
            payload.data.entries.len(),
            payload.data.transactions.len(),
            path.display()
        );
        Ok(path)
    }

    /// Import raw file contents.
    ///
    /// Accepts both the export wrapper and a bare `{entries, transactions}`
    /// document. When the wrapper carries a different instance identifier,
    /// `confirm_foreign` decides whether to proceed; declining aborts with no
    /// state change and no error. The final state is persisted before it is
    /// returned; a write failure aborts the import entirely.
    pub fn import(
        &self,
        raw: &str,
        mode: ImportMode,
        confirm_foreign: &dyn Fn(&str) -> bool,
    ) -> Result<ImportOutcome, ImportError> {
        let value: serde_json::Value = serde_json::from_str(raw)
            .map_err(|e| ImportError::InvalidFormat(e.to_string()))?;

        // Wrapped form carries a `data` key; everything else is the bare form.
        let incoming = if value.get("data").is_some() {
            let payload: ExportPayload = serde_json::from_value(value)
                .map_err(|e| ImportError::InvalidFormat(e.to_string()))?;

            if payload.app_id != self.app_id && !confirm_foreign(&payload.app_id) {
                info!(
                    "Import from foreign instance {} declined; state unchanged",
                    payload.app_id
                );
                return Ok(ImportOutcome::Declined);
            }
            payload.data
        } else {
            serde_json::from_value(value).map_err(|e| ImportError::InvalidFormat(e.to_string()))?
        };

        let final_state = match mode {
            ImportMode::Replace => incoming,
            ImportMode::Merge => merge_states(incoming, self.store.load()),
        };

        self.store
            .save(&final_state)
            .map_err(ImportError::Persist)?;

        info!(
            "Import applied: {} entries, {} transactions",
            final_state.entries.len(),
            final_state.transactions.len()
        );
        Ok(ImportOutcome::Applied(final_state))
    }

    /// Import directly from a file path.
    pub fn import_file(
        &self,
        path: &Path,
        mode: ImportMode,
        confirm_foreign: &dyn Fn(&str) -> bool,
    ) -> Result<ImportOutcome, ImportError> {
        let raw = std::fs::read_to_string(path)?;
        self.import(&raw, mode, confirm_foreign)
    }
}

/// Merge incoming and existing records collection by collection.
pub fn merge_states(incoming: LocalState, existing: LocalState) -> LocalState {
    LocalState {
        entries: merge_by_id(incoming.entries, existing.entries),
        transactions: merge_by_id(incoming.transactions, existing.transactions),
    }
}

/// Combined de-duplication pass: incoming items are inserted first, then
/// existing local items. On an identifier collision the existing local item's
/// field values win (inserted last wins) while keeping the position the
/// incoming pass established. The result keeps insertion order and is never
/// re-sorted by timestamp.
fn merge_by_id<T: HasId>(incoming: Vec<T>, existing: Vec<T>) -> Vec<T> {
    let mut merged: Vec<T> = Vec::with_capacity(incoming.len() + existing.len());
    let mut index: HashMap<String, usize> = HashMap::new();

    for item in incoming.into_iter().chain(existing) {
        match index.get(item.id()) {
            Some(&pos) => merged[pos] = item,
            None => {
                index.insert(item.id().to_string(), merged.len());
                merged.push(item);
            }
        }
    }

    merged
}
