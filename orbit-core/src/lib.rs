//! # Orbit Core
//!
//! Client core for the Orbit journaling and expense-tracking app.
//!
//! The core is UI-agnostic and brings together:
//! - **Storage**: the polymorphic persistence backend (a local JSON
//!   document or an external per-user document store), selected once at
//!   session start and injected everywhere.
//! - **Views**: pure derived-view functions (net balance, totals, recent
//!   mood) over the in-memory lists.
//! - **Reconcile**: portable export files and merge/replace import against
//!   the local store.
//! - **Session**: startup mode selection (remote vs. local-only) and
//!   identity, with an explicit lifecycle instead of module state.

pub mod config;
pub mod error;
pub mod reconcile;
pub mod session;
pub mod storage;
pub mod views;

pub use config::{AppConfig, RemoteConfig};
pub use error::{
    AuthError, ExportError, ImportError, RemoteError, SessionError, StorageError,
};
pub use reconcile::{merge_states, ImportMode, ImportOutcome, Reconciler};
pub use session::{AuthProvider, Identity, Mode, RemoteHandles, Session};
pub use storage::{
    Backend, DocumentStore, LocalBackend, LocalStore, MemoryDocumentStore, RemoteBackend,
    RetryPolicy, TransactionDraft,
};
