//! Error taxonomy for the client core.
//!
//! Every failure is handled at the boundary where it occurs; nothing here is
//! expected to escape to the top level unhandled. Routine local-store write
//! failures are logged and swallowed by the storage layer, but the same
//! failure during an import is fatal to that import and propagates as
//! [`ImportError::Persist`].

use thiserror::Error;

/// Local persistence write failures. Reads never fail: an unreadable or
/// corrupt document is logged and treated as empty state.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to serialize local state: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to write local state to {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid {field}: {message}")]
    Validation { field: &'static str, message: String },

    #[error(transparent)]
    Remote(#[from] RemoteError),
}

impl From<shared::ValidationError> for StorageError {
    fn from(err: shared::ValidationError) -> Self {
        StorageError::Validation {
            field: match err {
                shared::ValidationError::NonFiniteAmount => "amount",
                shared::ValidationError::EmptyDescription => "description",
                shared::ValidationError::EmptyText => "text",
            },
            message: err.to_string(),
        }
    }
}

/// Failures from the external document store collaborator.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("remote call timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("remote store unavailable: {0}")]
    Unavailable(String),

    #[error("remote store rejected the operation: {0}")]
    Api(String),
}

/// Import failures. A declined foreign-instance import is not an error; it
/// is reported as an outcome by the reconciler.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("import file is not valid JSON or does not have the expected shape: {0}")]
    InvalidFormat(String),

    #[error("failed to read import file: {0}")]
    Read(#[from] std::io::Error),

    /// Unlike routine saves, a write failure here aborts the whole import.
    #[error("import could not be persisted, nothing was applied: {0}")]
    Persist(#[source] StorageError),
}

/// Export failures: serialization or writing the export file.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to serialize export payload: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to write export file to {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Remote sign-in failures. Only possible in remote mode, before any data
/// operation is permitted.
#[derive(Debug, Error)]
#[error("authentication failed: {0}")]
pub struct AuthError(pub String);

/// Session initialization failures.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("failed to subscribe to remote changes: {0}")]
    Subscribe(#[from] RemoteError),
}
