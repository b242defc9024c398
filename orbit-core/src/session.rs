//! Session and mode selection.
//!
//! The operating mode is decided exactly once, at startup: remote when a
//! valid remote configuration *and* remote collaborators are available,
//! local-only otherwise. There is no runtime transition between modes;
//! switching requires a new session. The session is an explicitly
//! constructed context object owning the selected backend and any live
//! subscriptions; nothing here lives in module-level state.

use async_trait::async_trait;
use log::{info, warn};
use std::sync::Arc;

use crate::config::AppConfig;
use crate::error::{AuthError, SessionError};
use crate::storage::{
    Backend, DocumentStore, LocalBackend, LocalStore, RemoteBackend, RetryPolicy,
    SubscriptionHandle,
};

/// Fixed identity placeholder used in local-only mode.
pub const LOCAL_USER: &str = "local-user";

/// Operating mode, fixed for the lifetime of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Remote,
    LocalOnly,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Remote => write!(f, "remote"),
            Mode::LocalOnly => write!(f, "local-only"),
        }
    }
}

/// Who the session is acting as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    /// The fixed local placeholder; data operations permitted immediately.
    Local,
    /// Remote user established through the auth collaborator.
    Remote { user_id: String },
}

impl Identity {
    pub fn user_id(&self) -> &str {
        match self {
            Identity::Local => LOCAL_USER,
            Identity::Remote { user_id } => user_id,
        }
    }
}

/// External authentication collaborator. Anonymous sign-in when no token is
/// supplied, token-based otherwise.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn sign_in(&self, token: Option<&str>) -> Result<Identity, AuthError>;
}

/// The remote collaborators an embedder supplies to enable remote mode.
/// Constructing the actual network client is outside the core's scope.
pub struct RemoteHandles {
    pub store: Arc<dyn DocumentStore>,
    pub auth: Arc<dyn AuthProvider>,
    pub retry: RetryPolicy,
}

/// An initialized session: mode, identity, and the injected backend.
pub struct Session {
    mode: Mode,
    identity: Identity,
    backend: Arc<dyn Backend>,
    local_store: LocalStore,
    subscriptions: Vec<SubscriptionHandle>,
}

impl Session {
    /// Decide the mode and wire the backend.
    ///
    /// Remote mode requires both a well-formed remote configuration and
    /// remote handles; identity is established before the session is handed
    /// out, so no data operation can precede sign-in. A remote configuration
    /// without handles is logged and treated as absent (local-only fallback).
    /// Auth or subscription failures in remote mode fail initialization
    /// rather than silently degrading.
    pub async fn init(
        config: &AppConfig,
        remote: Option<RemoteHandles>,
    ) -> Result<Session, SessionError> {
        let data_dir = config.data_dir();
        let local_store = LocalStore::new(&data_dir, &config.app_id);

        match (&config.remote, remote) {
            (Some(remote_config), Some(handles)) => {
                let identity = handles
                    .auth
                    .sign_in(remote_config.auth_token.as_deref())
                    .await?;
                info!("Signed in to remote store as {}", identity.user_id());

                let backend = RemoteBackend::new(handles.store, handles.retry);
                let subscriptions = backend.start().await?;

                Ok(Session {
                    mode: Mode::Remote,
                    identity,
                    backend: Arc::new(backend),
                    local_store,
                    subscriptions,
                })
            }
            (Some(_), None) => {
                warn!("Remote configuration present but no remote client available; running local-only");
                Ok(Self::local_only(local_store))
            }
            (None, _) => {
                info!("No remote configuration; running local-only");
                Ok(Self::local_only(local_store))
            }
        }
    }

    fn local_only(local_store: LocalStore) -> Session {
        Session {
            mode: Mode::LocalOnly,
            identity: Identity::Local,
            backend: Arc::new(LocalBackend::new(local_store.clone())),
            local_store,
            subscriptions: Vec::new(),
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// The backend all reads and mutations flow through.
    pub fn backend(&self) -> Arc<dyn Backend> {
        Arc::clone(&self.backend)
    }

    /// The local store, regardless of mode. The import/export reconciler
    /// operates only against this.
    pub fn local_store(&self) -> &LocalStore {
        &self.local_store
    }

    /// End the session: unsubscribe from remote change notifications (the
    /// only cancellation point) and drop the backend.
    pub fn dispose(mut self) {
        for sub in self.subscriptions.drain(..) {
            sub.unsubscribe();
        }
        info!("Session disposed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RemoteConfig;
    use crate::storage::MemoryDocumentStore;
    use shared::Mood;

    struct StubAuth;

    #[async_trait]
    impl AuthProvider for StubAuth {
        async fn sign_in(&self, token: Option<&str>) -> Result<Identity, AuthError> {
            Ok(Identity::Remote {
                user_id: match token {
                    Some(token) => format!("user-{}", token),
                    None => "anonymous".to_string(),
                },
            })
        }
    }

    struct FailingAuth;

    #[async_trait]
    impl AuthProvider for FailingAuth {
        async fn sign_in(&self, _token: Option<&str>) -> Result<Identity, AuthError> {
            Err(AuthError("token rejected".to_string()))
        }
    }

    fn config_with_remote(dir: &std::path::Path, token: Option<&str>) -> AppConfig {
        AppConfig {
            app_id: "orbit-test".to_string(),
            data_dir: Some(dir.to_path_buf()),
            remote: Some(RemoteConfig {
                endpoint: "https://docs.example.com".to_string(),
                api_key: "k-123".to_string(),
                auth_token: token.map(str::to_string),
            }),
        }
    }

    fn handles() -> RemoteHandles {
        RemoteHandles {
            store: Arc::new(MemoryDocumentStore::new()),
            auth: Arc::new(StubAuth),
            retry: RetryPolicy::default(),
        }
    }

    #[tokio::test]
    async fn test_local_only_without_remote_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig {
            app_id: "orbit-test".to_string(),
            data_dir: Some(dir.path().to_path_buf()),
            remote: None,
        };

        let session = Session::init(&config, Some(handles())).await.unwrap();
        assert_eq!(session.mode(), Mode::LocalOnly);
        assert_eq!(session.identity(), &Identity::Local);
        assert_eq!(session.identity().user_id(), LOCAL_USER);

        // Data operations are permitted immediately.
        session
            .backend()
            .add_entry("works right away", Mood::Good)
            .await
            .unwrap();
        session.dispose();
    }

    #[tokio::test]
    async fn test_remote_config_without_handles_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_with_remote(dir.path(), None);

        let session = Session::init(&config, None).await.unwrap();
        assert_eq!(session.mode(), Mode::LocalOnly);
        session.dispose();
    }

    #[tokio::test]
    async fn test_remote_mode_signs_in_before_serving() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_with_remote(dir.path(), Some("t-42"));

        let session = Session::init(&config, Some(handles())).await.unwrap();
        assert_eq!(session.mode(), Mode::Remote);
        assert_eq!(session.identity().user_id(), "user-t-42");

        let entry = session
            .backend()
            .add_entry("remote entry", Mood::Great)
            .await
            .unwrap();
        let state = session.backend().snapshot().await.unwrap();
        assert_eq!(state.entries[0].id, entry.id);
        session.dispose();
    }

    #[tokio::test]
    async fn test_anonymous_sign_in_when_no_token() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_with_remote(dir.path(), None);

        let session = Session::init(&config, Some(handles())).await.unwrap();
        assert_eq!(session.identity().user_id(), "anonymous");
        session.dispose();
    }

    #[tokio::test]
    async fn test_auth_failure_fails_initialization() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_with_remote(dir.path(), Some("bad"));

        let result = Session::init(
            &config,
            Some(RemoteHandles {
                store: Arc::new(MemoryDocumentStore::new()),
                auth: Arc::new(FailingAuth),
                retry: RetryPolicy::default(),
            }),
        )
        .await;
        assert!(matches!(result, Err(SessionError::Auth(_))));
    }
}
