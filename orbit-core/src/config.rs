//! Startup configuration.
//!
//! Configuration is resolved once, before the session mode is selected:
//! an optional `orbit.yaml` in the data directory, overridden by environment
//! variables. A malformed remote section is logged and dropped, which makes
//! the instance fall back to local-only mode exactly as if the section were
//! absent.

use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Fixed fallback instance identifier.
pub const DEFAULT_APP_ID: &str = "orbit-default";

/// Name of the optional configuration file inside the data directory.
pub const CONFIG_FILE_NAME: &str = "orbit.yaml";

/// Connection details for the external document store. Presence of a valid
/// value selects remote mode at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteConfig {
    pub endpoint: String,
    pub api_key: String,
    /// Externally-supplied sign-in token; anonymous sign-in when absent.
    #[serde(default)]
    pub auth_token: Option<String>,
}

impl RemoteConfig {
    /// A remote section with a blank endpoint or key is present-but-malformed.
    fn is_well_formed(&self) -> bool {
        !self.endpoint.trim().is_empty() && !self.api_key.trim().is_empty()
    }
}

/// Resolved application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Instance identifier scoping all persisted and exported data.
    #[serde(default = "default_app_id")]
    pub app_id: String,
    /// Directory holding the local document and the config file.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    #[serde(default)]
    pub remote: Option<RemoteConfig>,
}

fn default_app_id() -> String {
    DEFAULT_APP_ID.to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app_id: default_app_id(),
            data_dir: None,
            remote: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from `orbit.yaml` under the default data directory
    /// (if the file exists), then apply environment overrides.
    pub fn load() -> Self {
        let dir = default_data_dir();
        Self::load_from(&dir.join(CONFIG_FILE_NAME))
    }

    /// Load configuration from an explicit file path, then apply environment
    /// overrides. A missing file yields the defaults; an unparseable file is
    /// logged and yields the defaults as well.
    pub fn load_from(path: &Path) -> Self {
        let mut config = match std::fs::read_to_string(path) {
            Ok(raw) => match serde_yaml::from_str::<AppConfig>(&raw) {
                Ok(config) => {
                    info!("Loaded configuration from {}", path.display());
                    config
                }
                Err(e) => {
                    warn!(
                        "Ignoring malformed config file {}: {}",
                        path.display(),
                        e
                    );
                    AppConfig::default()
                }
            },
            Err(_) => AppConfig::default(),
        };

        config.apply_env_overrides();
        config.validate_remote();
        config
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(app_id) = std::env::var("ORBIT_APP_ID") {
            if !app_id.trim().is_empty() {
                self.app_id = app_id;
            }
        }
        if let Ok(dir) = std::env::var("ORBIT_DATA_DIR") {
            if !dir.trim().is_empty() {
                self.data_dir = Some(PathBuf::from(dir));
            }
        }

        let endpoint = std::env::var("ORBIT_REMOTE_ENDPOINT").ok();
        let api_key = std::env::var("ORBIT_REMOTE_API_KEY").ok();
        let auth_token = std::env::var("ORBIT_AUTH_TOKEN").ok();

        if endpoint.is_none() && api_key.is_none() && auth_token.is_none() {
            return;
        }

        // Field-wise: only the variables that are actually set replace the
        // file values, so a partial override never blanks the rest of an
        // existing remote section.
        let mut remote = self.remote.take().unwrap_or_default();
        if let Some(endpoint) = endpoint {
            remote.endpoint = endpoint;
        }
        if let Some(api_key) = api_key {
            remote.api_key = api_key;
        }
        if let Some(token) = auth_token {
            remote.auth_token = Some(token);
        }
        self.remote = Some(remote);
    }

    /// Drop a present-but-malformed remote section so mode selection treats
    /// it as absent.
    fn validate_remote(&mut self) {
        if let Some(remote) = &self.remote {
            if !remote.is_well_formed() {
                warn!("Remote configuration is malformed; falling back to local-only mode");
                self.remote = None;
            }
        }
    }

    /// Resolved data directory for this instance.
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(default_data_dir)
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("orbit"))
        .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load_from(&dir.path().join("nope.yaml"));
        assert_eq!(config.app_id, DEFAULT_APP_ID);
        assert!(config.remote.is_none());
    }

    #[test]
    fn test_well_formed_remote_section_survives() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "app_id: my-orbit\nremote:\n  endpoint: https://docs.example.com\n  api_key: k-123"
        )
        .unwrap();

        let config = AppConfig::load_from(&path);
        assert_eq!(config.app_id, "my-orbit");
        let remote = config.remote.expect("remote config should be present");
        assert_eq!(remote.endpoint, "https://docs.example.com");
        assert_eq!(remote.auth_token, None);
    }

    #[test]
    fn test_malformed_remote_section_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "remote:\n  endpoint: \"\"\n  api_key: k-123\n").unwrap();

        let config = AppConfig::load_from(&path);
        assert!(config.remote.is_none());
    }

    #[test]
    fn test_env_override_merges_into_existing_remote_section() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(
            &path,
            "remote:\n  endpoint: https://docs.example.com\n  api_key: file-key\n",
        )
        .unwrap();

        // A single variable overrides only its own field; the endpoint from
        // the file survives and the section stays well-formed.
        std::env::set_var("ORBIT_REMOTE_API_KEY", "env-key");
        let config = AppConfig::load_from(&path);
        std::env::remove_var("ORBIT_REMOTE_API_KEY");

        let remote = config
            .remote
            .expect("remote config should survive a partial override");
        assert_eq!(remote.endpoint, "https://docs.example.com");
        assert_eq!(remote.api_key, "env-key");
    }

    #[test]
    fn test_unparseable_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, ":::not yaml at all\n\t{").unwrap();

        let config = AppConfig::load_from(&path);
        assert_eq!(config.app_id, DEFAULT_APP_ID);
    }
}
