//! Configuration loading and persistence.
//!
//! Handles reading and writing the notify-sync configuration file and
//! applying `NOTIFY_SYNC_*` environment overrides.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::time::Duration;
use std::{fs, path::PathBuf};

use crate::constants;

/// Endpoint paths, relative to the server URL.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct Endpoints {
    /// Unread summary, polled on start and after the popover closes.
    pub summary: String,
    /// Popover detail content.
    pub detail: String,
    /// Interaction counts for one item.
    pub interactions: String,
    /// Mark every notification as read.
    pub mark_all_read: String,
    /// Push channel.
    pub push: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            summary: constants::SUMMARY_PATH.to_string(),
            detail: constants::DETAIL_PATH.to_string(),
            interactions: constants::INTERACTIONS_PATH.to_string(),
            mark_all_read: constants::MARK_ALL_READ_PATH.to_string(),
            push: constants::PUSH_PATH.to_string(),
        }
    }
}

/// Configuration for the notify-sync client.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(default)]
pub struct Config {
    /// URL of the server.
    pub server_url: String,
    /// Username of the viewer; frames from this actor do not raise alerts.
    pub viewer: String,
    /// Session cookie value.
    pub session_id: String,
    /// CSRF token, sent as header and cookie on POST requests.
    pub csrf_token: String,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Endpoint paths.
    pub endpoints: Endpoints,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: constants::DEFAULT_SERVER_URL.to_string(),
            viewer: String::new(),
            session_id: String::new(),
            csrf_token: String::new(),
            request_timeout_secs: constants::HTTP_REQUEST_TIMEOUT.as_secs(),
            endpoints: Endpoints::default(),
        }
    }
}

impl Config {
    /// Returns the configuration directory path, creating it if necessary.
    ///
    /// Directory selection priority:
    /// 1. `NOTIFY_SYNC_CONFIG_DIR` env var: explicit override
    /// 2. `NOTIFY_SYNC_ENV=test`: `tmp/notify-sync-test` under the crate
    /// 3. Default: platform config dir (`~/.config/notify-sync` on Linux)
    pub fn config_dir() -> Result<PathBuf> {
        let dir = if let Ok(dir) = std::env::var("NOTIFY_SYNC_CONFIG_DIR") {
            PathBuf::from(dir)
        } else if crate::env::is_test_mode() {
            PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tmp/notify-sync-test")
        } else {
            dirs::config_dir()
                .context("Could not determine config directory")?
                .join("notify-sync")
        };
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create config directory {}", dir.display()))?;
        Ok(dir)
    }

    /// Loads configuration from file, with environment variable overrides.
    ///
    /// A missing or unreadable file falls back to defaults.
    pub fn load() -> Result<Self> {
        let path = Self::config_dir()?.join("config.json");
        let mut config = Self::load_from(&path).unwrap_or_else(|e| {
            log::debug!("Using default config ({e:#})");
            Self::default()
        });
        config.apply_env_overrides();
        Ok(config)
    }

    /// Loads configuration from a specific file without env overrides.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            anyhow::bail!("Config file not found: {}", path.display());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        serde_json::from_str(&content).with_context(|| format!("invalid config {}", path.display()))
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(server_url) = std::env::var("NOTIFY_SYNC_SERVER_URL") {
            self.server_url = server_url;
        }

        if let Ok(viewer) = std::env::var("NOTIFY_SYNC_VIEWER") {
            self.viewer = viewer;
        }

        if let Ok(session_id) = std::env::var("NOTIFY_SYNC_SESSION") {
            self.session_id = session_id;
        }

        if let Ok(csrf_token) = std::env::var("NOTIFY_SYNC_CSRF_TOKEN") {
            self.csrf_token = csrf_token;
        }

        if let Ok(timeout) = std::env::var("NOTIFY_SYNC_REQUEST_TIMEOUT") {
            if let Ok(secs) = timeout.parse::<u64>() {
                self.request_timeout_secs = secs;
            }
        }
    }

    /// Persists the configuration to the default location.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_dir()?.join("config.json"))
    }

    /// Persists the configuration to `path`.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)
            .with_context(|| format!("failed to write {}", path.display()))?;

        // Owner read/write only: the file holds the session cookie
        #[cfg(unix)]
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;

        Ok(())
    }

    /// Per-request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Server URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.server_url.trim_end_matches('/')
    }

    /// Whether a session cookie is configured.
    pub fn has_session(&self) -> bool {
        !self.session_id.is_empty()
    }

    /// Copy of the config with secrets blanked, for display.
    #[must_use]
    pub fn redacted(&self) -> Self {
        let mask = |s: &str| {
            if s.is_empty() {
                String::new()
            } else {
                "********".to_string()
            }
        };
        Self {
            session_id: mask(&self.session_id),
            csrf_token: mask(&self.csrf_token),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server_url, "http://localhost:8000");
        assert_eq!(config.request_timeout_secs, 10);
        assert_eq!(config.endpoints.summary, "/notifications/latest-notifications/");
        assert_eq!(config.endpoints.push, "/ws/notifications/");
        assert!(!config.has_session());
    }

    #[test]
    fn test_base_url_trims_trailing_slash() {
        let config = Config {
            server_url: "https://example.com/".to_string(),
            ..Config::default()
        };
        assert_eq!(config.base_url(), "https://example.com");
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"viewer": "alice", "endpoints": {"push": "/ws/n/"}}"#)
                .unwrap();
        assert_eq!(config.viewer, "alice");
        assert_eq!(config.endpoints.push, "/ws/n/");
        assert_eq!(config.endpoints.summary, "/notifications/latest-notifications/");
        assert_eq!(config.server_url, "http://localhost:8000");
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let config = Config {
            viewer: "bob".to_string(),
            session_id: "abc123".to_string(),
            ..Config::default()
        };
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.viewer, "bob");
        assert_eq!(loaded.session_id, "abc123");

        #[cfg(unix)]
        {
            let mode = fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[test]
    fn test_load_missing_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Config::load_from(&dir.path().join("nope.json")).is_err());
    }

    #[test]
    fn test_redacted_hides_secrets() {
        let config = Config {
            session_id: "secret_session".to_string(),
            csrf_token: "secret_csrf".to_string(),
            viewer: "carol".to_string(),
            ..Config::default()
        };
        let json = serde_json::to_string(&config.redacted()).unwrap();
        assert!(!json.contains("secret_session"));
        assert!(!json.contains("secret_csrf"));
        assert!(json.contains("carol"));
    }
}
