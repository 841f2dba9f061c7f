//! Configuration management.

use std::path::{Path, PathBuf};
use std::time::Duration;

use rostersync_fetch::TransportSettings;
use rostersync_fetch::host::http::DEFAULT_USER_AGENT;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::StoreError;
use crate::keychain;

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Portal connection settings.
    #[serde(default)]
    pub portal: PortalConfig,
    /// Sync run settings.
    #[serde(default)]
    pub sync: SyncConfig,
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,
}

/// Portal connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortalConfig {
    /// Portal base URL, e.g. `https://members.example.org/`.
    #[serde(default)]
    pub base_url: String,
    /// Portal user name.
    #[serde(default)]
    pub username: String,
    /// Environment variable holding the password.
    #[serde(default = "default_password_env")]
    pub password_env: String,
    /// Skip TLS certificate validation for the portal host.
    #[serde(default = "default_true")]
    pub accept_invalid_certs: bool,
    /// Custom `User-Agent`.
    #[serde(default)]
    pub user_agent: Option<String>,
    /// Per-request timeout in seconds. No timeout when unset.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

/// Sync run settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Newline-delimited `Name|handle` file for Slack handle backfill.
    #[serde(default)]
    pub slack_directory: Option<PathBuf>,
    /// Where `sync` writes the roster JSON.
    #[serde(default)]
    pub output: Option<PathBuf>,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_password_env() -> String {
    "ROSTERSYNC_PASSWORD".to_string()
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            username: String::new(),
            password_env: default_password_env(),
            accept_invalid_certs: true,
            user_agent: None,
            timeout_secs: None,
        }
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl PortalConfig {
    /// Checks that the portal can be reached with these settings.
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.base_url.trim().is_empty() {
            return Err(StoreError::Config("portal.base_url is not set".to_string()));
        }
        if self.username.trim().is_empty() {
            return Err(StoreError::Config("portal.username is not set".to_string()));
        }
        Ok(())
    }

    /// Resolves the password from the environment, then the keychain.
    pub fn resolve_password(&self) -> Result<String, StoreError> {
        if let Ok(password) = std::env::var(&self.password_env) {
            if !password.is_empty() {
                debug!(env_var = %self.password_env, "Password taken from environment");
                return Ok(password);
            }
        }

        keychain::get_password(&self.username).ok_or_else(|| StoreError::MissingPassword {
            username: self.username.clone(),
            env_var: self.password_env.clone(),
        })
    }

    /// Builds transport settings restricted to `host`.
    pub fn transport_settings(&self, host: Option<&str>) -> TransportSettings {
        TransportSettings {
            timeout: self.timeout_secs.map(Duration::from_secs),
            accept_invalid_certs: self.accept_invalid_certs,
            user_agent: self
                .user_agent
                .clone()
                .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            allowed_host: host.map(str::to_string),
        }
    }
}

impl Config {
    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("rostersync")
            .join("config.json")
    }

    /// Loads configuration from the default path.
    pub fn load() -> Result<Self, StoreError> {
        Self::load_from(&Self::default_path())
    }

    /// Loads configuration from a specific path. A missing file yields the
    /// defaults.
    pub fn load_from(path: &Path) -> Result<Self, StoreError> {
        if !path.exists() {
            debug!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;

        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Saves configuration to the default path.
    pub fn save(&self) -> Result<(), StoreError> {
        self.save_to(&Self::default_path())
    }

    /// Saves configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<(), StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        info!(path = %path.display(), "Saved configuration");
        Ok(())
    }
}
