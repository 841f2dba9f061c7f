//! CLI command implementations.

pub mod config;
pub mod delete;
pub mod exists;
pub mod sync;
pub mod upsert;

use anyhow::{Context, Result};
use rostersync_fetch::HttpTransport;
use rostersync_portal::{Credentials, PortalDescriptor, PortalError, RosterSync};
use rostersync_store::{Config, StoreError, load_slack_directory};
use tracing::{debug, warn};

use crate::Cli;

/// Loads the config from `--config` or the default location.
pub fn load_config(cli: &Cli) -> Result<Config> {
    let path = cli.config.clone().unwrap_or_else(Config::default_path);
    Config::load_from(&path).with_context(|| format!("Failed to load {}", path.display()))
}

/// Builds the sync facade from the config, resolving the password and the
/// optional Slack directory.
pub async fn connect(config: &Config) -> Result<RosterSync<HttpTransport>> {
    config.portal.validate()?;

    let descriptor = PortalDescriptor::new(&config.portal.base_url)?;
    let settings = config.portal.transport_settings(descriptor.host());
    let transport = HttpTransport::new(&settings)?;
    let password = config.portal.resolve_password()?;
    let credentials = Credentials::new(config.portal.username.as_str(), password);

    debug!(base_url = %descriptor.base_url(), "Portal client ready");
    let mut sync = RosterSync::new(transport, descriptor, credentials);

    if let Some(path) = &config.sync.slack_directory {
        match load_slack_directory(path).await {
            Ok(directory) => sync = sync.with_slack_directory(directory),
            Err(e) => warn!(path = %path.display(), error = %e, "Slack directory not loaded"),
        }
    }

    Ok(sync)
}

/// True for failures the user fixes by editing the config.
pub fn is_config_error(error: &anyhow::Error) -> bool {
    if let Some(e) = error.downcast_ref::<StoreError>() {
        return matches!(e, StoreError::Config(_) | StoreError::MissingPassword { .. });
    }
    matches!(
        error.downcast_ref::<PortalError>(),
        Some(PortalError::InvalidBaseUrl(_))
    )
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;
    use crate::{Commands, OutputFormat};

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from([
            "rostersync", "exists", "Jane", "Doe", "--format", "json", "--deadline", "30",
        ]);
        assert_eq!(cli.format, OutputFormat::Json);
        assert_eq!(cli.deadline, Some(30));
        assert!(matches!(cli.command, Commands::Exists(ref a) if a.last_name == "Doe"));
    }

    #[test]
    fn test_load_config_from_flag() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"portal": {"base_url": "https://members.example.org/", "username": "admin"}}"#,
        )
        .unwrap();

        let cli = Cli::parse_from(["rostersync", "--config", path.to_str().unwrap(), "config", "show"]);
        let config = load_config(&cli).unwrap();
        assert_eq!(config.portal.username, "admin");
        assert_eq!(config.portal.password_env, "ROSTERSYNC_PASSWORD");
    }

    #[test]
    fn test_corrupt_config_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{not json").unwrap();

        let cli = Cli::parse_from(["rostersync", "--config", path.to_str().unwrap(), "sync"]);
        let err = load_config(&cli).unwrap_err();
        assert!(err.to_string().contains("config.json"));
        assert!(!is_config_error(&err));
    }

    #[tokio::test]
    async fn test_missing_base_url_is_config_error() {
        let err = connect(&Config::default()).await.unwrap_err();
        assert!(is_config_error(&err));
    }

    #[test]
    fn test_invalid_base_url_is_config_error() {
        let err = anyhow::Error::from(PortalError::InvalidBaseUrl("ftp://x".to_string()));
        assert!(is_config_error(&err));
    }
}
