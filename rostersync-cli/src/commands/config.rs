//! Config command - manage configuration and the stored password.

use std::io::BufRead;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Subcommand};
use rostersync_store::{Config, default_roster_path, keychain};
use tracing::info;

use crate::output::JsonFormatter;
use crate::{Cli, OutputFormat};

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Config subcommands.
#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration.
    Show,

    /// Show configuration paths.
    Path,

    /// Write a starter configuration file.
    Init {
        /// Portal base URL.
        #[arg(long)]
        base_url: Option<String>,

        /// Portal user name.
        #[arg(long)]
        username: Option<String>,

        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },

    /// Store the portal password in the system keychain (read from stdin).
    SetPassword,
}

/// Runs the config command.
pub fn run(args: &ConfigArgs, cli: &Cli) -> Result<()> {
    match &args.action {
        ConfigAction::Show => show_config(cli),
        ConfigAction::Path => show_paths(cli),
        ConfigAction::Init {
            base_url,
            username,
            force,
        } => init_config(base_url.as_deref(), username.as_deref(), *force, cli),
        ConfigAction::SetPassword => set_password(cli),
    }
}

fn config_path(cli: &Cli) -> PathBuf {
    cli.config.clone().unwrap_or_else(Config::default_path)
}

fn show_config(cli: &Cli) -> Result<()> {
    let config = super::load_config(cli)?;
    let has_password = !config.portal.username.is_empty()
        && (std::env::var(&config.portal.password_env).is_ok_and(|p| !p.is_empty())
            || keychain::has_password(&config.portal.username));

    match cli.format {
        OutputFormat::Text => {
            println!("RosterSync Configuration");
            println!("{}", "─".repeat(40));
            println!();
            println!("Portal URL:        {}", non_empty(&config.portal.base_url));
            println!("Username:          {}", non_empty(&config.portal.username));
            println!("Password env var:  {}", config.portal.password_env);
            println!("Password found:    {has_password}");
            println!("Accept bad certs:  {}", config.portal.accept_invalid_certs);
            if let Some(secs) = config.portal.timeout_secs {
                println!("Timeout:           {secs}s");
            }
            if let Some(path) = &config.sync.slack_directory {
                println!("Slack directory:   {}", path.display());
            }
            if let Some(path) = &config.sync.output {
                println!("Roster output:     {}", path.display());
            }
            println!("Log level:         {}", config.general.log_level);
        }
        OutputFormat::Json => {
            let formatter = JsonFormatter::new(cli.pretty);
            let payload = serde_json::json!({
                "config": config,
                "password_found": has_password,
            });
            println!("{}", formatter.format(&payload)?);
        }
    }

    Ok(())
}

fn non_empty(value: &str) -> &str {
    if value.is_empty() { "(not set)" } else { value }
}

fn show_paths(cli: &Cli) -> Result<()> {
    let config_file = config_path(cli);
    let roster_file = default_roster_path();

    match cli.format {
        OutputFormat::Text => {
            println!("Configuration Paths");
            println!("{}", "─".repeat(40));
            println!();
            println!("Config file:  {}", config_file.display());
            println!("Roster file:  {}", roster_file.display());
        }
        OutputFormat::Json => {
            let paths = serde_json::json!({
                "config_file": config_file.display().to_string(),
                "roster_file": roster_file.display().to_string(),
            });
            let formatter = JsonFormatter::new(cli.pretty);
            println!("{}", formatter.format(&paths)?);
        }
    }

    Ok(())
}

fn init_config(
    base_url: Option<&str>,
    username: Option<&str>,
    force: bool,
    cli: &Cli,
) -> Result<()> {
    let path = config_path(cli);
    if path.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
    }

    let mut config = Config::default();
    if let Some(url) = base_url {
        config.portal.base_url = url.to_string();
    }
    if let Some(name) = username {
        config.portal.username = name.to_string();
    }
    config.save_to(&path)?;

    info!(path = %path.display(), "Config initialized");
    println!("Wrote {}", path.display());
    Ok(())
}

fn set_password(cli: &Cli) -> Result<()> {
    let config = super::load_config(cli)?;
    if config.portal.username.is_empty() {
        anyhow::bail!("portal.username is not set; run `rostersync config init --username NAME` first");
    }

    if !cli.quiet {
        eprintln!("Password for {} (one line on stdin):", config.portal.username);
    }
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    let password = line.trim_end_matches(['\r', '\n']);
    if password.is_empty() {
        anyhow::bail!("Empty password");
    }

    keychain::store_password(&config.portal.username, password)?;
    println!("Password stored for {}", config.portal.username);
    Ok(())
}
