// Lint configuration for this crate
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! `RosterSync` CLI - member roster synchronization from the command line.
//!
//! # Examples
//!
//! ```bash
//! # Write a starter config, then store the portal password
//! rostersync config init --base-url https://members.example.org/ --username admin
//! rostersync config set-password
//!
//! # Pull the whole roster and save it
//! rostersync sync --output roster.json
//!
//! # JSON output
//! rostersync sync --format json --pretty
//!
//! # Add or update one member
//! rostersync upsert --file jane.json
//!
//! # Check whether a member exists
//! rostersync exists Jane Doe
//! ```

mod commands;
mod output;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use commands::{config, delete, exists, sync, upsert};

// ============================================================================
// CLI Definition
// ============================================================================

/// `RosterSync` CLI - membership portal roster synchronization.
#[derive(Parser)]
#[command(name = "rostersync")]
#[command(about = "Membership portal roster synchronization CLI")]
#[command(long_about = r#"
RosterSync logs into the membership portal the way a browser would,
exports the member roster and writes member records back.

Examples:
  rostersync sync                       # Fetch the roster and print it
  rostersync sync --output roster.json  # Fetch and merge into a file
  rostersync upsert --file jane.json    # Add or update one member
  rostersync exists Jane Doe            # Existence check
  rostersync --format json sync         # JSON output
"#)]
#[command(version)]
#[command(author = "RosterSync Contributors")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file to use instead of the default location.
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,

    /// Output format (text or json).
    #[arg(long, short = 'f', default_value = "text", global = true)]
    pub format: OutputFormat,

    /// Pretty-print JSON output.
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Give up on the whole run after this many seconds.
    #[arg(long, global = true, value_name = "SECS")]
    pub deadline: Option<u64>,

    /// Verbose output (show debug info).
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Quiet mode (minimal output).
    #[arg(long, short, global = true)]
    pub quiet: bool,
}

/// CLI commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Export the full roster from the portal.
    #[command(visible_alias = "s")]
    Sync(sync::SyncArgs),

    /// Add a member, or update it if it already exists.
    #[command(visible_alias = "u")]
    Upsert(upsert::UpsertArgs),

    /// Check whether a member exists.
    Exists(exists::ExistsArgs),

    /// Delete a member (not supported by the portal client).
    Delete(delete::DeleteArgs),

    /// Manage configuration.
    Config(config::ConfigArgs),
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable text with colors.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

/// CLI exit codes.
#[repr(i32)]
pub enum ExitCode {
    /// General error.
    Error = 1,
    /// Missing or invalid configuration.
    ConfigError = 2,
    /// The member was not found.
    NotFound = 3,
    /// Deadline expired.
    Timeout = 4,
}

// ============================================================================
// Logging Setup
// ============================================================================

fn setup_logging(verbose: bool, quiet: bool) {
    if quiet {
        return;
    }

    let filter = if verbose {
        EnvFilter::new("rostersync=debug,info")
    } else {
        EnvFilter::new("rostersync=warn")
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .without_time()
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

// ============================================================================
// Main Entry Point
// ============================================================================

async fn run(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::Sync(args) => sync::run(args, cli).await,
        Commands::Upsert(args) => upsert::run(args, cli).await,
        Commands::Exists(args) => exists::run(args, cli).await,
        Commands::Delete(args) => delete::run(args, cli).await,
        Commands::Config(args) => config::run(args, cli),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let result = match cli.deadline {
        Some(secs) => {
            if let Ok(result) = tokio::time::timeout(Duration::from_secs(secs), run(&cli)).await {
                result
            } else {
                if !cli.quiet {
                    eprintln!("Error: deadline of {secs}s expired");
                }
                std::process::exit(ExitCode::Timeout as i32);
            }
        }
        None => run(&cli).await,
    };

    if let Err(e) = result {
        if !cli.quiet {
            eprintln!("Error: {e:#}");
        }
        let code = if commands::is_config_error(&e) {
            ExitCode::ConfigError
        } else {
            ExitCode::Error
        };
        std::process::exit(code as i32);
    }

    Ok(())
}
