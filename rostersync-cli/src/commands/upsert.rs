//! Upsert command - add or update one member.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use rostersync_core::PersonRecord;
use rostersync_store::load_json;

use crate::output::{JsonFormatter, TextFormatter};
use crate::{Cli, OutputFormat};

/// Arguments for the upsert command.
#[derive(Args)]
pub struct UpsertArgs {
    /// JSON file holding one member record.
    #[arg(long, short = 'F')]
    pub file: PathBuf,
}

/// Runs the upsert command.
pub async fn run(args: &UpsertArgs, cli: &Cli) -> Result<()> {
    let record: PersonRecord = load_json(&args.file)
        .await
        .with_context(|| format!("Failed to read member from {}", args.file.display()))?;

    let blank = |name: &Option<String>| name.as_deref().is_none_or(|n| n.trim().is_empty());
    if blank(&record.first_name) || blank(&record.last_name) {
        anyhow::bail!("{} needs both a first and a last name", args.file.display());
    }

    let config = super::load_config(cli)?;
    let sync = super::connect(&config).await?;
    let report = sync.add_or_update_member(&record).await?;

    match cli.format {
        OutputFormat::Text => {
            let formatter = TextFormatter::new(!cli.no_color);
            println!("{}", formatter.format_upsert(&report));
        }
        OutputFormat::Json => {
            println!("{}", JsonFormatter::new(cli.pretty).format(&report)?);
        }
    }

    Ok(())
}
