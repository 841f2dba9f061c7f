//! Sync command - export the full roster.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use rostersync_core::PersonRecord;
use rostersync_store::JsonRosterSink;
use serde::Serialize;
use tracing::info;

use crate::output::{JsonFormatter, TextFormatter};
use crate::{Cli, OutputFormat};

/// Arguments for the sync command.
#[derive(Args, Default)]
pub struct SyncArgs {
    /// Merge the fetched roster into this JSON file.
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Print only the summary, not the records.
    #[arg(long)]
    pub summary: bool,
}

#[derive(Serialize)]
struct SyncOutput<'a> {
    report: &'a rostersync_portal::SyncReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    saved_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    records: Option<&'a [PersonRecord]>,
}

/// Runs the sync command.
pub async fn run(args: &SyncArgs, cli: &Cli) -> Result<()> {
    let config = super::load_config(cli)?;
    let sync = super::connect(&config).await?;

    let mut records: Vec<PersonRecord> = Vec::new();
    let report = sync.trigger_full_sync(&mut records).await?;

    let output = args.output.clone().or_else(|| config.sync.output.clone());
    if let Some(path) = &output {
        let stats = JsonRosterSink::new(path).merge(&records).await?;
        info!(
            path = %path.display(),
            inserted = stats.inserted,
            updated = stats.updated,
            "Roster merged"
        );
    }

    match cli.format {
        OutputFormat::Text => {
            let formatter = TextFormatter::new(!cli.no_color);
            if !args.summary {
                print!("{}", formatter.format_records(&records));
            }
            println!("{}", formatter.format_sync_report(&report, output.as_deref()));
        }
        OutputFormat::Json => {
            let formatter = JsonFormatter::new(cli.pretty);
            let payload = SyncOutput {
                report: &report,
                saved_to: output.as_ref().map(|p| p.display().to_string()),
                records: (!args.summary).then_some(records.as_slice()),
            };
            println!("{}", formatter.format(&payload)?);
        }
    }

    Ok(())
}
