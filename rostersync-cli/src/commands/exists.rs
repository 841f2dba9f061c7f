//! Exists command - run the existence check for a name.

use anyhow::Result;
use clap::Args;

use crate::output::JsonFormatter;
use crate::{Cli, ExitCode, OutputFormat};

/// Arguments for the exists command.
#[derive(Args)]
pub struct ExistsArgs {
    /// First name.
    pub first_name: String,

    /// Last name.
    pub last_name: String,
}

/// Runs the exists command. Exits with [`ExitCode::NotFound`] when the
/// member is not on the roster.
pub async fn run(args: &ExistsArgs, cli: &Cli) -> Result<()> {
    let config = super::load_config(cli)?;
    let sync = super::connect(&config).await?;
    let exists = sync.member_exists(&args.first_name, &args.last_name).await?;

    match cli.format {
        OutputFormat::Text => {
            let verdict = if exists { "exists" } else { "not found" };
            println!("{} {}: {}", args.first_name, args.last_name, verdict);
        }
        OutputFormat::Json => {
            let payload = serde_json::json!({
                "first_name": args.first_name,
                "last_name": args.last_name,
                "exists": exists,
            });
            println!("{}", JsonFormatter::new(cli.pretty).format(&payload)?);
        }
    }

    if !exists {
        std::process::exit(ExitCode::NotFound as i32);
    }
    Ok(())
}
