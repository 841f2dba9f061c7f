//! Delete command.
//!
//! The portal client has no delete flow; this reports that nothing was sent.

use anyhow::Result;
use clap::Args;

use crate::output::JsonFormatter;
use crate::{Cli, OutputFormat};

/// Arguments for the delete command.
#[derive(Args)]
pub struct DeleteArgs {
    /// Portal member id.
    pub id: u64,
}

/// Runs the delete command.
pub async fn run(args: &DeleteArgs, cli: &Cli) -> Result<()> {
    let config = super::load_config(cli)?;
    let sync = super::connect(&config).await?;
    let acknowledged = sync.delete_member(args.id).await?;

    match cli.format {
        OutputFormat::Text => {
            println!(
                "Delete is not supported by the portal client; no request was sent for member {}",
                args.id
            );
        }
        OutputFormat::Json => {
            let payload = serde_json::json!({
                "id": args.id,
                "acknowledged": acknowledged,
                "sent": false,
            });
            println!("{}", JsonFormatter::new(cli.pretty).format(&payload)?);
        }
    }

    Ok(())
}
