// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # `RosterSync` Store
//!
//! Everything `RosterSync` keeps on disk or in the keychain.
//!
//! - **Config**: JSON configuration with serde defaults
//! - **Keychain**: Portal password in the system keychain
//! - **Persistence**: JSON file helpers, the Slack directory loader and
//!   [`JsonRosterSink`]
//!
//! ## Usage
//!
//! ```ignore
//! use rostersync_store::{Config, JsonRosterSink};
//!
//! let config = Config::load()?;
//! let password = config.portal.resolve_password()?;
//!
//! let mut sink = JsonRosterSink::default_location();
//! sync.trigger_full_sync(&mut sink).await?;
//! ```

pub mod config;
pub mod error;
pub mod keychain;
pub mod persistence;

pub use config::{Config, GeneralConfig, PortalConfig, SyncConfig};
pub use error::StoreError;
pub use persistence::{
    JsonRosterSink, MergeStats, default_data_dir, default_roster_path, load_json,
    load_json_or_default, load_slack_directory, merge_records, save_json,
};
