// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # `RosterSync` Portal
//!
//! The membership portal's protocol, on top of the transport and session
//! plumbing in `rostersync-fetch`.
//!
//! - [`descriptor`] - Endpoints, control names and per-step field lists
//! - [`session::RosterSession`] - The orchestrator: login, search, export,
//!   add/update, logout
//! - [`parser::TableParser`] - Positional parser for the export table
//! - [`existence`] - Decides from a search response whether a member exists
//! - [`sync::RosterSync`] - Inbound facade used by the scheduler and the CLI
//!
//! ## Usage
//!
//! ```ignore
//! use rostersync_fetch::{HttpTransport, TransportSettings};
//! use rostersync_portal::{Credentials, PortalDescriptor, RosterSync};
//!
//! let descriptor = PortalDescriptor::new("https://members.example.org/")?;
//! let transport = HttpTransport::new(&TransportSettings::default())?;
//! let sync = RosterSync::new(transport, descriptor, Credentials::new("desk", password));
//!
//! let mut records = Vec::new();
//! let report = sync.trigger_full_sync(&mut records).await?;
//! ```

pub mod descriptor;
pub mod error;
pub mod existence;
pub mod parser;
pub mod session;
pub mod sync;
pub mod table;

#[cfg(test)]
mod session_tests;
#[cfg(test)]
mod test_support;

pub use descriptor::{Endpoint, PortalDescriptor};
pub use error::{FieldError, LayoutError, PortalError, RowParseError};
pub use existence::{ExistenceCheck, UpdateLinkMarker};
pub use parser::{ColumnSpec, EXPECTED_COLUMNS, ParsedPage, TableParser};
pub use session::{Credentials, RosterSession, WriteKind};
pub use sync::{RosterSync, SyncReport, UpsertReport};
