//! Domain models for `RosterSync`.
//!
//! ## Submodules
//!
//! - [`person`] - Person records and the portal's membership enums
//! - [`other_info`] - The `Tag=[value]` annotation codec
//! - [`slack`] - Slack directory entries for handle backfill

pub mod other_info;
pub mod person;
pub mod slack;

// Re-export everything at the models level
pub use other_info::{OtherInfo, OtherInfoTag};
pub use person::{
    AdminLevel, Gender, MemberStatus, MemberType, PORTAL_DATE_FORMAT, PersonRecord,
    format_portal_date, parse_portal_date,
};
pub use slack::{SlackDirectory, SlackDirectoryEntry};
