// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # `RosterSync` Core
//!
//! Core types, models, and traits for the `RosterSync` roster client.
//!
//! This crate provides the foundational abstractions used across all other
//! `RosterSync` crates, including:
//!
//! - Domain models (person records, membership enums)
//! - The `OtherInfo` annotation codec
//! - The Slack directory used for chat-handle backfill
//! - Error types
//! - The persistence collaborator seam ([`MemberSink`])
//!
//! ## Key Types
//!
//! ### Member Types
//! - [`PersonRecord`] - One parsed portal row
//! - [`MemberType`], [`Gender`], [`MemberStatus`], [`AdminLevel`] - Portal enums
//!
//! ### Annotations
//! - [`OtherInfo`] - Decoded `Tag=[value]` annotation set
//! - [`OtherInfoTag`] - The well-known tags
//!
//! ### Directory
//! - [`SlackDirectory`] - `Name|handle` entries for handle backfill

pub mod error;
pub mod models;
pub mod traits;

// Re-export error types
pub use error::{AnnotationParseError, CoreError};

// Re-export all model types
pub use models::{
    // Person types
    AdminLevel,
    Gender,
    MemberStatus,
    MemberType,
    PersonRecord,
    PORTAL_DATE_FORMAT,
    format_portal_date,
    parse_portal_date,
    // Annotations
    OtherInfo,
    OtherInfoTag,
    // Directory
    SlackDirectory,
    SlackDirectoryEntry,
};

// Re-export traits
pub use traits::MemberSink;
