//! Portal error types.

use std::num::ParseIntError;

use rostersync_core::CoreError;
use rostersync_fetch::{ProtocolError, TransportError};
use thiserror::Error;

// ============================================================================
// Row Errors
// ============================================================================

/// One table row could not become a record. The row is skipped.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RowParseError {
    /// The row has fewer cells than the layout maps.
    #[error("Row {row} has {found} columns, expected at least {expected}")]
    MissingColumns {
        /// Zero-based data row index.
        row: usize,
        /// Cells present.
        found: usize,
        /// Cells required.
        expected: usize,
    },

    /// A required column did not decode.
    #[error("Row {row}: column {column} ({name}): {source}")]
    Required {
        /// Zero-based data row index.
        row: usize,
        /// Column index.
        column: usize,
        /// Field name.
        name: &'static str,
        /// Why it failed.
        #[source]
        source: FieldError,
    },
}

/// A single cell failed to decode.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FieldError {
    /// Not an integer.
    #[error("invalid integer {value:?}: {source}")]
    Integer {
        /// Cell text.
        value: String,
        /// Parse failure.
        #[source]
        source: ParseIntError,
    },

    /// Not a date in the portal's format.
    #[error("invalid date {0:?}")]
    Date(String),

    /// Not one of the known values for this column.
    #[error("unknown value {0:?}")]
    UnknownValue(String),

    /// Blank where a value is required.
    #[error("empty cell")]
    Empty,
}

// ============================================================================
// Layout Errors
// ============================================================================

/// The column layout is inconsistent. Detected when a parser is built.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LayoutError {
    /// Two specs claim the same column.
    #[error("Column {0} is mapped twice")]
    DuplicateColumn(usize),

    /// A column spec points past the expected column count.
    #[error("Column {index} is outside the {expected}-column layout")]
    OutOfRange {
        /// Offending index.
        index: usize,
        /// Expected column count.
        expected: usize,
    },

    /// A column inside the layout has no column spec.
    #[error("Column {0} is not mapped")]
    Unmapped(usize),
}

// ============================================================================
// Portal Error
// ============================================================================

/// Errors that abort a portal run.
#[derive(Debug, Error)]
pub enum PortalError {
    /// A round trip failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A response lacked a token or marker.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The parser layout is invalid.
    #[error("Invalid table layout: {0}")]
    Layout(#[from] LayoutError),

    /// The persistence collaborator rejected records.
    #[error("Sink error: {0}")]
    Sink(#[from] CoreError),

    /// A member write was refused before contacting the portal.
    #[error("Member record has no {field}")]
    MissingName {
        /// The blank name field.
        field: &'static str,
    },

    /// The configured base URL is unusable.
    #[error("Invalid portal URL: {0}")]
    InvalidBaseUrl(String),
}

impl PortalError {
    /// Returns true if the run failed on the network rather than on content.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}
