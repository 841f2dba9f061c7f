//! Core error types for `RosterSync`.

use std::num::ParseIntError;

use thiserror::Error;

/// Core error type for `RosterSync` operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Invalid data in a record or input file.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The persistence collaborator rejected the records.
    #[error("Sink error: {0}")]
    Sink(String),

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}

/// A numeric sub-field inside an `OtherInfo` string failed to parse.
///
/// Never fatal: the decoder logs it and leaves the field unset.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid value {value:?} for OtherInfo tag '{tag}': {source}")]
pub struct AnnotationParseError {
    /// The tag label the value belonged to.
    pub tag: &'static str,
    /// The raw value found between the brackets.
    pub value: String,
    /// Underlying integer parse failure.
    #[source]
    pub source: ParseIntError,
}
