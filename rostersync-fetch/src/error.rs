//! Fetch error types.

use thiserror::Error;

// ============================================================================
// Transport Error
// ============================================================================

/// A round trip to the portal failed at the network or HTTP level.
///
/// Always surfaced to the caller; nothing in the client retries.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Request error (connect, TLS, timeout, body read).
    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    /// The portal answered with a non-success status.
    #[error("Unexpected status {status} from {url}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Requested URL.
        url: String,
    },

    /// Invalid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Host not allowed for this transport.
    #[error("Host not allowed: {0}")]
    HostNotAllowed(String),

    /// Header value could not be built.
    #[error("Invalid header value: {0}")]
    InvalidHeader(String),

    /// Redirect chain too long.
    #[error("Too many redirects starting at {0}")]
    TooManyRedirects(String),
}

impl TransportError {
    /// Returns true if the failure was a client-side timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Request(e) if e.is_timeout())
    }
}

// ============================================================================
// Protocol Error
// ============================================================================

/// A response arrived but lacked something the postback protocol needs.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// A postback token was not found in a response body.
    #[error("Postback token {token} missing from {step} response")]
    MissingToken {
        /// Token field name, e.g. `__VIEWSTATE`.
        token: String,
        /// Protocol step that needed it.
        step: String,
    },

    /// An expected page marker was not found.
    #[error("Marker {marker:?} missing from {step} response")]
    MissingMarker {
        /// The marker text.
        marker: String,
        /// Protocol step that expected it.
        step: String,
    },
}
