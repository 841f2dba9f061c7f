// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # `RosterSync` Fetch
//!
//! Wire-level plumbing for talking to the membership portal.
//!
//! The portal is a server-rendered web-forms site: every request must echo
//! the opaque postback tokens the previous page issued, and the session
//! cookie issued on the first GET. This crate provides:
//!
//! ## Host APIs
//!
//! - [`host::http`] - The [`PortalTransport`] seam and its reqwest-backed
//!   implementation, [`HttpTransport`]
//!
//! ## Session & Encoding
//!
//! - [`session::SessionState`] - Token/Session Store for one run
//! - [`form`] - Postback and standard form-urlencoded body builders
//! - [`html`] - Entity decoding and tag stripping shared with the parser
//!
//! ## Example
//!
//! ```ignore
//! use rostersync_fetch::{form, HttpTransport, PortalRequest, SessionState, TransportSettings};
//!
//! let transport = HttpTransport::new(&TransportSettings::default())?;
//! let mut session = SessionState::new();
//!
//! let response = transport.send(PortalRequest::get(url)).await?;
//! session.absorb_required(&response, "open portal")?;
//!
//! let body = form::encode_postback(&fields, &session, "login")?;
//! ```

// Core modules
pub mod error;
pub mod form;
pub mod host;
pub mod html;
pub mod session;

// Re-export key types at crate root

// Errors
pub use error::{ProtocolError, TransportError};

// Host APIs
pub use host::http::{
    HttpTransport, Method, PortalRequest, PortalResponse, PortalTransport, TransportSettings,
};

// Session & Encoding
pub use form::{FieldValue, FormField, decode_form, encode_postback, encode_standard};
pub use session::{EVENT_ARGUMENT, EVENT_TARGET, PostbackToken, SESSION_COOKIE, SessionState};
