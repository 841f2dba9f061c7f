//! Host APIs for system interactions.
//!
//! - [`http`] - Portal transport seam and the reqwest-backed implementation

pub mod http;
