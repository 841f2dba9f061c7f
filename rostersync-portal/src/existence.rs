//! Member existence check.
//!
//! The portal has no lookup endpoint. After a name search, a member exists
//! if the results grid renders an update link, which it only does for a
//! matching row. That substring test sits behind [`ExistenceCheck`] so a
//! sturdier check can replace it.

use crate::descriptor::UPDATE_MARKER;

/// Decides from a search response whether the searched member exists.
pub trait ExistenceCheck: Send + Sync {
    /// Returns true if the search response shows a match.
    fn exists(&self, search_response: &str) -> bool;
}

/// Substring match on the update-link marker.
#[derive(Debug, Clone)]
pub struct UpdateLinkMarker {
    marker: String,
}

impl UpdateLinkMarker {
    /// Matches on a custom marker.
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
        }
    }
}

impl Default for UpdateLinkMarker {
    fn default() -> Self {
        Self::new(UPDATE_MARKER)
    }
}

impl ExistenceCheck for UpdateLinkMarker {
    fn exists(&self, search_response: &str) -> bool {
        search_response.contains(&self.marker)
    }
}
