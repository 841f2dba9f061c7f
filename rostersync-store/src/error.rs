//! Store error types.

use thiserror::Error;

/// Errors that can occur in the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// No password in the environment or the keychain.
    #[error("No password for {username}: set {env_var} or run `rostersync config set-password`")]
    MissingPassword {
        /// Portal user name.
        username: String,
        /// Environment variable that was checked.
        env_var: String,
    },

    /// Keychain error.
    #[error("Keychain error: {0}")]
    Keychain(String),
}

impl StoreError {
    /// Returns true if the file simply does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::Io(e) if e.kind() == std::io::ErrorKind::NotFound)
    }
}
