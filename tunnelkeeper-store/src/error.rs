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

    /// Core error.
    #[error(transparent)]
    Core(#[from] tunnelkeeper_core::CoreError),
}

impl StoreError {
    /// Returns true if the file simply does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::Io(e) if e.kind() == std::io::ErrorKind::NotFound)
    }
}
