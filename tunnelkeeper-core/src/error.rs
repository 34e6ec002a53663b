//! Core error types for tunnelkeeper.

use thiserror::Error;

/// Core error type for tunnelkeeper operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Provider name not recognised.
    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Local target could not be parsed.
    #[error("Invalid local target (expected host:port): {0}")]
    InvalidTarget(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
