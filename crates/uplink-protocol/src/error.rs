//! Protocol error types.

use thiserror::Error;

/// Protocol error type.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed frame: {0}")]
    Malformed(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Protocol result type.
pub type Result<T> = std::result::Result<T, ProtocolError>;
