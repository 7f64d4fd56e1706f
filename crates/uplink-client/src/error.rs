//! Client error types.

use thiserror::Error;
use uplink_protocol::ProtocolError;

/// Client error type.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("upload request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("upload endpoint returned status {status}")]
    HttpStatus { status: u16, body: String },

    #[error("timeout error: {0}")]
    Timeout(String),

    #[error("not connected")]
    NotConnected,

    #[error("already connected")]
    AlreadyConnected,

    #[error("an upload is already in flight for this display region")]
    UploadInFlight,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Client result type.
pub type Result<T> = std::result::Result<T, ClientError>;
