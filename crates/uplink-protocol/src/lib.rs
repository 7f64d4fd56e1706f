//! Wire contract between an uplink page session and the server.
//!
//! Two surfaces share these shapes:
//! - the persistent notification channel under [`CHANNEL_PATH`], carrying
//!   one [`ClientFrame`] hello and any number of [`ServerFrame`] pushes
//! - the one-shot multipart upload to [`UPLOAD_PATH`], correlated back to
//!   the channel through the [`SID_FIELD`] form field

pub mod error;
pub mod frames;

pub use error::{ProtocolError, Result};
pub use frames::{
    ClientFrame, ServerFrame, StatusMessage, encode_client_frame, encode_server_frame,
    parse_client_frame, parse_server_frame,
};

/// Fixed path of the persistent notification channel.
pub const CHANNEL_PATH: &str = "/test";

/// Fixed path of the upload endpoint.
pub const UPLOAD_PATH: &str = "/view";

/// Form field carrying the channel identifier on every upload request.
pub const SID_FIELD: &str = "sid";

/// Form field carrying the file payload.
pub const FILE_FIELD: &str = "file";
