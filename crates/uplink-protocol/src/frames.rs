//! Channel frame shapes and tolerant text-frame parsing.

use crate::error::{ProtocolError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Server-pushed progress notification. Ephemeral: each one overwrites the
/// previously rendered status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusMessage {
    pub data: String,
}

impl StatusMessage {
    pub fn new(data: impl Into<String>) -> Self {
        Self { data: data.into() }
    }
}

/// Frames the server sends over the notification channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    /// Sent exactly once when the channel opens; carries the channel
    /// identifier the client must attach to correlated uploads.
    Connected { sid: String },
    /// Free-text progress push, rendered verbatim by the client.
    DisplayMessage { data: String },
}

/// Frames the client sends over the notification channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    /// One-time connected-announcement, emitted right after the channel
    /// reports its identifier.
    ClientConnected { data: String },
}

/// Parse a server text frame. Unknown frame types parse to `None` so newer
/// servers can add frames without breaking older clients.
pub fn parse_server_frame(text: &str) -> Result<Option<ServerFrame>> {
    match frame_type(text)? {
        Some(kind) if kind == "connected" || kind == "display_message" => {
            let frame: ServerFrame = serde_json::from_str(text)?;
            Ok(Some(frame))
        }
        Some(_) => Ok(None),
        None => Ok(None),
    }
}

/// Parse a client text frame. Unknown frame types parse to `None`.
pub fn parse_client_frame(text: &str) -> Result<Option<ClientFrame>> {
    match frame_type(text)? {
        Some(kind) if kind == "client_connected" => {
            let frame: ClientFrame = serde_json::from_str(text)?;
            Ok(Some(frame))
        }
        Some(_) => Ok(None),
        None => Ok(None),
    }
}

pub fn encode_server_frame(frame: &ServerFrame) -> Result<String> {
    Ok(serde_json::to_string(frame)?)
}

pub fn encode_client_frame(frame: &ClientFrame) -> Result<String> {
    Ok(serde_json::to_string(frame)?)
}

fn frame_type(text: &str) -> Result<Option<String>> {
    let value: Value = serde_json::from_str(text)?;
    let object = value
        .as_object()
        .ok_or_else(|| ProtocolError::Malformed("expected JSON object frame".to_string()))?;
    if object.is_empty() {
        return Ok(None);
    }
    let kind = object
        .get("type")
        .ok_or_else(|| ProtocolError::Malformed("missing frame type".to_string()))?
        .as_str()
        .ok_or_else(|| ProtocolError::Malformed("frame type is not a string".to_string()))?;
    Ok(Some(kind.to_string()))
}
