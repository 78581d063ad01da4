//! Messages exchanged between the worker and its client.
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::DownloadProgress;

/// Text of a `generate` request that clears the conversation.
pub const RESET_HISTORY_COMMAND: &str = "reset history";
/// Response sent after the conversation was cleared.
pub const HISTORY_RESET_ACK: &str = "History reseted";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Request {
    Init,
    Generate { text: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum WorkerEvent {
    DownloadProgress(DownloadProgress),
    Ready,
    Thinking,
    Response { data: String },
    Error { message: String },
}

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Unknown worker message type: {0}")]
    UnknownMessageType(String),
    #[error("malformed worker message: {0}")]
    Malformed(String),
    #[error("failed to encode worker event: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Parses an inbound JSON message. Unrecognised `type` tags are reported as
/// [`ProtocolError::UnknownMessageType`] rather than a parse failure.
pub fn decode_request(raw: &str) -> Result<Request, ProtocolError> {
    let value: Value =
        serde_json::from_str(raw).map_err(|err| ProtocolError::Malformed(err.to_string()))?;
    let kind = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| ProtocolError::Malformed("missing message type".to_string()))?;
    match kind {
        "init" | "generate" => {
            serde_json::from_value(value).map_err(|err| ProtocolError::Malformed(err.to_string()))
        }
        other => Err(ProtocolError::UnknownMessageType(other.to_string())),
    }
}

pub fn encode_event(event: &WorkerEvent) -> Result<String, ProtocolError> {
    Ok(serde_json::to_string(event)?)
}
