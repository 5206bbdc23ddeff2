//! Newline-delimited JSON framing for [`ExternalMessage`].
use serde_json::Value;
use thiserror::Error;

use crate::ExternalMessage;

/// Errors from encoding/decoding external command messages.
#[derive(Debug, Error)]
pub enum Error {
    /// The line was not valid JSON.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// The JSON value was not an object.
    #[error("expected a JSON object")]
    NotAnObject,
    /// A required field was absent.
    #[error("missing field `{0}`")]
    MissingField(&'static str),
    /// A field had the wrong type.
    #[error("invalid value for field `{0}`")]
    InvalidField(&'static str),
}

/// Encode a message as a single JSON line, newline included.
pub fn encode_line(msg: &ExternalMessage) -> Result<String, Error> {
    let mut line = serde_json::to_string(&msg.to_value())?;
    line.push('\n');
    Ok(line)
}

/// Decode one line (trailing whitespace ignored) into a message.
///
/// # Errors
/// Returns an error if the line is not a JSON object carrying an integer
/// `message_type`, or if a known message type lacks its required fields.
pub fn decode_line(line: &str) -> Result<ExternalMessage, Error> {
    let value: Value = serde_json::from_str(line.trim_end())?;
    ExternalMessage::from_value(value)
}
