//! `deckpilot shell`: talk to a running instance over the command channel.
use deck_protocol::{ExternalMessage, PushRequest};
use deck_server::Client;

use crate::{Error, Result};

/// Send an ECHO and return the reply.
pub async fn echo(client: &Client, message: String) -> Result<ExternalMessage> {
    Ok(client.request(&ExternalMessage::Echo { message }).await?)
}

/// Send a PUSH and return the acknowledgement. Requests the server would
/// reject outright are refused before connecting.
pub async fn push(client: &Client, key: i64, duration: f64) -> Result<ExternalMessage> {
    PushRequest { key, duration }
        .validate()
        .map_err(Error::InvalidArgument)?;
    Ok(client.push(key, duration).await?)
}

/// Pretty JSON for a reply.
pub fn render(reply: &ExternalMessage) -> String {
    let value = reply.to_value();
    serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string())
}

/// The failure a reply reports, if any.
pub fn failure(reply: &ExternalMessage) -> Option<String> {
    match reply {
        ExternalMessage::PushAck {
            success: false,
            error,
            ..
        } => Some(error.clone().unwrap_or_else(|| "push was rejected".into())),
        _ => None,
    }
}
