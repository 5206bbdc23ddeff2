//! Request handling behind the command socket.
use std::time::Duration;

use deck_engine::Engine;
use deck_protocol::{ExternalMessage, PushRequest};
use tracing::{debug, info, warn};

/// Answers external command messages.
pub trait Service: Send + Sync + 'static {
    /// Handle one request. `None` means the message needs no reply.
    fn handle(&self, msg: ExternalMessage) -> Option<ExternalMessage>;
}

impl Service for Engine {
    fn handle(&self, msg: ExternalMessage) -> Option<ExternalMessage> {
        match msg {
            ExternalMessage::Echo { message } => {
                debug!(%message, "echo");
                Some(ExternalMessage::pong(message))
            }
            ExternalMessage::Push(req) => Some(push(self, req)),
            ExternalMessage::Other {
                message_type,
                payload,
            } => {
                info!(message_type, ?payload, "unhandled message type");
                None
            }
            other => {
                debug!(message_type = other.message_type(), "ignoring reply-type message");
                None
            }
        }
    }
}

/// Validate and schedule a simulated key press.
fn push(engine: &Engine, req: PushRequest) -> ExternalMessage {
    let result = req.validate().and_then(|key| {
        let duration = Duration::try_from_secs_f64(req.duration).map_err(|e| e.to_string())?;
        engine.push(key, duration).map(drop).map_err(|e| e.to_string())
    });
    match &result {
        Ok(()) => info!(key = req.key, duration = req.duration, "push scheduled"),
        Err(e) => warn!(key = req.key, duration = req.duration, error = %e, "push rejected"),
    }
    ExternalMessage::push_ack(req, result)
}
