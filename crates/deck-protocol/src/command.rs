//! Messages exchanged over the external command socket.
//!
//! Every message is a JSON object carrying an integer `message_type`
//! discriminant next to its payload fields. Unknown discriminants are kept
//! as an opaque payload rather than rejected.

use serde_json::{Map, Value};

use crate::codec::Error;

/// Default press duration for a PUSH without an explicit `duration`.
pub const DEFAULT_PUSH_DURATION: f64 = 2.0;

/// Message type discriminants understood by DeckPilot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    /// Liveness probe; answered with [`MessageType::Pong`].
    Echo,
    /// Reply to an echo.
    Pong,
    /// Simulate a key press of a given duration.
    Push,
    /// Reply to a push.
    PushAck,
}

impl MessageType {
    /// Wire value of the discriminant.
    pub fn as_i64(self) -> i64 {
        match self {
            Self::Echo => 1,
            Self::Pong => 2,
            Self::Push => 3,
            Self::PushAck => 4,
        }
    }

    /// Map a wire value back to a known message type.
    pub fn try_from_i64(v: i64) -> Option<Self> {
        match v {
            1 => Some(Self::Echo),
            2 => Some(Self::Pong),
            3 => Some(Self::Push),
            4 => Some(Self::PushAck),
            _ => None,
        }
    }
}

/// A parsed external command message.
#[derive(Debug, Clone, PartialEq)]
pub enum ExternalMessage {
    /// Echo request.
    Echo {
        /// Text to echo back.
        message: String,
    },
    /// Echo reply.
    Pong {
        /// Reply text (`"PONG"`).
        message: String,
        /// The echoed request text.
        echo: Option<String>,
    },
    /// Key press simulation request.
    Push(PushRequest),
    /// Key press simulation acknowledgement.
    PushAck {
        /// Requested key index.
        key: i64,
        /// Requested duration in seconds.
        duration: f64,
        /// Whether the press was scheduled.
        success: bool,
        /// Failure reason when `success` is false.
        error: Option<String>,
    },
    /// A message with an unrecognised discriminant, kept verbatim.
    Other {
        /// Raw discriminant.
        message_type: i64,
        /// Remaining fields.
        payload: Map<String, Value>,
    },
}

/// Payload of a PUSH request, unvalidated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PushRequest {
    /// Key index to press.
    pub key: i64,
    /// Seconds between press and release.
    pub duration: f64,
}

impl PushRequest {
    /// Check the request's own constraints (`key >= 0`, `duration > 0`).
    ///
    /// Range checks against a concrete device happen where the device is known.
    pub fn validate(&self) -> Result<usize, String> {
        if self.key < 0 {
            return Err("key must be >= 0".to_string());
        }
        if !(self.duration > 0.0) || !self.duration.is_finite() {
            return Err("duration must be > 0".to_string());
        }
        usize::try_from(self.key).map_err(|e| e.to_string())
    }
}

impl ExternalMessage {
    /// Echo request with the conventional `"PING"` text.
    pub fn ping() -> Self {
        Self::Echo {
            message: "PING".to_string(),
        }
    }

    /// Build the PONG reply for an echoed text.
    pub fn pong(echo: impl Into<String>) -> Self {
        Self::Pong {
            message: "PONG".to_string(),
            echo: Some(echo.into()),
        }
    }

    /// Build a PUSH request.
    pub fn push(key: i64, duration: f64) -> Self {
        Self::Push(PushRequest { key, duration })
    }

    /// Build a PUSH_ACK for a request.
    pub fn push_ack(req: PushRequest, result: Result<(), String>) -> Self {
        let (success, error) = match result {
            Ok(()) => (true, None),
            Err(e) => (false, Some(e)),
        };
        Self::PushAck {
            key: req.key,
            duration: req.duration,
            success,
            error,
        }
    }

    /// Raw discriminant of this message.
    pub fn message_type(&self) -> i64 {
        match self {
            Self::Echo { .. } => MessageType::Echo.as_i64(),
            Self::Pong { .. } => MessageType::Pong.as_i64(),
            Self::Push(_) => MessageType::Push.as_i64(),
            Self::PushAck { .. } => MessageType::PushAck.as_i64(),
            Self::Other { message_type, .. } => *message_type,
        }
    }

    /// Flatten into a JSON object with the `message_type` field first.
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("message_type".into(), Value::from(self.message_type()));
        match self {
            Self::Echo { message } => {
                map.insert("message".into(), Value::from(message.as_str()));
            }
            Self::Pong { message, echo } => {
                map.insert("message".into(), Value::from(message.as_str()));
                if let Some(echo) = echo {
                    map.insert("echo".into(), Value::from(echo.as_str()));
                }
            }
            Self::Push(req) => {
                map.insert("key".into(), Value::from(req.key));
                map.insert("duration".into(), Value::from(req.duration));
            }
            Self::PushAck {
                key,
                duration,
                success,
                error,
            } => {
                map.insert("key".into(), Value::from(*key));
                map.insert("duration".into(), Value::from(*duration));
                map.insert("success".into(), Value::from(*success));
                if let Some(error) = error {
                    map.insert("error".into(), Value::from(error.as_str()));
                }
            }
            Self::Other { payload, .. } => {
                for (k, v) in payload {
                    map.insert(k.clone(), v.clone());
                }
            }
        }
        Value::Object(map)
    }

    /// Parse a JSON value into a message.
    pub fn from_value(value: Value) -> Result<Self, Error> {
        let Value::Object(mut map) = value else {
            return Err(Error::NotAnObject);
        };
        let raw_type = map.remove("message_type").ok_or(Error::MissingField("message_type"))?;
        let message_type = as_int(&raw_type).ok_or(Error::InvalidField("message_type"))?;
        let Some(kind) = MessageType::try_from_i64(message_type) else {
            return Ok(Self::Other {
                message_type,
                payload: map,
            });
        };
        let msg = match kind {
            MessageType::Echo => Self::Echo {
                message: text_field(&map, "message").unwrap_or_default(),
            },
            MessageType::Pong => Self::Pong {
                message: text_field(&map, "message").unwrap_or_else(|| "PONG".to_string()),
                echo: text_field(&map, "echo"),
            },
            MessageType::Push => {
                let key = map.get("key").ok_or(Error::MissingField("key"))?;
                let key = as_int(key).ok_or(Error::InvalidField("key"))?;
                let duration = match map.get("duration") {
                    Some(v) => v.as_f64().ok_or(Error::InvalidField("duration"))?,
                    None => DEFAULT_PUSH_DURATION,
                };
                Self::Push(PushRequest { key, duration })
            }
            MessageType::PushAck => Self::PushAck {
                key: map.get("key").and_then(as_int).unwrap_or(-1),
                duration: map.get("duration").and_then(Value::as_f64).unwrap_or(0.0),
                success: map.get("success").and_then(Value::as_bool).unwrap_or(false),
                error: text_field(&map, "error"),
            },
        };
        Ok(msg)
    }
}

/// Read an integer, accepting whole floats and numeric strings.
fn as_int(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Read a field as text; non-string scalars are stringified.
fn text_field(map: &Map<String, Value>, key: &str) -> Option<String> {
    match map.get(key)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn push_defaults_duration() {
        let msg = ExternalMessage::from_value(json!({"message_type": 3, "key": 4})).unwrap();
        assert_eq!(msg, ExternalMessage::push(4, DEFAULT_PUSH_DURATION));
    }

    #[test]
    fn push_without_key_is_rejected() {
        let err = ExternalMessage::from_value(json!({"message_type": 3})).unwrap_err();
        assert!(matches!(err, Error::MissingField("key")));
    }

    #[test]
    fn unknown_type_is_preserved() {
        let raw = json!({"message_type": 42, "foo": "bar", "n": 1});
        let msg = ExternalMessage::from_value(raw.clone()).unwrap();
        match &msg {
            ExternalMessage::Other {
                message_type,
                payload,
            } => {
                assert_eq!(*message_type, 42);
                assert_eq!(payload.get("foo"), Some(&json!("bar")));
            }
            other => panic!("{:?}", other),
        }
        assert_eq!(msg.to_value(), raw);
    }

    #[test]
    fn push_ack_omits_error_on_success() {
        let req = PushRequest {
            key: 3,
            duration: 0.2,
        };
        let ok = ExternalMessage::push_ack(req, Ok(())).to_value();
        assert_eq!(
            ok,
            json!({"message_type": 4, "key": 3, "duration": 0.2, "success": true})
        );
        let failed = ExternalMessage::push_ack(req, Err("device not initialized".into())).to_value();
        assert_eq!(failed["success"], json!(false));
        assert_eq!(failed["error"], json!("device not initialized"));
    }

    #[test]
    fn push_validation() {
        assert_eq!(PushRequest { key: 2, duration: 0.5 }.validate(), Ok(2));
        assert!(PushRequest { key: -1, duration: 0.5 }.validate().is_err());
        assert!(PushRequest { key: 1, duration: 0.0 }.validate().is_err());
        assert!(PushRequest { key: 1, duration: f64::NAN }.validate().is_err());
    }

    #[test]
    fn missing_message_type() {
        let err = ExternalMessage::from_value(json!({"message": "hi"})).unwrap_err();
        assert!(matches!(err, Error::MissingField("message_type")));
    }
}
