//! Render `tracing` events into level/target/message triples and logfmt lines.

use std::fmt::{self, Debug, Write as _};

use tracing::{
    Event,
    field::{Field, Visit},
};

/// Fields extracted from one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedLog {
    /// Severity, upper case (`INFO`, `WARN`, ...).
    pub level: String,
    /// Event target, usually the module path.
    pub target: String,
    /// The `message` field, or the other fields as `key=value` when absent.
    pub message: String,
    /// Non-message fields as `key=value`, space separated.
    pub fields: String,
}

/// Collects the message and the remaining fields of an event.
#[derive(Default)]
struct Collect {
    /// Captured `message` field.
    message: Option<String>,
    /// Everything else.
    fields: String,
}

impl Collect {
    /// Append one `key=value` pair.
    fn push(&mut self, name: &str, value: fmt::Arguments<'_>) {
        if !self.fields.is_empty() {
            self.fields.push(' ');
        }
        let _ignored = write!(self.fields, "{name}={value}");
    }
}

impl Visit for Collect {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        } else {
            self.push(field.name(), format_args!("{value:?}"));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn Debug) {
        if field.name() == "message" {
            self.message = Some(format!("{value:?}"));
        } else {
            self.push(field.name(), format_args!("{value:?}"));
        }
    }
}

/// Extract level, target, message and fields from an event.
pub fn render_event(event: &Event<'_>) -> RenderedLog {
    let meta = event.metadata();
    let mut c = Collect::default();
    event.record(&mut c);
    let message = c.message.unwrap_or_else(|| c.fields.clone());
    RenderedLog {
        level: meta.level().to_string(),
        target: meta.target().to_string(),
        message,
        fields: c.fields,
    }
}

impl fmt::Display for RenderedLog {
    /// `level=INFO target=panels msg="..." key=value`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "level={} target={} msg={:?}", self.level, self.target, self.message)?;
        if !self.fields.is_empty() && self.fields != self.message {
            write!(f, " {}", self.fields)?;
        }
        Ok(())
    }
}
