use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Data carried by an event.
///
/// Handlers receive the payload by reference; multi-argument events use the
/// structured variants or [`Payload::Args`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Payload {
    /// No data.
    #[default]
    Empty,
    /// A key index on the current page.
    Key {
        /// Key index.
        key: usize,
    },
    /// A raw device key transition.
    KeyChange {
        /// Key index.
        key: usize,
        /// True on press, false on release.
        pressed: bool,
    },
    /// A periodic tick.
    Tick {
        /// Tick number since the ticker started.
        index: u64,
        /// Whole intervals elapsed since the ticker started.
        count: u64,
    },
    /// A page transition.
    PageChange {
        /// Page index before the change.
        from: usize,
        /// Page index after the change.
        to: usize,
    },
    /// A panel reference by tree path.
    Panel {
        /// Slash separated path from the root.
        path: String,
    },
    /// A single free-form value.
    Value {
        /// The value.
        value: Value,
    },
    /// Positional arguments.
    Args {
        /// The arguments in order.
        args: Vec<Value>,
    },
}

impl Payload {
    /// Wrap a single value.
    pub fn value(value: impl Into<Value>) -> Self {
        Self::Value {
            value: value.into(),
        }
    }

    /// Wrap positional arguments.
    pub fn args<I, V>(args: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::Args {
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether the payload carries no data.
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Positional view of the payload, as a handler taking arguments sees it.
    ///
    /// `Empty` yields no arguments, `Args` yields its elements, structured
    /// variants yield their fields in declaration order and `Value` yields
    /// itself.
    pub fn to_args(&self) -> Vec<Value> {
        match self {
            Self::Empty => Vec::new(),
            Self::Key { key } => vec![Value::from(*key)],
            Self::KeyChange { key, pressed } => vec![Value::from(*key), Value::from(*pressed)],
            Self::Tick { index, count } => vec![Value::from(*index), Value::from(*count)],
            Self::PageChange { from, to } => vec![Value::from(*from), Value::from(*to)],
            Self::Panel { path } => vec![Value::from(path.as_str())],
            Self::Value { value } => vec![value.clone()],
            Self::Args { args } => args.clone(),
        }
    }
}
