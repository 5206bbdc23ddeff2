//! Regex include filters for log output.
//!
//! A rule such as `level=INFO|WARN,target=panels.*` is one [`MatchRule`]:
//! every criterion must match. A [`MatchFilter`] holds any number of rules
//! and lets an event through when at least one of them matches, or when it
//! holds none.

use regex::{Regex, RegexBuilder};
use thiserror::Error;
use tracing::{Event, Metadata, Subscriber};
use tracing_subscriber::layer::{Context, Filter};

use crate::fmt::{RenderedLog, render_event};

/// Problems with a `--log-match` rule.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FilterError {
    /// Nothing but separators and whitespace.
    #[error("empty filter specification")]
    Empty,
    /// A token without `=` or `:`.
    #[error("invalid token '{0}', expected key=value")]
    Token(String),
    /// A key other than level, target or message.
    #[error("unknown filter field '{key}' in '{spec}'")]
    UnknownKey { key: String, spec: String },
    /// `key=` with nothing after it.
    #[error("missing regex for '{key}' in '{spec}'")]
    MissingValue { key: String, spec: String },
    /// The regex did not compile.
    #[error("invalid regex '{pattern}' for '{key}': {message}")]
    Regex {
        key: String,
        pattern: String,
        message: String,
    },
}

/// Criteria that must all match.
#[derive(Debug, Clone)]
pub struct MatchRule {
    /// Matched case-insensitively against the level name.
    level: Option<Regex>,
    /// Matched against the event target.
    target: Option<Regex>,
    /// Matched against the rendered message.
    message: Option<Regex>,
    /// Text this rule was parsed from.
    raw: String,
}

/// Field a rule key refers to.
#[derive(Clone, Copy)]
enum Field {
    /// Severity.
    Level,
    /// Target.
    Target,
    /// Message.
    Message,
}

impl Field {
    /// Resolve a rule key, with the accepted aliases.
    fn parse(key: &str) -> Option<Self> {
        match key {
            "level" | "type" | "severity" => Some(Self::Level),
            "target" | "source" | "module" => Some(Self::Target),
            "message" | "msg" | "text" => Some(Self::Message),
            _ => None,
        }
    }
}

impl MatchRule {
    /// Parse a comma or semicolon separated list of `key=regex` pairs.
    pub fn parse(spec: &str) -> Result<Self, FilterError> {
        let tokens: Vec<&str> = spec
            .split([',', ';'])
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect();
        if tokens.is_empty() {
            return Err(FilterError::Empty);
        }
        let mut rule = Self {
            level: None,
            target: None,
            message: None,
            raw: spec.to_string(),
        };
        for token in tokens {
            let (key, value) = token
                .split_once('=')
                .or_else(|| token.split_once(':'))
                .ok_or_else(|| FilterError::Token(token.to_string()))?;
            let key = key.trim().to_ascii_lowercase();
            let field = Field::parse(&key).ok_or_else(|| FilterError::UnknownKey {
                key: key.clone(),
                spec: spec.to_string(),
            })?;
            let value = value.trim();
            if value.is_empty() {
                return Err(FilterError::MissingValue {
                    key,
                    spec: spec.to_string(),
                });
            }
            let re = RegexBuilder::new(value)
                .case_insensitive(matches!(field, Field::Level))
                .build()
                .map_err(|e| FilterError::Regex {
                    key,
                    pattern: value.to_string(),
                    message: e.to_string(),
                })?;
            match field {
                Field::Level => rule.level = Some(re),
                Field::Target => rule.target = Some(re),
                Field::Message => rule.message = Some(re),
            }
        }
        Ok(rule)
    }

    /// Text this rule came from.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Whether every criterion matches.
    pub fn matches(&self, log: &RenderedLog) -> bool {
        let hit = |re: &Option<Regex>, text: &str| re.as_ref().is_none_or(|r| r.is_match(text));
        hit(&self.level, &log.level) && hit(&self.target, &log.target) && hit(&self.message, &log.message)
    }
}

/// Per-layer filter passing events that match any rule.
#[derive(Debug, Clone, Default)]
pub struct MatchFilter {
    /// OR-combined rules.
    rules: Vec<MatchRule>,
}

impl MatchFilter {
    /// Parse every rule; the first bad one is the error.
    pub fn parse<I, S>(specs: I) -> Result<Self, FilterError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let rules = specs
            .into_iter()
            .map(|s| MatchRule::parse(s.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules })
    }

    /// Whether no rules are configured.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Whether `log` passes.
    pub fn allows(&self, log: &RenderedLog) -> bool {
        self.rules.is_empty() || self.rules.iter().any(|r| r.matches(log))
    }
}

impl<S: Subscriber> Filter<S> for MatchFilter {
    fn enabled(&self, _meta: &Metadata<'_>, _cx: &Context<'_, S>) -> bool {
        true
    }

    fn event_enabled(&self, event: &Event<'_>, _cx: &Context<'_, S>) -> bool {
        self.is_empty() || self.allows(&render_event(event))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log(level: &str, target: &str, message: &str) -> RenderedLog {
        RenderedLog {
            level: level.into(),
            target: target.into(),
            message: message.into(),
            fields: String::new(),
        }
    }

    #[test]
    fn criteria_and_combine() {
        let rule = MatchRule::parse("level=info|warn; target=^panels").unwrap();
        assert!(rule.matches(&log("INFO", "panels::registry", "x")));
        assert!(rule.matches(&log("WARN", "panels", "x")));
        assert!(!rule.matches(&log("DEBUG", "panels", "x")));
        assert!(!rule.matches(&log("INFO", "plugins", "x")));
        assert_eq!(rule.raw(), "level=info|warn; target=^panels");
    }

    #[test]
    fn rules_or_combine() {
        let f = MatchFilter::parse(["msg=loaded", "source:deck_engine"]).unwrap();
        assert!(f.allows(&log("INFO", "plugins", "loaded plugin")));
        assert!(f.allows(&log("TRACE", "deck_engine", "tick")));
        assert!(!f.allows(&log("INFO", "panels", "detaching")));
        assert!(MatchFilter::parse(Vec::<String>::new()).unwrap().allows(&log("x", "y", "z")));
    }

    #[test]
    fn message_match_is_case_sensitive() {
        let rule = MatchRule::parse("message=Loaded").unwrap();
        assert!(!rule.matches(&log("INFO", "t", "loaded")));
    }

    #[test]
    fn bad_specs() {
        assert_eq!(MatchRule::parse(" ,; ").unwrap_err(), FilterError::Empty);
        assert!(matches!(MatchRule::parse("level"), Err(FilterError::Token(_))));
        assert!(matches!(MatchRule::parse("color=red"), Err(FilterError::UnknownKey { .. })));
        assert!(matches!(MatchRule::parse("level="), Err(FilterError::MissingValue { .. })));
        assert!(matches!(MatchRule::parse("message=(unclosed"), Err(FilterError::Regex { .. })));
    }
}
