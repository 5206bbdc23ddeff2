//! Error types for configuration loading and validation.

use std::{
    cmp::{max, min},
    fmt::Write as _,
    path::{Path, PathBuf},
};

use thiserror::Error;

#[derive(Debug, Error, Clone)]
/// Errors produced while loading, parsing, or validating a configuration.
pub enum Error {
    #[error("{message}")]
    /// I/O or filesystem read error.
    Read {
        /// Optional path associated with the read error.
        path: Option<PathBuf>,
        /// Human-readable error message.
        message: String,
    },
    #[error("{message}")]
    /// TOML syntax or schema error, with a location when the parser knows one.
    Parse {
        /// Optional path associated with the parse error.
        path: Option<PathBuf>,
        /// 1-based line number.
        line: Option<usize>,
        /// 1-based column number.
        col: Option<usize>,
        /// Human-readable error message.
        message: String,
        /// Rendered excerpt including a caret at the error location.
        excerpt: Option<String>,
    },
    #[error("{message}")]
    /// The file parsed but describes an unusable setup.
    Validation {
        /// Optional path associated with the validation error.
        path: Option<PathBuf>,
        /// Human-readable error message.
        message: String,
    },
}

impl Error {
    /// Render a human-friendly error message including location and an excerpt when available.
    pub fn pretty(&self) -> String {
        match self {
            Self::Read { path, message } => match path {
                Some(p) => format!("Read error at {}: {}", p.display(), message),
                None => format!("Read error: {}", message),
            },
            Self::Parse {
                path,
                line,
                col,
                message,
                excerpt,
            } => {
                let loc = match (line, col) {
                    (Some(l), Some(c)) => format!("{}:{}", l, c),
                    (Some(l), None) => format!("{}", l),
                    _ => String::new(),
                };
                let head = match (path, loc.is_empty()) {
                    (Some(p), false) => format!("Config parse error at {}:{}", p.display(), loc),
                    (Some(p), true) => format!("Config parse error in {}", p.display()),
                    (None, false) => format!("Config parse error at {}", loc),
                    (None, true) => "Config parse error".to_string(),
                };
                match excerpt {
                    Some(ex) => format!("{}\n{}\n{}", head, message, ex),
                    None => format!("{}\n{}", head, message),
                }
            }
            Self::Validation { path, message } => match path {
                Some(p) => format!("Config validation error at {}\n{}", p.display(), message),
                None => format!("Config validation error\n{}", message),
            },
        }
    }

    /// Access the optional path attached to this error.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Read { path, .. } | Self::Parse { path, .. } | Self::Validation { path, .. } => {
                path.as_deref()
            }
        }
    }

    /// Attach a path to an error produced from in-memory text.
    pub(crate) fn with_path(mut self, p: &Path) -> Self {
        match &mut self {
            Self::Read { path, .. } | Self::Parse { path, .. } | Self::Validation { path, .. } => {
                *path = Some(p.to_path_buf());
            }
        }
        self
    }

    /// Build a parse error from a TOML deserialization failure.
    pub(crate) fn from_toml(source: &str, err: &toml::de::Error) -> Self {
        let (line, col) = match err.span() {
            Some(span) => {
                let (l, c) = line_col(source, span.start);
                (Some(l), Some(c))
            }
            None => (None, None),
        };
        Self::Parse {
            path: None,
            line,
            col,
            message: err.message().to_string(),
            excerpt: line.zip(col).map(|(l, c)| excerpt_at(source, l, c)),
        }
    }
}

/// 1-based line and column of a byte offset.
fn line_col(source: &str, offset: usize) -> (usize, usize) {
    let before = &source[..offset.min(source.len())];
    let line = before.matches('\n').count() + 1;
    let col = before
        .rfind('\n')
        .map_or(before.chars().count(), |i| before[i + 1..].chars().count())
        + 1;
    (line, col)
}

/// Build a small 2-3 line excerpt with a caret at `(line_no, col_no)`.
pub fn excerpt_at(source: &str, line_no: usize, col_no: usize) -> String {
    let lines: Vec<&str> = source.lines().collect();
    let total = lines.len();
    let start = max(1usize, line_no.saturating_sub(2));
    let end = min(total, line_no + 1);

    let mut out = String::new();
    for n in start..=end {
        let text = lines.get(n - 1).copied().unwrap_or("");
        let _ignored = writeln!(out, " {:>4} | {}", n, text);
        if n == line_no {
            let prefix = format!(" {:>4} | ", n);
            let _ignored = writeln!(
                out,
                "{}{}^",
                " ".repeat(prefix.len()),
                " ".repeat(col_no.saturating_sub(1))
            );
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_col_counts_from_one() {
        let src = "a = 1\nbb = x\n";
        assert_eq!(line_col(src, 0), (1, 1));
        assert_eq!(line_col(src, 11), (2, 6));
    }

    #[test]
    fn excerpt_marks_column() {
        let ex = excerpt_at("one\ntwo\nthree\n", 2, 3);
        assert!(ex.contains("    2 | two"));
        assert!(ex.contains("  ^"));
    }

    #[test]
    fn pretty_includes_location() {
        let e = Error::Parse {
            path: Some(PathBuf::from("/tmp/c.toml")),
            line: Some(3),
            col: Some(4),
            message: "bad".into(),
            excerpt: None,
        };
        assert_eq!(e.pretty(), "Config parse error at /tmp/c.toml:3:4\nbad");
        let v = Error::Validation {
            path: None,
            message: "nope".into(),
        };
        assert_eq!(v.pretty(), "Config validation error\nnope");
    }
}
