use std::{io, path::PathBuf, result::Result as StdResult};

use thiserror::Error;

/// Convenient result type for the panels crate.
pub type Result<T> = StdResult<T, Error>;

/// Errors raised while building or navigating the panel tree.
#[derive(Debug, Error)]
#[allow(missing_docs)]
pub enum Error {
    /// A key position has no slot on the current page.
    #[error("No item at position {position} on page {page} of panel '{panel}'")]
    NoItemAt {
        panel: String,
        page: usize,
        position: usize,
    },

    /// The item is not laid out on the panel's current page.
    #[error("Item '{item}' is not on the current page of panel '{panel}'")]
    ItemNotOnPage { panel: String, item: String },

    /// A sibling with the same name already exists.
    #[error("Panel '{panel}' already has a child named '{name}'")]
    DuplicateName { panel: String, name: String },

    /// The node handle does not refer to a live node.
    #[error("Unknown node")]
    UnknownNode,

    /// No node lives at the given tree path.
    #[error("No node at path '{0}'")]
    UnknownPath(String),

    /// The node exists but is a button.
    #[error("'{0}' is not a panel")]
    NotAPanel(String),

    /// The root panel cannot be detached.
    #[error("The root panel cannot be detached")]
    DetachRoot,

    /// No constructor is registered for the item type.
    #[error("Unknown item type '{0}'")]
    UnknownItemType(String),

    /// Constructor parameters failed to deserialize.
    #[error("Invalid parameters for '{name}': {message}")]
    InvalidParams { name: String, message: String },

    /// The grid is too small to hold navigation and content.
    #[error("Grid {rows}x{cols} is too small; need at least {min} keys")]
    Layout { rows: usize, cols: usize, min: usize },

    /// A declared path does not exist.
    #[error("Declared path {0} does not exist")]
    MissingPath(PathBuf),

    /// A declaration file could not be parsed.
    #[error("Failed to parse {path}: {message}")]
    Manifest { path: PathBuf, message: String },

    /// I/O failure while reading declarations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
