use std::{io, path::PathBuf, result::Result as StdResult};

use thiserror::Error;

/// Convenient result type for the plugins crate.
pub type Result<T> = StdResult<T, Error>;

/// Reasons a plugin fails to load. Each one skips only that plugin.
#[derive(Debug, Error)]
#[allow(missing_docs)]
pub enum Error {
    /// I/O failure while scanning or reading a manifest.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The manifest could not be parsed.
    #[error("Invalid manifest {path}: {message}")]
    Manifest { path: PathBuf, message: String },

    /// No factory is registered for the entry point.
    #[error("Unknown entry point '{0}'")]
    UnknownEntryPoint(String),

    /// The entry point is not of the form `module:Name`.
    #[error("Invalid entry point '{0}' (expected 'module:Name')")]
    InvalidEntryPoint(String),

    /// A declared panel's mount path does not name a panel.
    #[error("Mount target '{mount}' not found for panel '{panel}'")]
    MountTargetMissing { panel: String, mount: String },

    /// A declared panel's directory does not exist.
    #[error("Panel path {0} does not exist")]
    PanelPathMissing(PathBuf),

    /// Building or attaching a panel failed.
    #[error(transparent)]
    Panel(#[from] panels::Error),

    /// The plugin factory refused to build the plugin.
    #[error("Plugin '{plugin}' could not be created: {message}")]
    Instantiate { plugin: String, message: String },

    /// The plugin's `register` hook failed.
    #[error("Plugin '{plugin}' failed to register: {message}")]
    Register { plugin: String, message: String },

    /// No loaded plugin has this name.
    #[error("No plugin named '{0}' is loaded")]
    UnknownPlugin(String),
}
