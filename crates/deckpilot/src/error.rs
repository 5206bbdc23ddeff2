use std::{io, path::PathBuf, process};

use thiserror::Error;

/// Failures that end a `deckpilot` invocation.
#[derive(Debug, Error)]
pub enum Error {
    /// Unreadable or invalid configuration file.
    #[error("{}", .0.pretty())]
    Config(#[from] config::Error),

    /// Bad `--log-match` rule.
    #[error("Invalid --log-match rule: {0}")]
    LogMatch(#[from] logging::FilterError),

    /// No deck matched the configured selection.
    #[error(transparent)]
    Device(#[from] deck_device::Error),

    /// The panel tree could not be built.
    #[error(transparent)]
    Panel(#[from] panels::Error),

    /// Plugin discovery failed.
    #[error(transparent)]
    Plugin(#[from] plugins::Error),

    /// The command channel failed or could not be reached.
    #[error(transparent)]
    Server(#[from] deck_server::Error),

    /// The root panel directory does not exist.
    #[error("Root panel directory {0} does not exist")]
    MissingRoot(PathBuf),

    /// The plugin directory does not exist.
    #[error("Plugin directory {0} does not exist")]
    MissingPluginDir(PathBuf),

    /// A command-line value the command itself rejects.
    #[error("{0}")]
    InvalidArgument(String),

    /// The running instance refused a command.
    #[error("Rejected: {0}")]
    Rejected(String),

    /// `config get` on an absent key.
    #[error("No configuration value at '{0}'")]
    NoSuchKey(String),

    /// Local I/O, mostly signal handling.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Result alias for the CLI.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Process exit status: 2 for configuration problems, 3 when no deck is
    /// usable, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_)
            | Self::LogMatch(_)
            | Self::MissingRoot(_)
            | Self::MissingPluginDir(_)
            | Self::InvalidArgument(_)
            | Self::NoSuchKey(_) => 2,
            Self::Device(_) => 3,
            _ => 1,
        }
    }

    /// Print to stderr and exit.
    pub fn exit(&self) -> ! {
        eprintln!("{self}");
        process::exit(self.exit_code())
    }
}
