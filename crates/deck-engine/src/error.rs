use std::result::Result as StdResult;

use thiserror::Error;

/// Convenient result type for the engine crate.
pub type Result<T> = StdResult<T, Error>;

/// Errors reported to whoever asked the engine to act.
#[derive(Debug, Error)]
pub enum Error {
    /// The device refused the operation.
    #[error(transparent)]
    Device(#[from] deck_device::Error),

    /// A tree operation failed.
    #[error(transparent)]
    Panel(#[from] panels::Error),

    /// The device has not been opened.
    #[error("device not initialized")]
    NotInitialized,

    /// Simulated presses need a positive duration.
    #[error("duration must be > 0")]
    InvalidDuration,
}
