use std::result::Result as StdResult;

use thiserror::Error;

/// Convenient result type for device operations.
pub type Result<T> = StdResult<T, Error>;

/// Errors raised by device drivers and the device manager.
#[derive(Debug, Error)]
#[allow(missing_docs)]
pub enum Error {
    /// No enumerated device matches the requested serial number or index.
    #[error("No matching device found ({0})")]
    NoDevice(String),

    /// The key index is outside the device's key range.
    #[error("Invalid key index {key} (device has {count} keys)")]
    KeyOutOfRange { key: usize, count: usize },

    /// The device has not been opened.
    #[error("Device {0} is not open")]
    NotOpen(String),

    /// The simulator configuration is unusable.
    #[error("Device configuration error: {0}")]
    Config(String),
}
