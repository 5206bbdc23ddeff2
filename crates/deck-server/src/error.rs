use std::{io::Error as IoError, result::Result as StdResult};

use deck_protocol::codec::Error as CodecError;
use thiserror::Error;

/// Convenience alias for results in this crate.
pub type Result<T> = StdResult<T, Error>;

/// Errors from the command server and client.
#[derive(Error, Debug)]
pub enum Error {
    /// Socket failure.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// A line could not be encoded or decoded.
    #[error("Protocol error: {0}")]
    Codec(#[from] CodecError),

    /// The peer closed the connection before replying.
    #[error("Connection closed before a reply was received")]
    Closed,

    /// No reply within the client timeout.
    #[error("Timed out waiting for a reply")]
    Timeout,

    /// The peer answered with something other than what was asked for.
    #[error("Unexpected reply: {0}")]
    UnexpectedReply(String),
}
