//! External command channel.
//!
//! A [`Server`] accepts TCP connections carrying newline-delimited JSON
//! messages (see [`deck_protocol::command`]) and answers them through a
//! [`Service`]; the engine is the production service. [`Client`] is the
//! matching one-request-per-connection client used by `deckpilot shell`.
//!
//! A line that is not a valid message closes its connection. A PUSH that
//! cannot be honoured is still answered, with `success: false`.
mod client;
mod error;
mod server;
mod service;

pub use client::Client;
pub use error::{Error, Result};
pub use server::{MAX_LINE_LENGTH, Server};
pub use service::Service;
