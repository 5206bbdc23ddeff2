use std::time::Duration;

use deck_protocol::{
    ExternalMessage, PushRequest,
    codec::{decode_line, encode_line},
};
use tokio::{
    io::{AsyncBufReadExt as _, AsyncWriteExt as _, BufReader},
    net::TcpStream,
    time::timeout,
};
use tracing::debug;

use crate::{Error, Result};

/// Default time allowed for connecting and for each reply.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// One-shot client for the command socket: each request opens a fresh
/// connection.
#[derive(Debug, Clone)]
pub struct Client {
    /// Server host.
    host: String,
    /// Server port.
    port: u16,
    /// Connect and reply timeout.
    timeout: Duration,
}

impl Client {
    /// Client for `host:port`.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Override the connect/reply timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Send one message and wait for one reply line.
    pub async fn request(&self, msg: &ExternalMessage) -> Result<ExternalMessage> {
        let addr = (self.host.as_str(), self.port);
        let stream = timeout(self.timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| Error::Timeout)??;
        let (read, mut write) = stream.into_split();
        write.write_all(encode_line(msg)?.as_bytes()).await?;
        write.flush().await?;
        debug!(host = %self.host, port = self.port, message_type = msg.message_type(), "request sent");

        let mut lines = BufReader::new(read).lines();
        let line = timeout(self.timeout, lines.next_line())
            .await
            .map_err(|_| Error::Timeout)??
            .ok_or(Error::Closed)?;
        Ok(decode_line(&line)?)
    }

    /// Liveness probe; returns the echoed text.
    pub async fn echo(&self, message: impl Into<String>) -> Result<String> {
        let message = message.into();
        match self.request(&ExternalMessage::Echo { message }).await? {
            ExternalMessage::Pong { echo, message } => Ok(echo.unwrap_or(message)),
            other => Err(Error::UnexpectedReply(format!("{other:?}"))),
        }
    }

    /// Ask the server to press `key` for `duration` seconds. Returns the
    /// acknowledgement as sent by the server, successful or not.
    pub async fn push(&self, key: i64, duration: f64) -> Result<ExternalMessage> {
        let reply = self
            .request(&ExternalMessage::Push(PushRequest { key, duration }))
            .await?;
        match reply {
            ExternalMessage::PushAck { .. } => Ok(reply),
            other => Err(Error::UnexpectedReply(format!("{other:?}"))),
        }
    }
}
