//! TCP listener for external commands.

use std::{net::SocketAddr, sync::Arc};

use deck_protocol::codec::{decode_line, encode_line};
use futures::StreamExt as _;
use tokio::{
    io::AsyncWriteExt as _,
    net::{TcpListener, TcpStream},
    select,
};
use tokio_util::{
    codec::{FramedRead, LinesCodec, LinesCodecError},
    sync::CancellationToken,
};
use tracing::{debug, info, trace, warn};

use crate::{Result, Service};

/// Longest request line accepted, in bytes. A connection that sends more
/// without a newline is closed.
pub const MAX_LINE_LENGTH: usize = 64 * 1024;

/// Command server bound to a socket.
pub struct Server {
    /// Bound listener.
    listener: TcpListener,
    /// Request handler shared by every connection.
    service: Arc<dyn Service>,
}

impl Server {
    /// Bind to `host:port`. Port 0 picks a free port.
    pub async fn bind(host: &str, port: u16, service: Arc<dyn Service>) -> Result<Self> {
        let listener = TcpListener::bind((host, port)).await?;
        info!(addr = %listener.local_addr()?, "command listener bound");
        Ok(Self { listener, service })
    }

    /// Address actually bound.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections until `shutdown` is cancelled. Each connection is
    /// served on its own task.
    pub async fn run(self, shutdown: CancellationToken) -> Result<()> {
        loop {
            select! {
                _ = shutdown.cancelled() => {
                    debug!("command listener stopping");
                    return Ok(());
                }
                accepted = self.listener.accept() => {
                    let (stream, peer) = match accepted {
                        Ok(a) => a,
                        Err(e) => {
                            warn!(error = %e, "accept failed");
                            continue;
                        }
                    };
                    trace!(%peer, "connection accepted");
                    let service = self.service.clone();
                    tokio::spawn(async move {
                        if let Err(e) = serve(stream, service.as_ref()).await {
                            debug!(%peer, error = %e, "connection ended with error");
                        }
                    });
                }
            }
        }
    }
}

/// Answer newline-delimited requests until the peer hangs up or sends
/// something unparseable.
async fn serve(stream: TcpStream, service: &dyn Service) -> Result<()> {
    let (read, mut write) = stream.into_split();
    let mut lines = FramedRead::new(read, LinesCodec::new_with_max_length(MAX_LINE_LENGTH));
    while let Some(line) = lines.next().await {
        let line = match line {
            Ok(l) => l,
            Err(LinesCodecError::MaxLineLengthExceeded) => {
                warn!(limit = MAX_LINE_LENGTH, "command line too long, closing connection");
                return Ok(());
            }
            Err(LinesCodecError::Io(e)) => return Err(e.into()),
        };
        if line.trim().is_empty() {
            continue;
        }
        let msg = match decode_line(&line) {
            Ok(m) => m,
            Err(e) => {
                warn!(error = %e, "malformed command, closing connection");
                return Ok(());
            }
        };
        trace!(?msg, "command");
        if let Some(reply) = service.handle(msg) {
            write.write_all(encode_line(&reply)?.as_bytes()).await?;
            write.flush().await?;
        }
    }
    Ok(())
}
