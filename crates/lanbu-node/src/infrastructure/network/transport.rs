//! TCP session transport: the default way to reach a chosen host.
//!
//! Opens a TCP connection to the host's advertised game port, bounded by a
//! connect timeout.  The game's own handshake runs on the returned stream
//! and is not part of discovery.

use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpStream;
use tracing::debug;

use crate::application::connect::SessionTransport;

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct TcpSessionTransport {
    connect_timeout: Duration,
}

impl TcpSessionTransport {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }
}

impl Default for TcpSessionTransport {
    fn default() -> Self {
        Self::new(DEFAULT_CONNECT_TIMEOUT)
    }
}

#[async_trait]
impl SessionTransport for TcpSessionTransport {
    type Session = TcpStream;

    async fn open(&self, addr: SocketAddr) -> Result<TcpStream, String> {
        match tokio::time::timeout(self.connect_timeout, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => {
                if let Err(e) = stream.set_nodelay(true) {
                    debug!("could not set TCP_NODELAY on {addr}: {e}");
                }
                Ok(stream)
            }
            Ok(Err(e)) => Err(e.to_string()),
            Err(_) => Err(format!("timed out after {:?}", self.connect_timeout)),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
