//! ConnectionInitiator: hands a chosen host over to the game session
//! transport.
//!
//! Discovery ends where the game begins.  Once the user picks a
//! [`DiscoveredHost`], this use case opens the session at the host's
//! advertised address through a [`SessionTransport`] and wraps the result in
//! a [`SessionHandle`].
//!
//! # Architecture
//!
//! The use case depends only on the `SessionTransport` trait.  The TCP
//! implementation lives in `infrastructure::network::transport`; a game can
//! plug in its own handshake instead.
//!
//! The initiator never touches the role controller or the host registry: a
//! failed connect leaves the registry entry in place (it expires through the
//! TTL if the host is really gone), and whether to stop discovering before or
//! after connecting is the caller's decision.

use std::net::SocketAddr;

use async_trait::async_trait;
use lanbu_core::DiscoveredHost;
#[cfg(test)]
use mockall::automock;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

/// Error type for the connect use case.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConnectError {
    /// The transport could not establish the session.
    #[error("failed to connect to {addr}: {reason}")]
    ConnectFailed { addr: SocketAddr, reason: String },

    /// The host advertises a game version this build will not join.
    #[error("host {addr} runs version {advertised:?}, this build requires {required:?}")]
    VersionMismatch {
        addr: SocketAddr,
        advertised: String,
        required: String,
    },
}

/// Opens a game session with a remote host.
///
/// Infrastructure implementations speak a real protocol; test
/// implementations return canned results.
#[cfg_attr(test, automock(type Session = u32;))]
#[async_trait]
pub trait SessionTransport: Send + Sync {
    /// Whatever the transport hands back for an established session.
    type Session: Send;

    /// Connects to `addr` and completes the transport's handshake.
    async fn open(&self, addr: SocketAddr) -> Result<Self::Session, String>;
}

/// An established session with a discovered host.
#[derive(Debug)]
pub struct SessionHandle<S> {
    /// Locally generated id, used to correlate log lines.
    pub session_id: Uuid,
    pub peer: SocketAddr,
    /// Version the host advertised when it was chosen.
    pub game_version: String,
    pub session: S,
}

pub struct ConnectionInitiator<T> {
    transport: T,
    required_version: Option<String>,
}

impl<T: SessionTransport> ConnectionInitiator<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            required_version: None,
        }
    }

    /// Refuse hosts whose advertised version differs from `version`.
    pub fn with_required_version(mut self, version: impl Into<String>) -> Self {
        self.required_version = Some(version.into());
        self
    }

    /// Opens a session with `host` at its advertised address.
    ///
    /// # Errors
    ///
    /// - [`ConnectError::VersionMismatch`] if a required version is set and
    ///   the host advertises another one; the transport is not contacted.
    /// - [`ConnectError::ConnectFailed`] if the transport fails.
    pub async fn connect(&self, host: &DiscoveredHost) -> Result<SessionHandle<T::Session>, ConnectError> {
        let addr = host.session_addr();

        if let Some(required) = &self.required_version {
            if *required != host.game_version {
                return Err(ConnectError::VersionMismatch {
                    addr,
                    advertised: host.game_version.clone(),
                    required: required.clone(),
                });
            }
        }

        info!("connecting to {addr} (version {})", host.game_version);
        match self.transport.open(addr).await {
            Ok(session) => {
                let session_id = Uuid::new_v4();
                info!("session {session_id} established with {addr}");
                Ok(SessionHandle {
                    session_id,
                    peer: addr,
                    game_version: host.game_version.clone(),
                    session,
                })
            }
            Err(reason) => {
                warn!("connect to {addr} failed: {reason}");
                Err(ConnectError::ConnectFailed { addr, reason })
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
