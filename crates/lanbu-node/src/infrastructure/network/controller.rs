//! SessionRoleController: the node's Idle / Hosting / Discovering state
//! machine.
//!
//! The controller is the only component allowed to change the node's
//! [`SessionRole`].  Every active role is one background thread plus one UDP
//! socket; the controller binds the socket, hands it to the thread, and keeps
//! the thread's cancellation flag and join handle.
//!
//! ```text
//! start_hosting      validate → bind broadcast socket → spawn beacon   → Hosting
//! start_discovering  validate → bind discovery port   → spawn listener → Discovering
//! stop               clear flag → join thread (socket dropped) → clear hosts → Idle
//! ```
//!
//! `start_*` returns as soon as the socket is bound and the thread spawned.
//! `stop` returns only after the thread has exited, so the port can be bound
//! again immediately afterwards.  A start that fails at any step leaves the
//! node Idle with nothing open.
//!
//! The controller is an ordinary value: the composing application builds it,
//! shares it behind an `Arc`, and drops it when done (dropping stops the
//! active role).

use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex, MutexGuard, PoisonError, RwLock,
};
use std::thread::JoinHandle;

use lanbu_core::{
    ConfigError, DiscoveredHost, DiscoveryConfig, HostRegistry, HostingConfig, SessionRole,
};
use thiserror::Error;
use tracing::{error, info};

use super::beacon::spawn_beacon;
use super::listener::spawn_listener;
use super::socket::{bind_broadcast_socket, bind_discovery_socket};
use super::stats::{LoopStats, StatsSnapshot};

/// Error type for role start operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The supplied configuration was rejected before any socket was opened.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// A role is already active; it must be stopped first.
    #[error("cannot start: node is already {current}")]
    AlreadyActive { current: SessionRole },

    /// The UDP socket could not be bound or configured.
    #[error("socket setup failed on {addr}: {source}")]
    Socket {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// The background thread could not be started.
    #[error("failed to spawn discovery thread: {0}")]
    Spawn(#[source] std::io::Error),
}

/// The running loop of the current non-Idle role.
struct ActiveRole {
    role: SessionRole,
    running: Arc<AtomicBool>,
    handle: JoinHandle<()>,
    local_addr: SocketAddr,
    stats: Arc<LoopStats>,
}

/// Owns the node's role and the socket of the active loop.
#[derive(Default)]
pub struct SessionRoleController {
    active: Mutex<Option<ActiveRole>>,
    /// Registry of the current discovery session; readable without waiting
    /// on `active`, which `stop` holds while joining.
    hosts: RwLock<Option<Arc<HostRegistry>>>,
}

impl SessionRoleController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current role.
    ///
    /// Blocks while a `stop` is joining its loop thread.
    pub fn role(&self) -> SessionRole {
        self.lock_active()
            .as_ref()
            .map_or(SessionRole::Idle, |a| a.role)
    }

    /// Local address of the active socket; `None` when Idle.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.lock_active().as_ref().map(|a| a.local_addr)
    }

    /// Counters of the active loop; `None` when Idle.
    pub fn stats(&self) -> Option<StatsSnapshot> {
        self.lock_active().as_ref().map(|a| a.stats.snapshot())
    }

    /// Starts broadcasting beacons.
    ///
    /// # Errors
    ///
    /// - [`SessionError::AlreadyActive`] unless the node is Idle (role unchanged).
    /// - [`SessionError::Config`] for invalid parameters.
    /// - [`SessionError::Socket`] / [`SessionError::Spawn`] if setup fails;
    ///   the node stays Idle.
    pub fn start_hosting(&self, config: HostingConfig) -> Result<(), SessionError> {
        let mut active = self.lock_active();
        ensure_idle(&active)?;
        config.validate()?;

        let socket = bind_broadcast_socket(&config)?;
        let local_addr = local_addr_of(&socket, config.bind_port)?;
        let running = Arc::new(AtomicBool::new(true));
        let stats = Arc::new(LoopStats::new());

        let handle = spawn_beacon(socket, config, Arc::clone(&running), Arc::clone(&stats))
            .map_err(SessionError::Spawn)?;

        *active = Some(ActiveRole {
            role: SessionRole::Hosting,
            running,
            handle,
            local_addr,
            stats,
        });
        info!("role idle -> hosting (socket {local_addr})");
        Ok(())
    }

    /// Starts listening for beacons on the discovery port.
    ///
    /// A fresh, empty registry is created for every discovery session.
    ///
    /// # Errors
    ///
    /// Same as [`start_hosting`](Self::start_hosting).
    pub fn start_discovering(&self, config: DiscoveryConfig) -> Result<(), SessionError> {
        let mut active = self.lock_active();
        ensure_idle(&active)?;
        config.validate()?;

        let socket = bind_discovery_socket(&config)?;
        let local_addr = local_addr_of(&socket, config.discovery_port)?;
        let running = Arc::new(AtomicBool::new(true));
        let stats = Arc::new(LoopStats::new());
        let registry = Arc::new(HostRegistry::new(config.host_ttl, config.max_hosts));

        let handle = spawn_listener(
            socket,
            Arc::clone(&registry),
            config.sweep_interval,
            Arc::clone(&running),
            Arc::clone(&stats),
        )
        .map_err(SessionError::Spawn)?;

        *self.write_hosts() = Some(registry);
        *active = Some(ActiveRole {
            role: SessionRole::Discovering,
            running,
            handle,
            local_addr,
            stats,
        });
        info!("role idle -> discovering (socket {local_addr})");
        Ok(())
    }

    /// Stops the active role and returns to Idle.
    ///
    /// No-op when Idle.  Returns after the loop thread has exited and its
    /// socket is closed; this takes at most one receive timeout (listener) or
    /// one cancellation poll (beacon).
    pub fn stop(&self) {
        let mut active = self.lock_active();
        let Some(current) = active.take() else {
            return;
        };

        current.running.store(false, Ordering::Release);
        if current.handle.join().is_err() {
            error!("{} loop thread panicked", current.role);
        }

        if current.role == SessionRole::Discovering {
            if let Some(registry) = self.write_hosts().take() {
                registry.clear();
            }
        }
        info!("role {} -> idle", current.role);
    }

    /// Fresh hosts seen by the current discovery session.
    ///
    /// Empty when the node is not Discovering.
    pub fn discovered_hosts(&self) -> Vec<DiscoveredHost> {
        self.hosts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|registry| registry.snapshot())
            .unwrap_or_default()
    }

    fn lock_active(&self) -> MutexGuard<'_, Option<ActiveRole>> {
        // Every write to `active` is a single assignment, so a poisoned lock
        // still holds a consistent value.
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_hosts(&self) -> std::sync::RwLockWriteGuard<'_, Option<Arc<HostRegistry>>> {
        self.hosts.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for SessionRoleController {
    fn drop(&mut self) {
        self.stop();
    }
}

fn ensure_idle(active: &Option<ActiveRole>) -> Result<(), SessionError> {
    match active {
        Some(a) => Err(SessionError::AlreadyActive { current: a.role }),
        None => Ok(()),
    }
}

fn local_addr_of(socket: &std::net::UdpSocket, port: u16) -> Result<SocketAddr, SessionError> {
    socket.local_addr().map_err(|source| SessionError::Socket {
        addr: SocketAddr::from(([0, 0, 0, 0], port)),
        source,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
