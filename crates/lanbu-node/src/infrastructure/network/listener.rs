//! Client-role loop: receive beacons and maintain the host registry.
//!
//! The listener binds the discovery port with a read timeout and runs on a
//! dedicated OS thread.  For every datagram it:
//!
//! 1. Decodes the payload as a beacon.  Anything that is not a well-formed
//!    `LANBU_SERVER:<version>:<port>` text is dropped and counted; bad input
//!    never ends the loop.
//! 2. Upserts the host keyed by `(source IP, advertised port)` with
//!    `last_seen = now`.
//!
//! Independently of traffic, it sweeps expired hosts out of the registry at
//! least once per sweep interval.
//!
//! # Read timeout
//!
//! `recv_from` blocks for at most the configured receive timeout before
//! returning a timeout error.  On each timeout the loop checks its `running`
//! flag; if the controller is stopping, it exits and the socket is dropped.

use std::net::{SocketAddr, UdpSocket};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use lanbu_core::{
    decode_datagram, protocol::MAX_BEACON_LEN, HostRegistry, UpsertOutcome,
};
use tracing::{debug, info, warn};

use super::socket::is_timeout_error;
use super::stats::LoopStats;

/// Pause after a non-timeout receive error so a persistent fault cannot spin
/// the thread.
const RECV_ERROR_PAUSE: Duration = Duration::from_millis(50);

/// Spawns the listener thread.
///
/// # Errors
///
/// Returns the OS error if the thread cannot be spawned.
pub fn spawn_listener(
    socket: UdpSocket,
    registry: Arc<HostRegistry>,
    sweep_interval: Duration,
    running: Arc<AtomicBool>,
    stats: Arc<LoopStats>,
) -> std::io::Result<JoinHandle<()>> {
    std::thread::Builder::new()
        .name("lanbu-listener".to_string())
        .spawn(move || listener_loop(socket, registry, sweep_interval, running, stats))
}

fn listener_loop(
    socket: UdpSocket,
    registry: Arc<HostRegistry>,
    sweep_interval: Duration,
    running: Arc<AtomicBool>,
    stats: Arc<LoopStats>,
) {
    match socket.local_addr() {
        Ok(addr) => info!("listener started on UDP {addr}"),
        Err(_) => info!("listener started"),
    }

    // One spare byte so an oversized datagram is visibly truncated and fails
    // to parse instead of being silently cut at a field boundary.
    let mut buf = vec![0u8; MAX_BEACON_LEN + 1];
    let mut last_sweep = Instant::now();

    while running.load(Ordering::Acquire) {
        match socket.recv_from(&mut buf) {
            Ok((len, src)) => {
                ingest_datagram(&registry, &stats, &buf[..len], src);
            }
            Err(e) if is_timeout_error(&e) => {}
            Err(e) => {
                stats.record_receive_error();
                warn!("discovery recv error: {e}");
                std::thread::sleep(RECV_ERROR_PAUSE);
            }
        }

        if last_sweep.elapsed() >= sweep_interval {
            let removed = registry.sweep();
            if removed > 0 {
                stats.record_evicted(removed);
                debug!("swept {removed} expired host(s)");
            }
            last_sweep = Instant::now();
        }
    }

    info!("listener stopped");
}

/// Decodes one datagram and records it in the registry.
///
/// Returns `None` when the datagram was dropped.
pub(crate) fn ingest_datagram(
    registry: &HostRegistry,
    stats: &LoopStats,
    datagram: &[u8],
    src: SocketAddr,
) -> Option<UpsertOutcome> {
    stats.record_datagram();

    let beacon = match decode_datagram(datagram) {
        Ok(beacon) => beacon,
        Err(e) => {
            stats.record_dropped();
            debug!("dropping datagram from {src}: {e}");
            return None;
        }
    };

    let (version, port) = (beacon.game_version.clone(), beacon.port);
    let outcome = registry.upsert(src.ip(), beacon);
    match outcome {
        UpsertOutcome::Inserted { evicted } => {
            info!("discovered host {}:{port} (version {version})", src.ip());
            if evicted.is_some() {
                stats.record_evicted(1);
            }
        }
        UpsertOutcome::Refreshed => {}
    }
    Some(outcome)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
