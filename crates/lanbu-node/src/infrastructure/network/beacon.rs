//! Host-role loop: periodic UDP broadcast of the presence beacon.
//!
//! The beacon runs on a dedicated OS thread that owns the broadcast socket.
//! Every tick it rebuilds the `LANBU_SERVER:<version>:<port>` message from the
//! hosting configuration and sends it to the broadcast address on the
//! discovery port.  The socket is closed when the thread returns.
//!
//! # Waiting between ticks
//!
//! The thread does not sleep for a whole interval at once.  It waits in
//! slices of [`CANCEL_POLL`] and re-checks the `running` flag after each one,
//! so `SessionRoleController::stop` never waits longer than one slice (plus
//! an in-flight send) for the thread to exit.
//!
//! # Send failures
//!
//! A failed send (no route, interface down, buffer full) is logged and
//! counted; the loop keeps going.  Consecutive failures double the delay
//! before the next attempt, up to [`MAX_BACKOFF_FACTOR`] intervals, and the
//! first success resets it.  Only the first failure of a streak is logged at
//! `warn` so an unplugged cable does not flood the log.

use std::net::UdpSocket;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use lanbu_core::{encode_beacon, HostingConfig};
use tracing::{debug, info, warn};

use super::stats::LoopStats;

/// Granularity at which a waiting beacon notices cancellation.
pub const CANCEL_POLL: Duration = Duration::from_millis(50);

/// Upper bound on the backoff multiplier applied after send failures.
pub const MAX_BACKOFF_FACTOR: u32 = 8;

/// Spawns the beacon thread.
///
/// The thread runs until `running` is cleared.
///
/// # Errors
///
/// Returns the OS error if the thread cannot be spawned; the socket is
/// dropped in that case.
pub fn spawn_beacon(
    socket: UdpSocket,
    config: HostingConfig,
    running: Arc<AtomicBool>,
    stats: Arc<LoopStats>,
) -> std::io::Result<JoinHandle<()>> {
    std::thread::Builder::new()
        .name("lanbu-beacon".to_string())
        .spawn(move || beacon_loop(socket, config, running, stats))
}

fn beacon_loop(
    socket: UdpSocket,
    config: HostingConfig,
    running: Arc<AtomicBool>,
    stats: Arc<LoopStats>,
) {
    let target = config.broadcast_target();
    info!(
        "beacon started: advertising {}:{} to {target} every {:?}",
        config.game_version, config.advertised_port, config.broadcast_interval
    );

    let mut failures: u32 = 0;
    while running.load(Ordering::Acquire) {
        // Built fresh each tick; the message is never cached.
        let bytes = encode_beacon(&config.beacon());
        match socket.send_to(&bytes, target) {
            Ok(_) => {
                if failures > 0 {
                    info!("beacon send recovered after {failures} failure(s)");
                }
                failures = 0;
                stats.record_beacon_sent();
            }
            Err(e) => {
                failures = failures.saturating_add(1);
                stats.record_send_failure();
                if failures == 1 {
                    warn!("beacon send to {target} failed: {e}");
                } else {
                    debug!("beacon send to {target} failed ({failures} in a row): {e}");
                }
            }
        }

        if !wait_or_cancel(&running, backoff_delay(config.broadcast_interval, failures)) {
            break;
        }
    }

    info!("beacon stopped");
}

/// Delay before the next send given the current failure streak.
///
/// `interval` while healthy, then 2×, 4×, 8× the interval, capped at
/// [`MAX_BACKOFF_FACTOR`].
pub fn backoff_delay(interval: Duration, consecutive_failures: u32) -> Duration {
    let factor = match consecutive_failures {
        0 | 1 => 1,
        n => 1u32
            .checked_shl(n - 1)
            .unwrap_or(MAX_BACKOFF_FACTOR)
            .min(MAX_BACKOFF_FACTOR),
    };
    interval.saturating_mul(factor)
}

/// Sleeps for `delay` in [`CANCEL_POLL`] slices.
///
/// Returns `false` as soon as `running` is cleared, `true` once the full
/// delay has elapsed.
///
/// A delay too large to represent as an `Instant` waits until cancelled.
fn wait_or_cancel(running: &AtomicBool, delay: Duration) -> bool {
    let deadline = Instant::now().checked_add(delay);
    loop {
        if !running.load(Ordering::Acquire) {
            return false;
        }
        let remaining = match deadline {
            Some(d) => d.saturating_duration_since(Instant::now()),
            None => CANCEL_POLL,
        };
        if remaining.is_zero() {
            return true;
        }
        std::thread::sleep(remaining.min(CANCEL_POLL));
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use lanbu_core::decode_datagram;

    fn loopback_receiver() -> UdpSocket {
        let rx = UdpSocket::bind("127.0.0.1:0").expect("receiver bind");
        rx.set_read_timeout(Some(Duration::from_secs(2))).unwrap();
        rx
    }

    fn loopback_config(rx: &UdpSocket, interval: Duration) -> HostingConfig {
        HostingConfig {
            broadcast_interval: interval,
            discovery_port: rx.local_addr().unwrap().port(),
            broadcast_addr: "127.0.0.1".parse().unwrap(),
            ..HostingConfig::new("0.53", 7777)
        }
    }

    #[test]
    fn test_backoff_delay_is_interval_without_failures() {
        let i = Duration::from_secs(1);
        assert_eq!(backoff_delay(i, 0), i);
        assert_eq!(backoff_delay(i, 1), i);
    }

    #[test]
    fn test_backoff_delay_doubles_and_caps() {
        let i = Duration::from_secs(1);
        assert_eq!(backoff_delay(i, 2), Duration::from_secs(2));
        assert_eq!(backoff_delay(i, 3), Duration::from_secs(4));
        assert_eq!(backoff_delay(i, 4), Duration::from_secs(8));
        assert_eq!(backoff_delay(i, 5), Duration::from_secs(8));
        assert_eq!(backoff_delay(i, u32::MAX), Duration::from_secs(8));
    }

    #[test]
    fn test_wait_or_cancel_returns_false_when_already_cancelled() {
        let running = AtomicBool::new(false);
        let started = Instant::now();
        assert!(!wait_or_cancel(&running, Duration::from_secs(10)));
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_wait_or_cancel_returns_true_after_delay() {
        let running = AtomicBool::new(true);
        assert!(wait_or_cancel(&running, Duration::from_millis(20)));
    }

    #[test]
    fn test_wait_or_cancel_with_unrepresentable_delay_waits_for_cancel() {
        // Arrange
        let running = Arc::new(AtomicBool::new(true));
        let canceller = {
            let running = Arc::clone(&running);
            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(100));
                running.store(false, Ordering::Release);
            })
        };

        // Act
        let completed = wait_or_cancel(&running, Duration::MAX);

        // Assert
        canceller.join().unwrap();
        assert!(!completed);
    }

    #[test]
    fn test_backoff_of_maximum_interval_does_not_panic_the_wait() {
        let running = AtomicBool::new(false);
        let delay = backoff_delay(Duration::MAX, 4);
        assert_eq!(delay, Duration::MAX);
        assert!(!wait_or_cancel(&running, delay));
    }

    #[test]
    fn test_beacon_sends_parseable_message_and_stops_on_cancel() {
        // Arrange
        let rx = loopback_receiver();
        let cfg = loopback_config(&rx, Duration::from_millis(50));
        let tx = UdpSocket::bind("127.0.0.1:0").expect("sender bind");
        let running = Arc::new(AtomicBool::new(true));
        let stats = Arc::new(LoopStats::new());

        // Act
        let handle = spawn_beacon(tx, cfg, Arc::clone(&running), Arc::clone(&stats)).expect("spawn");
        let mut buf = [0u8; 128];
        let (len, _) = rx.recv_from(&mut buf).expect("beacon must arrive");
        running.store(false, Ordering::Release);
        handle.join().expect("beacon thread must not panic");

        // Assert
        let msg = decode_datagram(&buf[..len]).expect("beacon must parse");
        assert_eq!(msg.game_version, "0.53");
        assert_eq!(msg.port, 7777);
        assert!(stats.snapshot().beacons_sent >= 1);
    }

    #[test]
    fn test_beacon_exits_promptly_with_long_interval() {
        // Arrange: a one-minute interval must not delay shutdown.
        let rx = loopback_receiver();
        let cfg = loopback_config(&rx, Duration::from_secs(60));
        let tx = UdpSocket::bind("127.0.0.1:0").expect("sender bind");
        let running = Arc::new(AtomicBool::new(true));
        let handle = spawn_beacon(tx, cfg, Arc::clone(&running), Arc::new(LoopStats::new()))
            .expect("spawn");
        let mut buf = [0u8; 128];
        rx.recv_from(&mut buf).expect("first beacon is sent immediately");

        // Act
        let started = Instant::now();
        running.store(false, Ordering::Release);
        handle.join().expect("join");

        // Assert
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
