//! Counters shared between a discovery loop and its observers.
//!
//! The loop thread increments; any thread may read a [`StatsSnapshot`].  Each
//! counter is independent, so `Ordering::Relaxed` is enough.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

#[derive(Debug, Default)]
pub struct LoopStats {
    beacons_sent: AtomicU64,
    send_failures: AtomicU64,
    datagrams_received: AtomicU64,
    datagrams_dropped: AtomicU64,
    receive_errors: AtomicU64,
    hosts_evicted: AtomicU64,
}

/// Point-in-time copy of [`LoopStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub beacons_sent: u64,
    pub send_failures: u64,
    pub datagrams_received: u64,
    /// Datagrams that failed to parse as a beacon.
    pub datagrams_dropped: u64,
    pub receive_errors: u64,
    /// Hosts removed by TTL sweeps or capacity eviction.
    pub hosts_evicted: u64,
}

impl LoopStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            beacons_sent: self.beacons_sent.load(Ordering::Relaxed),
            send_failures: self.send_failures.load(Ordering::Relaxed),
            datagrams_received: self.datagrams_received.load(Ordering::Relaxed),
            datagrams_dropped: self.datagrams_dropped.load(Ordering::Relaxed),
            receive_errors: self.receive_errors.load(Ordering::Relaxed),
            hosts_evicted: self.hosts_evicted.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn record_beacon_sent(&self) {
        self.beacons_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_send_failure(&self) {
        self.send_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_datagram(&self) {
        self.datagrams_received.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dropped(&self) {
        self.datagrams_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_receive_error(&self) {
        self.receive_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_evicted(&self, count: usize) {
        self.hosts_evicted.fetch_add(count as u64, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_stats_are_zero() {
        assert_eq!(LoopStats::new().snapshot(), StatsSnapshot::default());
    }

    #[test]
    fn test_record_methods_increment_matching_counter() {
        // Arrange
        let stats = LoopStats::new();

        // Act
        stats.record_beacon_sent();
        stats.record_beacon_sent();
        stats.record_send_failure();
        stats.record_datagram();
        stats.record_dropped();
        stats.record_receive_error();
        stats.record_evicted(3);

        // Assert
        let snap = stats.snapshot();
        assert_eq!(snap.beacons_sent, 2);
        assert_eq!(snap.send_failures, 1);
        assert_eq!(snap.datagrams_received, 1);
        assert_eq!(snap.datagrams_dropped, 1);
        assert_eq!(snap.receive_errors, 1);
        assert_eq!(snap.hosts_evicted, 3);
    }
}
