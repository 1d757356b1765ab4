//! HostRegistry: the client's view of which hosts are currently on the LAN.
//!
//! The registry is written by exactly one discovery listener thread and read
//! by any number of callers (a UI poll loop, the CLI, tests).  It is stored
//! behind an `RwLock` so readers never observe a half-applied upsert or sweep.
//!
//! # Freshness (for beginners)
//!
//! UDP beacons carry no "goodbye" message: a host that quits simply stops
//! broadcasting.  The registry therefore stamps every entry with the time its
//! last beacon arrived and treats entries older than the TTL as gone:
//!
//! - [`HostRegistry::snapshot`] hides expired entries immediately, so readers
//!   never see a stale host even between sweeps.
//! - [`HostRegistry::sweep`] physically removes them; the listener calls it
//!   periodically so memory does not grow with hosts that left long ago.
//!
//! Every time-dependent method has an `_at` variant taking an explicit
//! `Instant`, which is what the tests use to avoid sleeping.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::domain::host::{DiscoveredHost, HostKey};
use crate::protocol::BeaconMessage;

/// What an upsert did to the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// A new key was added.  `evicted` names the entry dropped to make room
    /// when the registry was at capacity.
    Inserted { evicted: Option<HostKey> },
    /// An existing key had its fields and `last_seen` overwritten.
    Refreshed,
}

/// Thread-safe, TTL-tracked store of discovered hosts.
#[derive(Debug)]
pub struct HostRegistry {
    ttl: Duration,
    max_hosts: usize,
    hosts: RwLock<HashMap<HostKey, DiscoveredHost>>,
}

impl HostRegistry {
    /// Creates an empty registry.
    ///
    /// `max_hosts` is clamped to at least 1.
    pub fn new(ttl: Duration, max_hosts: usize) -> Self {
        Self {
            ttl,
            max_hosts: max_hosts.max(1),
            hosts: RwLock::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn max_hosts(&self) -> usize {
        self.max_hosts
    }

    /// Records a beacon received now from `address`.
    pub fn upsert(&self, address: IpAddr, beacon: BeaconMessage) -> UpsertOutcome {
        self.upsert_at(address, beacon, Instant::now())
    }

    /// Records a beacon received at `now` from `address`.
    ///
    /// An existing entry with the same `(address, port)` key is overwritten.
    /// A new key arriving while the registry is full evicts the entry with
    /// the oldest `last_seen`.
    pub fn upsert_at(&self, address: IpAddr, beacon: BeaconMessage, now: Instant) -> UpsertOutcome {
        let host = DiscoveredHost::from_beacon(address, beacon, now);
        let key = host.key();
        let mut hosts = self.write();

        if let Some(existing) = hosts.get_mut(&key) {
            *existing = host;
            return UpsertOutcome::Refreshed;
        }

        let mut evicted = None;
        if hosts.len() >= self.max_hosts {
            evicted = hosts
                .values()
                .min_by_key(|h| h.last_seen)
                .map(DiscoveredHost::key);
            if let Some(old) = evicted {
                hosts.remove(&old);
                debug!(
                    "registry full ({} hosts); evicted {}:{}",
                    self.max_hosts, old.address, old.advertised_port
                );
            }
        }

        hosts.insert(key, host);
        UpsertOutcome::Inserted { evicted }
    }

    /// Removes entries whose last beacon is older than the TTL.
    ///
    /// Returns the number of entries removed.
    pub fn sweep(&self) -> usize {
        self.sweep_at(Instant::now())
    }

    pub fn sweep_at(&self, now: Instant) -> usize {
        let ttl = self.ttl;
        let mut hosts = self.write();
        let before = hosts.len();
        hosts.retain(|_, h| !h.is_expired_at(now, ttl));
        before - hosts.len()
    }

    /// Returns the hosts that are fresh right now, sorted by address and port.
    pub fn snapshot(&self) -> Vec<DiscoveredHost> {
        self.snapshot_at(Instant::now())
    }

    pub fn snapshot_at(&self, now: Instant) -> Vec<DiscoveredHost> {
        let mut fresh: Vec<DiscoveredHost> = self
            .read()
            .values()
            .filter(|h| !h.is_expired_at(now, self.ttl))
            .cloned()
            .collect();
        fresh.sort_by_key(DiscoveredHost::key);
        fresh
    }

    /// Looks up a single fresh entry.
    pub fn get(&self, key: &HostKey) -> Option<DiscoveredHost> {
        let now = Instant::now();
        self.read()
            .get(key)
            .filter(|h| !h.is_expired_at(now, self.ttl))
            .cloned()
    }

    /// Number of stored entries, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn clear(&self) {
        self.write().clear();
    }

    // A panic while holding the lock cannot leave the map half-updated
    // (every mutation is a single HashMap call), so poisoning is ignored.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<HostKey, DiscoveredHost>> {
        self.hosts.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<HostKey, DiscoveredHost>> {
        self.hosts.write().unwrap_or_else(PoisonError::into_inner)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    const TTL: Duration = Duration::from_secs(3);

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn test_upsert_inserts_new_host() {
        // Arrange
        let registry = HostRegistry::new(TTL, 8);
        let now = Instant::now();

        // Act
        let outcome = registry.upsert_at(ip("10.0.0.5"), BeaconMessage::new("0.53", 7777), now);

        // Assert
        assert_eq!(outcome, UpsertOutcome::Inserted { evicted: None });
        let hosts = registry.snapshot_at(now);
        assert_eq!(hosts.len(), 1);
        assert_eq!(hosts[0].address, ip("10.0.0.5"));
        assert_eq!(hosts[0].advertised_port, 7777);
        assert_eq!(hosts[0].game_version, "0.53");
        assert_eq!(hosts[0].last_seen, now);
    }

    #[test]
    fn test_upsert_same_key_refreshes_fields_and_last_seen() {
        // Arrange
        let registry = HostRegistry::new(TTL, 8);
        let t0 = Instant::now();
        let t1 = t0 + Duration::from_secs(1);
        registry.upsert_at(ip("10.0.0.5"), BeaconMessage::new("0.53", 7777), t0);

        // Act
        let outcome = registry.upsert_at(ip("10.0.0.5"), BeaconMessage::new("0.54", 7777), t1);

        // Assert
        assert_eq!(outcome, UpsertOutcome::Refreshed);
        let hosts = registry.snapshot_at(t1);
        assert_eq!(hosts.len(), 1);
        assert_eq!(hosts[0].game_version, "0.54");
        assert_eq!(hosts[0].last_seen, t1);
    }

    #[test]
    fn test_same_address_different_port_is_a_separate_host() {
        let registry = HostRegistry::new(TTL, 8);
        let now = Instant::now();
        registry.upsert_at(ip("10.0.0.5"), BeaconMessage::new("0.53", 7777), now);
        registry.upsert_at(ip("10.0.0.5"), BeaconMessage::new("0.53", 7778), now);
        assert_eq!(registry.snapshot_at(now).len(), 2);
    }

    #[test]
    fn test_snapshot_hides_expired_entries_before_sweep() {
        // Arrange
        let registry = HostRegistry::new(TTL, 8);
        let t0 = Instant::now();
        registry.upsert_at(ip("10.0.0.5"), BeaconMessage::new("0.53", 7777), t0);
        let later = t0 + TTL + Duration::from_millis(1);

        // Act
        let hosts = registry.snapshot_at(later);

        // Assert
        assert!(hosts.is_empty(), "expired host must not be visible");
        assert_eq!(registry.len(), 1, "entry is still stored until swept");
    }

    #[test]
    fn test_sweep_removes_only_expired_entries() {
        // Arrange
        let registry = HostRegistry::new(TTL, 8);
        let t0 = Instant::now();
        registry.upsert_at(ip("10.0.0.5"), BeaconMessage::new("0.53", 7777), t0);
        registry.upsert_at(
            ip("10.0.0.6"),
            BeaconMessage::new("0.53", 7777),
            t0 + Duration::from_secs(2),
        );
        let sweep_time = t0 + TTL + Duration::from_millis(500);

        // Act
        let removed = registry.sweep_at(sweep_time);

        // Assert
        assert_eq!(removed, 1);
        let hosts = registry.snapshot_at(sweep_time);
        assert_eq!(hosts.len(), 1);
        assert_eq!(hosts[0].address, ip("10.0.0.6"));
    }

    #[test]
    fn test_full_registry_evicts_stalest_entry_for_new_key() {
        // Arrange
        let registry = HostRegistry::new(TTL, 2);
        let t0 = Instant::now();
        registry.upsert_at(ip("10.0.0.1"), BeaconMessage::new("1", 1000), t0);
        registry.upsert_at(ip("10.0.0.2"), BeaconMessage::new("1", 1000), t0 + Duration::from_millis(10));

        // Act
        let outcome = registry.upsert_at(
            ip("10.0.0.3"),
            BeaconMessage::new("1", 1000),
            t0 + Duration::from_millis(20),
        );

        // Assert
        assert_eq!(
            outcome,
            UpsertOutcome::Inserted {
                evicted: Some(HostKey {
                    address: ip("10.0.0.1"),
                    advertised_port: 1000
                })
            }
        );
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_full_registry_refresh_does_not_evict() {
        let registry = HostRegistry::new(TTL, 1);
        let t0 = Instant::now();
        registry.upsert_at(ip("10.0.0.1"), BeaconMessage::new("1", 1000), t0);
        let outcome = registry.upsert_at(ip("10.0.0.1"), BeaconMessage::new("1", 1000), t0);
        assert_eq!(outcome, UpsertOutcome::Refreshed);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_snapshot_is_sorted_by_address_then_port() {
        let registry = HostRegistry::new(TTL, 8);
        let now = Instant::now();
        registry.upsert_at(ip("10.0.0.9"), BeaconMessage::new("1", 1), now);
        registry.upsert_at(ip("10.0.0.2"), BeaconMessage::new("1", 9), now);
        registry.upsert_at(ip("10.0.0.2"), BeaconMessage::new("1", 3), now);

        let keys: Vec<(IpAddr, u16)> = registry
            .snapshot_at(now)
            .iter()
            .map(|h| (h.address, h.advertised_port))
            .collect();

        assert_eq!(
            keys,
            vec![(ip("10.0.0.2"), 3), (ip("10.0.0.2"), 9), (ip("10.0.0.9"), 1)]
        );
    }

    #[test]
    fn test_get_returns_fresh_entry_by_key() {
        let registry = HostRegistry::new(TTL, 8);
        registry.upsert(ip("10.0.0.5"), BeaconMessage::new("0.53", 7777));
        let key = HostKey {
            address: ip("10.0.0.5"),
            advertised_port: 7777,
        };
        assert_eq!(registry.get(&key).map(|h| h.game_version), Some("0.53".to_string()));
    }

    #[test]
    fn test_clear_empties_registry() {
        let registry = HostRegistry::new(TTL, 8);
        registry.upsert(ip("10.0.0.5"), BeaconMessage::new("0.53", 7777));
        registry.clear();
        assert!(registry.is_empty());
        assert!(registry.snapshot().is_empty());
    }

    #[test]
    fn test_new_clamps_zero_capacity_to_one() {
        assert_eq!(HostRegistry::new(TTL, 0).max_hosts(), 1);
    }

    #[test]
    fn test_concurrent_readers_see_consistent_snapshots_during_writes() {
        // Arrange: one writer thread, several readers.
        let registry = Arc::new(HostRegistry::new(TTL, 256));
        let writer = {
            let registry = Arc::clone(&registry);
            std::thread::spawn(move || {
                for i in 0..200u16 {
                    registry.upsert(ip("10.0.0.5"), BeaconMessage::new(format!("v{i}"), 1 + i % 50));
                }
            })
        };

        // Act
        let readers: Vec<_> = (0..4)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    for _ in 0..200 {
                        for host in registry.snapshot() {
                            assert!(host.game_version.starts_with('v'));
                        }
                    }
                })
            })
            .collect();

        // Assert
        writer.join().expect("writer must not panic");
        for r in readers {
            r.join().expect("reader must not panic");
        }
        assert_eq!(registry.len(), 50);
    }
}
