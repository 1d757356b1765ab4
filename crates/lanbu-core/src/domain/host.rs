//! A host seen on the LAN and the key that identifies it.

use std::net::{IpAddr, SocketAddr};
use std::time::{Duration, Instant};

use crate::protocol::BeaconMessage;

/// Registry identity of a host: where the beacon came from plus the game
/// port it advertised.
///
/// Two sessions hosted on the same machine on different ports are distinct
/// hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HostKey {
    pub address: IpAddr,
    pub advertised_port: u16,
}

/// A host discovered through its beacon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredHost {
    /// Source IP of the beacon datagram.
    pub address: IpAddr,
    /// Game session port taken from the beacon payload.
    pub advertised_port: u16,
    /// Game version taken from the beacon payload.
    pub game_version: String,
    /// When the most recent beacon from this host was received.
    pub last_seen: Instant,
}

impl DiscoveredHost {
    /// Builds a host entry from a decoded beacon.
    pub fn from_beacon(address: IpAddr, beacon: BeaconMessage, seen_at: Instant) -> Self {
        Self {
            address,
            advertised_port: beacon.port,
            game_version: beacon.game_version,
            last_seen: seen_at,
        }
    }

    pub fn key(&self) -> HostKey {
        HostKey {
            address: self.address,
            advertised_port: self.advertised_port,
        }
    }

    /// Address of the game session this host advertises.
    pub fn session_addr(&self) -> SocketAddr {
        SocketAddr::new(self.address, self.advertised_port)
    }

    /// Time elapsed between the last beacon and `now`; zero if `now` is earlier.
    pub fn age_at(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_seen)
    }

    /// `true` once the entry is strictly older than `ttl`.
    pub fn is_expired_at(&self, now: Instant, ttl: Duration) -> bool {
        self.age_at(now) > ttl
    }
}
