//! Start parameters for the two active roles, and their validation.
//!
//! Both config types are plain values handed to the session controller.  They
//! are validated before any socket is opened so that a bad interval or port
//! never leaves a half-started role behind.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use thiserror::Error;

use crate::protocol::{beacon::FIELD_SEPARATOR, BeaconMessage, DEFAULT_DISCOVERY_PORT};

pub const DEFAULT_BROADCAST_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_RECEIVE_TIMEOUT: Duration = Duration::from_millis(500);
/// Three beacon intervals: one lost datagram never makes a host flicker out.
pub const DEFAULT_HOST_TTL: Duration = Duration::from_secs(3);
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_MAX_HOSTS: usize = 64;
pub const DEFAULT_BROADCAST_ADDR: Ipv4Addr = Ipv4Addr::BROADCAST;
/// Longest accepted interval, timeout or TTL.
pub const MAX_DURATION: Duration = Duration::from_secs(3600);

/// Invalid start parameters.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{field} must be greater than zero")]
    ZeroDuration { field: &'static str },

    #[error("{field} must be in 1..=65535")]
    ZeroPort { field: &'static str },

    #[error("game version must not be empty")]
    EmptyVersion,

    #[error("game version {0:?} must not contain ':'")]
    VersionContainsSeparator(String),

    #[error("sweep interval {sweep:?} must not exceed host TTL {ttl:?}")]
    SweepLongerThanTtl { sweep: Duration, ttl: Duration },

    #[error("{field} of {value:?} exceeds the maximum of {max:?}")]
    DurationTooLarge {
        field: &'static str,
        value: Duration,
        max: Duration,
    },

    #[error("receive timeout {timeout:?} must not exceed sweep interval {sweep:?}")]
    ReceiveTimeoutLongerThanSweep { timeout: Duration, sweep: Duration },

    #[error("max_hosts must be at least 1")]
    ZeroCapacity,
}

/// Parameters for the Hosting role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostingConfig {
    /// Version string advertised in every beacon.
    pub game_version: String,
    /// Port the game session listens on; advertised, never bound here.
    pub advertised_port: u16,
    /// Time between two beacons.
    pub broadcast_interval: Duration,
    /// Port beacons are sent to.
    pub discovery_port: u16,
    /// Destination address; the limited broadcast address by default.
    pub broadcast_addr: IpAddr,
    /// Local port the sending socket binds; 0 lets the OS pick.
    pub bind_port: u16,
}

impl HostingConfig {
    pub fn new(game_version: impl Into<String>, advertised_port: u16) -> Self {
        Self {
            game_version: game_version.into(),
            advertised_port,
            broadcast_interval: DEFAULT_BROADCAST_INTERVAL,
            discovery_port: DEFAULT_DISCOVERY_PORT,
            broadcast_addr: IpAddr::V4(DEFAULT_BROADCAST_ADDR),
            bind_port: 0,
        }
    }

    /// Checks every field against the wire format and timing rules.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_version(&self.game_version)?;
        non_zero_port(self.advertised_port, "advertised_port")?;
        non_zero_port(self.discovery_port, "discovery_port")?;
        bounded_duration(self.broadcast_interval, "broadcast_interval")?;
        Ok(())
    }

    /// The beacon this configuration produces.
    pub fn beacon(&self) -> BeaconMessage {
        BeaconMessage::new(self.game_version.clone(), self.advertised_port)
    }

    pub fn broadcast_target(&self) -> SocketAddr {
        SocketAddr::new(self.broadcast_addr, self.discovery_port)
    }
}

/// Parameters for the Discovering role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryConfig {
    /// Port to listen for beacons on.
    pub discovery_port: u16,
    /// Local address to bind; all interfaces by default.
    pub bind_address: IpAddr,
    /// Upper bound on one blocking receive; also bounds `stop()` latency.
    pub receive_timeout: Duration,
    /// Age after which a host is considered gone.
    pub host_ttl: Duration,
    /// How often expired hosts are physically removed.
    pub sweep_interval: Duration,
    /// Registry capacity.
    pub max_hosts: usize,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            discovery_port: DEFAULT_DISCOVERY_PORT,
            bind_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            receive_timeout: DEFAULT_RECEIVE_TIMEOUT,
            host_ttl: DEFAULT_HOST_TTL,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            max_hosts: DEFAULT_MAX_HOSTS,
        }
    }
}

impl DiscoveryConfig {
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        non_zero_port(self.discovery_port, "discovery_port")?;
        bounded_duration(self.receive_timeout, "receive_timeout")?;
        bounded_duration(self.host_ttl, "host_ttl")?;
        bounded_duration(self.sweep_interval, "sweep_interval")?;
        if self.sweep_interval > self.host_ttl {
            return Err(ConfigError::SweepLongerThanTtl {
                sweep: self.sweep_interval,
                ttl: self.host_ttl,
            });
        }
        // The listener only sweeps between receives.
        if self.receive_timeout > self.sweep_interval {
            return Err(ConfigError::ReceiveTimeoutLongerThanSweep {
                timeout: self.receive_timeout,
                sweep: self.sweep_interval,
            });
        }
        if self.max_hosts == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.discovery_port)
    }
}

fn validate_version(version: &str) -> Result<(), ConfigError> {
    if version.is_empty() {
        return Err(ConfigError::EmptyVersion);
    }
    if version.contains(FIELD_SEPARATOR) {
        return Err(ConfigError::VersionContainsSeparator(version.to_string()));
    }
    Ok(())
}

fn non_zero_port(port: u16, field: &'static str) -> Result<(), ConfigError> {
    if port == 0 {
        return Err(ConfigError::ZeroPort { field });
    }
    Ok(())
}

fn bounded_duration(d: Duration, field: &'static str) -> Result<(), ConfigError> {
    if d.is_zero() {
        return Err(ConfigError::ZeroDuration { field });
    }
    if d > MAX_DURATION {
        return Err(ConfigError::DurationTooLarge {
            field,
            value: d,
            max: MAX_DURATION,
        });
    }
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
