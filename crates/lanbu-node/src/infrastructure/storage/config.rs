//! TOML-based configuration persistence for a LANBU node.
//!
//! Reads and writes `AppConfig` to the platform-appropriate config file:
//! - Windows:  `%APPDATA%\Lanbu\config.toml`
//! - Linux:    `~/.config/lanbu/config.toml`
//! - macOS:    `~/Library/Application Support/Lanbu/config.toml`
//!
//! Example:
//!
//! ```toml
//! [general]
//! log_level = "debug"
//!
//! [network]
//! discovery_port = 47777
//! broadcast_address = "192.168.1.255"
//!
//! [host]
//! game_version = "0.53"
//! advertised_port = 7777
//! broadcast_interval_ms = 1000
//!
//! [discovery]
//! host_ttl_ms = 3000
//! ```
//!
//! # Serde default values
//!
//! Fields annotated with `#[serde(default = "some_fn")]` use the return value
//! of `some_fn()` when the field is absent from the TOML file, so a partial
//! file (or none at all) still produces a complete configuration.
//!
//! Durations are stored as integer milliseconds; addresses as strings.  The
//! `hosting_config` / `discovery_config` methods convert them into the
//! validated `lanbu_core` types.

use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use lanbu_core::{
    domain::settings::{DEFAULT_BROADCAST_ADDR, DEFAULT_MAX_HOSTS},
    protocol::DEFAULT_DISCOVERY_PORT,
    DiscoveryConfig, HostingConfig,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// An address field does not hold an IP address.
    #[error("invalid IP address {value:?} in `{field}`")]
    InvalidAddress { field: &'static str, value: String },
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level configuration stored on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub host: HostSection,
    #[serde(default)]
    pub discovery: DiscoverySection,
    #[serde(default)]
    pub connect: ConnectSection,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeneralConfig {
    /// `tracing` log level used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Settings shared by both roles.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NetworkConfig {
    /// UDP port beacons travel over.
    #[serde(default = "default_discovery_port")]
    pub discovery_port: u16,
    /// Where hosts send beacons.  A subnet broadcast (e.g. `192.168.1.255`)
    /// works better than the limited broadcast on multi-homed machines.
    #[serde(default = "default_broadcast_address")]
    pub broadcast_address: String,
    /// Address the discovery listener binds.  `"0.0.0.0"` binds all interfaces.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HostSection {
    #[serde(default = "default_game_version")]
    pub game_version: String,
    #[serde(default = "default_advertised_port")]
    pub advertised_port: u16,
    #[serde(default = "default_broadcast_interval_ms")]
    pub broadcast_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiscoverySection {
    #[serde(default = "default_receive_timeout_ms")]
    pub receive_timeout_ms: u64,
    #[serde(default = "default_host_ttl_ms")]
    pub host_ttl_ms: u64,
    #[serde(default = "default_sweep_interval_ms")]
    pub sweep_interval_ms: u64,
    #[serde(default = "default_max_hosts")]
    pub max_hosts: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConnectSection {
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// When set, only hosts advertising exactly this version are joined.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_version: Option<String>,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_log_level() -> String {
    "info".to_string()
}
fn default_discovery_port() -> u16 {
    DEFAULT_DISCOVERY_PORT
}
fn default_broadcast_address() -> String {
    DEFAULT_BROADCAST_ADDR.to_string()
}
fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}
fn default_game_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
fn default_advertised_port() -> u16 {
    7777
}
fn default_broadcast_interval_ms() -> u64 {
    1000
}
fn default_receive_timeout_ms() -> u64 {
    500
}
fn default_host_ttl_ms() -> u64 {
    3000
}
fn default_sweep_interval_ms() -> u64 {
    1000
}
fn default_max_hosts() -> usize {
    DEFAULT_MAX_HOSTS
}
fn default_connect_timeout_ms() -> u64 {
    5000
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            discovery_port: default_discovery_port(),
            broadcast_address: default_broadcast_address(),
            bind_address: default_bind_address(),
        }
    }
}

impl Default for HostSection {
    fn default() -> Self {
        Self {
            game_version: default_game_version(),
            advertised_port: default_advertised_port(),
            broadcast_interval_ms: default_broadcast_interval_ms(),
        }
    }
}

impl Default for DiscoverySection {
    fn default() -> Self {
        Self {
            receive_timeout_ms: default_receive_timeout_ms(),
            host_ttl_ms: default_host_ttl_ms(),
            sweep_interval_ms: default_sweep_interval_ms(),
            max_hosts: default_max_hosts(),
        }
    }
}

impl Default for ConnectSection {
    fn default() -> Self {
        Self {
            connect_timeout_ms: default_connect_timeout_ms(),
            required_version: None,
        }
    }
}

// ── Conversion into runtime configs ───────────────────────────────────────────

impl AppConfig {
    /// Builds the Hosting parameters.  Validation happens when the role starts.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigFileError::InvalidAddress`] if `network.broadcast_address`
    /// is not an IP address.
    pub fn hosting_config(&self) -> Result<HostingConfig, ConfigFileError> {
        Ok(HostingConfig {
            broadcast_interval: Duration::from_millis(self.host.broadcast_interval_ms),
            discovery_port: self.network.discovery_port,
            broadcast_addr: parse_ip("network.broadcast_address", &self.network.broadcast_address)?,
            ..HostingConfig::new(self.host.game_version.clone(), self.host.advertised_port)
        })
    }

    /// Builds the Discovering parameters.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigFileError::InvalidAddress`] if `network.bind_address`
    /// is not an IP address.
    pub fn discovery_config(&self) -> Result<DiscoveryConfig, ConfigFileError> {
        Ok(DiscoveryConfig {
            discovery_port: self.network.discovery_port,
            bind_address: parse_ip("network.bind_address", &self.network.bind_address)?,
            receive_timeout: Duration::from_millis(self.discovery.receive_timeout_ms),
            host_ttl: Duration::from_millis(self.discovery.host_ttl_ms),
            sweep_interval: Duration::from_millis(self.discovery.sweep_interval_ms),
            max_hosts: self.discovery.max_hosts,
        })
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect.connect_timeout_ms)
    }
}

fn parse_ip(field: &'static str, value: &str) -> Result<IpAddr, ConfigFileError> {
    value.parse().map_err(|_| ConfigFileError::InvalidAddress {
        field,
        value: value.to_string(),
    })
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Determines the platform-appropriate directory for the config file.
///
/// # Errors
///
/// Returns [`ConfigFileError::NoPlatformConfigDir`] when the platform config
/// base directory cannot be determined from the environment.
pub fn config_dir() -> Result<PathBuf, ConfigFileError> {
    platform_config_dir().ok_or(ConfigFileError::NoPlatformConfigDir)
}

/// Resolves the full path to the default config file.
///
/// # Errors
///
/// Returns [`ConfigFileError::NoPlatformConfigDir`] if the base directory
/// cannot be determined.
pub fn config_file_path() -> Result<PathBuf, ConfigFileError> {
    Ok(config_dir()?.join("config.toml"))
}

/// Loads `AppConfig` from the platform config file, returning
/// `AppConfig::default()` if the file does not yet exist.
///
/// # Errors
///
/// See [`load_config_from`].
pub fn load_config() -> Result<AppConfig, ConfigFileError> {
    load_config_from(&config_file_path()?)
}

/// Loads `AppConfig` from `path`, returning defaults if the file is missing.
///
/// # Errors
///
/// Returns [`ConfigFileError::Io`] for file-system errors other than "not
/// found", and [`ConfigFileError::Parse`] if the TOML is malformed.
pub fn load_config_from(path: &Path) -> Result<AppConfig, ConfigFileError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AppConfig::default()),
        Err(source) => Err(ConfigFileError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Persists `config` to the platform config file.
///
/// # Errors
///
/// See [`save_config_to`].
pub fn save_config(config: &AppConfig) -> Result<(), ConfigFileError> {
    save_config_to(config, &config_file_path()?)
}

/// Persists `config` to `path`, creating parent directories as needed.
///
/// # Errors
///
/// Returns [`ConfigFileError::Io`] for file-system failures or
/// [`ConfigFileError::Serialize`] if serialization fails.
pub fn save_config_to(config: &AppConfig, path: &Path) -> Result<(), ConfigFileError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigFileError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigFileError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Resolves the platform config base directory including the `lanbu` subdirectory.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("Lanbu"))
    }

    #[cfg(target_os = "linux")]
    {
        // XDG_CONFIG_HOME or ~/.config
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("lanbu"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("Lanbu")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
