//! Front-end bridge: exposes controller operations as JSON-friendly commands.
//!
//! A game front-end (an engine plugin, a launcher, or the `lanbu` CLI in
//! `--json` mode) drives the node through these functions instead of calling
//! the controller directly.  Each one delegates to the shared
//! [`SessionRoleController`] and returns a [`CommandResult`].
//!
//! # Data Transfer Objects (DTOs)
//!
//! Internal types such as `DiscoveredHost` hold values that do not serialise
//! meaningfully (`Instant` has no wall-clock meaning outside the process).
//! DTOs are plain structs that:
//!
//! - contain only JSON-serialisable fields (`String`, `u16`, `u64`, ...),
//! - convert `last_seen` into an age in milliseconds at the time of the call,
//! - use `#[derive(Serialize)]` so any front-end can consume them.
//!
//! # `CommandResult<T>` wrapper
//!
//! Every command responds with the same shape:
//! `{ success: bool, data: T | null, error: string | null }`, so the caller
//! can always check `success` first.

use std::time::Instant;

use lanbu_core::{DiscoveredHost, SessionRole};
use serde::Serialize;

use crate::infrastructure::{
    network::{SessionRoleController, StatsSnapshot},
    storage::config::AppConfig,
};

// ── DTO types ─────────────────────────────────────────────────────────────────

/// One discovered host as shown in a server browser.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct HostDto {
    pub address: String,
    pub advertised_port: u16,
    pub game_version: String,
    /// Milliseconds since the last beacon from this host.
    pub age_ms: u64,
}

impl HostDto {
    pub fn at(host: &DiscoveredHost, now: Instant) -> Self {
        Self {
            address: host.address.to_string(),
            advertised_port: host.advertised_port,
            game_version: host.game_version.clone(),
            age_ms: u64::try_from(host.age_at(now).as_millis()).unwrap_or(u64::MAX),
        }
    }
}

impl From<&DiscoveredHost> for HostDto {
    fn from(host: &DiscoveredHost) -> Self {
        Self::at(host, Instant::now())
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct NodeStatusDto {
    pub role: SessionRole,
    pub local_addr: Option<String>,
    pub stats: Option<StatsSnapshot>,
    pub hosts: Vec<HostDto>,
}

/// Uniform response wrapper for all bridge commands.
#[derive(Debug, Serialize)]
pub struct CommandResult<T: Serialize> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> CommandResult<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}

// ── Commands ──────────────────────────────────────────────────────────────────

/// Current role, socket, counters and visible hosts.
pub fn get_status(controller: &SessionRoleController) -> CommandResult<NodeStatusDto> {
    let now = Instant::now();
    CommandResult::ok(NodeStatusDto {
        role: controller.role(),
        local_addr: controller.local_addr().map(|a| a.to_string()),
        stats: controller.stats(),
        hosts: controller
            .discovered_hosts()
            .iter()
            .map(|h| HostDto::at(h, now))
            .collect(),
    })
}

/// Hosts currently visible to the discovery session.
pub fn get_hosts(controller: &SessionRoleController) -> CommandResult<Vec<HostDto>> {
    let now = Instant::now();
    let dtos = controller
        .discovered_hosts()
        .iter()
        .map(|h| HostDto::at(h, now))
        .collect();
    CommandResult::ok(dtos)
}

/// Starts Hosting with the `[host]` and `[network]` settings of `config`.
pub fn start_hosting(controller: &SessionRoleController, config: &AppConfig) -> CommandResult<()> {
    let hosting = match config.hosting_config() {
        Ok(h) => h,
        Err(e) => return CommandResult::err(e.to_string()),
    };
    match controller.start_hosting(hosting) {
        Ok(()) => CommandResult::ok(()),
        Err(e) => CommandResult::err(e.to_string()),
    }
}

/// Starts Discovering with the `[discovery]` and `[network]` settings of `config`.
pub fn start_discovering(
    controller: &SessionRoleController,
    config: &AppConfig,
) -> CommandResult<()> {
    let discovery = match config.discovery_config() {
        Ok(d) => d,
        Err(e) => return CommandResult::err(e.to_string()),
    };
    match controller.start_discovering(discovery) {
        Ok(()) => CommandResult::ok(()),
        Err(e) => CommandResult::err(e.to_string()),
    }
}

/// Returns the node to Idle.  Blocks until the loop thread has exited.
pub fn stop(controller: &SessionRoleController) -> CommandResult<()> {
    controller.stop();
    CommandResult::ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use lanbu_core::BeaconMessage;
    use std::time::Duration;

    fn loopback_config() -> AppConfig {
        let port = std::net::UdpSocket::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let mut cfg = AppConfig::default();
        cfg.network.discovery_port = port;
        cfg.network.bind_address = "127.0.0.1".to_string();
        cfg.network.broadcast_address = "127.0.0.1".to_string();
        cfg.discovery.receive_timeout_ms = 50;
        cfg
    }

    #[test]
    fn test_host_dto_reports_age_in_millis() {
        // Arrange
        let seen = Instant::now();
        let host = DiscoveredHost::from_beacon(
            "192.168.1.20".parse().unwrap(),
            BeaconMessage::new("0.53", 7777),
            seen,
        );

        // Act
        let dto = HostDto::at(&host, seen + Duration::from_millis(1500));

        // Assert
        assert_eq!(dto.address, "192.168.1.20");
        assert_eq!(dto.advertised_port, 7777);
        assert_eq!(dto.game_version, "0.53");
        assert_eq!(dto.age_ms, 1500);
    }

    #[test]
    fn test_status_of_idle_node_serializes_to_expected_json() {
        let ctrl = SessionRoleController::new();

        let result = get_status(&ctrl);
        let json = serde_json::to_value(&result).expect("serialize");

        assert_eq!(json["success"], true);
        assert_eq!(json["data"]["role"], "idle");
        assert!(json["data"]["local_addr"].is_null());
        assert_eq!(json["data"]["hosts"], serde_json::json!([]));
    }

    #[test]
    fn test_command_result_err_has_no_data() {
        let r: CommandResult<u32> = CommandResult::err("boom");
        assert!(!r.success);
        assert!(r.data.is_none());
        assert_eq!(r.error.as_deref(), Some("boom"));
    }

    #[test]
    fn test_start_discovering_then_status_reports_role_and_socket() {
        // Arrange
        let ctrl = SessionRoleController::new();
        let cfg = loopback_config();

        // Act
        let started = start_discovering(&ctrl, &cfg);
        let status = get_status(&ctrl).data.expect("status");

        // Assert
        assert!(started.success);
        assert_eq!(status.role, SessionRole::Discovering);
        assert!(status.local_addr.is_some());
        assert!(status.stats.is_some());
        assert!(stop(&ctrl).success);
    }

    #[test]
    fn test_second_start_is_reported_as_error() {
        let ctrl = SessionRoleController::new();
        let cfg = loopback_config();
        assert!(start_hosting(&ctrl, &cfg).success);

        let again = start_discovering(&ctrl, &cfg);

        assert!(!again.success);
        assert!(again.error.unwrap().contains("already hosting"));
        stop(&ctrl);
    }

    #[test]
    fn test_invalid_address_in_config_is_reported_without_starting() {
        let ctrl = SessionRoleController::new();
        let mut cfg = loopback_config();
        cfg.network.bind_address = "nowhere".to_string();

        let result = start_discovering(&ctrl, &cfg);

        assert!(!result.success);
        assert_eq!(ctrl.role(), SessionRole::Idle);
        assert!(get_hosts(&ctrl).data.unwrap().is_empty());
    }
}
