//! UDP socket setup for the two active roles.
//!
//! Both sockets are plain blocking `std::net::UdpSocket`s with OS-level
//! timeouts.  The timeout is what lets a loop notice cancellation: a blocked
//! `recv_from` returns `WouldBlock`/`TimedOut` at least once per timeout, the
//! loop checks its `running` flag and either continues or exits.

use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};

use lanbu_core::{DiscoveryConfig, HostingConfig};

use super::controller::SessionError;

/// Binds the socket a host broadcasts beacons from.
///
/// The socket binds the wildcard address of the same family as the
/// broadcast destination, on `config.bind_port` (0 = ephemeral).
///
/// # Errors
///
/// Returns [`SessionError::Socket`] if binding or enabling `SO_BROADCAST`
/// fails.
pub fn bind_broadcast_socket(config: &HostingConfig) -> Result<UdpSocket, SessionError> {
    let wildcard = match config.broadcast_addr {
        IpAddr::V4(_) => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        IpAddr::V6(_) => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
    };
    let addr = SocketAddr::new(wildcard, config.bind_port);
    let socket = UdpSocket::bind(addr).map_err(|source| SessionError::Socket { addr, source })?;

    if config.broadcast_addr.is_ipv4() {
        socket
            .set_broadcast(true)
            .map_err(|source| SessionError::Socket { addr, source })?;
    }
    // A send never blocks longer than one beacon interval.
    socket
        .set_write_timeout(Some(config.broadcast_interval))
        .map_err(|source| SessionError::Socket { addr, source })?;

    Ok(socket)
}

/// Binds the socket a client receives beacons on.
///
/// # Errors
///
/// Returns [`SessionError::Socket`] if the discovery port cannot be bound or
/// the read timeout cannot be set.
pub fn bind_discovery_socket(config: &DiscoveryConfig) -> Result<UdpSocket, SessionError> {
    let addr = config.bind_addr();
    let socket = UdpSocket::bind(addr).map_err(|source| SessionError::Socket { addr, source })?;
    socket
        .set_read_timeout(Some(config.receive_timeout))
        .map_err(|source| SessionError::Socket { addr, source })?;
    Ok(socket)
}

/// Returns `true` for OS timeout / would-block errors that should be retried.
pub fn is_timeout_error(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn free_udp_port() -> u16 {
        let probe = UdpSocket::bind("127.0.0.1:0").expect("probe bind");
        probe.local_addr().unwrap().port()
    }

    #[test]
    fn test_is_timeout_error_recognises_timed_out() {
        // Arrange
        let e = io::Error::new(io::ErrorKind::TimedOut, "timed out");

        // Act / Assert
        assert!(is_timeout_error(&e));
    }

    #[test]
    fn test_is_timeout_error_recognises_would_block() {
        let e = io::Error::new(io::ErrorKind::WouldBlock, "would block");
        assert!(is_timeout_error(&e));
    }

    #[test]
    fn test_is_timeout_error_returns_false_for_other_errors() {
        let e = io::Error::new(io::ErrorKind::ConnectionRefused, "refused");
        assert!(!is_timeout_error(&e));
    }

    #[test]
    fn test_bind_broadcast_socket_enables_broadcast() {
        // Arrange
        let cfg = HostingConfig::new("0.53", 7777);

        // Act
        let socket = bind_broadcast_socket(&cfg).expect("ephemeral bind");

        // Assert
        assert!(socket.broadcast().unwrap());
        assert_ne!(socket.local_addr().unwrap().port(), 0);
    }

    #[test]
    fn test_bind_discovery_socket_applies_receive_timeout() {
        // Arrange
        let cfg = DiscoveryConfig {
            discovery_port: free_udp_port(),
            bind_address: "127.0.0.1".parse().unwrap(),
            receive_timeout: Duration::from_millis(120),
            ..Default::default()
        };

        // Act
        let socket = bind_discovery_socket(&cfg).expect("bind");

        // Assert
        assert_eq!(socket.read_timeout().unwrap(), Some(Duration::from_millis(120)));
    }

    #[test]
    fn test_bind_discovery_socket_reports_port_in_use() {
        // Arrange: hold the port with another socket.
        let holder = UdpSocket::bind("127.0.0.1:0").expect("holder");
        let port = holder.local_addr().unwrap().port();
        let cfg = DiscoveryConfig {
            discovery_port: port,
            bind_address: "127.0.0.1".parse().unwrap(),
            ..Default::default()
        };

        // Act
        let result = bind_discovery_socket(&cfg);

        // Assert
        match result {
            Err(SessionError::Socket { addr, .. }) => assert_eq!(addr.port(), port),
            other => panic!("expected socket error, got {other:?}"),
        }
    }
}
