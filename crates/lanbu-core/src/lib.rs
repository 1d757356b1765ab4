//! # lanbu-core
//!
//! Shared foundation for LANBU LAN discovery: the beacon wire format, the
//! host registry, the session role model and the validated start
//! parameters.
//!
//! This crate opens no sockets and spawns no threads.  The runtime that does
//! (`lanbu-node`) and any engine- or platform-specific adapter build on top of
//! it, so every layer speaks exactly the same protocol.
//!
//! - **`protocol`** – the `LANBU_SERVER:<version>:<port>` beacon and its codec.
//! - **`domain`** – `DiscoveredHost`, `HostRegistry`, `SessionRole`,
//!   `HostingConfig` / `DiscoveryConfig`.

pub mod domain;
pub mod protocol;

pub use domain::host::{DiscoveredHost, HostKey};
pub use domain::registry::{HostRegistry, UpsertOutcome};
pub use domain::role::SessionRole;
pub use domain::settings::{ConfigError, DiscoveryConfig, HostingConfig};
pub use protocol::{decode_beacon, decode_datagram, encode_beacon, BeaconMessage, ParseError};
