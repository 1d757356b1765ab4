//! Domain types for LAN discovery.
//!
//! Everything in here is independent of sockets and threads: the host
//! registry can be driven entirely from tests by passing explicit instants.

pub mod host;
pub mod registry;
pub mod role;
pub mod settings;
