//! Application layer use cases for a LANBU node.
//!
//! Use cases here depend on abstractions (traits) rather than sockets, so the
//! infrastructure can be swapped without touching this code.
//!
//! # Sub-modules
//!
//! - **`connect`** – Turns a chosen `DiscoveredHost` into an established game
//!   session through a pluggable `SessionTransport`.

pub mod connect;
