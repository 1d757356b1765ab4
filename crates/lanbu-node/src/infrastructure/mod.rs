//! Infrastructure layer: sockets, threads, the config file and the adapter
//! that turns runtime state into printable DTOs.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `lanbu_core`, but MUST NOT be imported by the `application` layer.

pub mod network;
pub mod storage;
pub mod ui_bridge;
