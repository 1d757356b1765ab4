//! Network infrastructure for a LANBU node.
//!
//! # Sub-modules
//!
//! - **`controller`** – `SessionRoleController`: owns the Idle / Hosting /
//!   Discovering state machine and the single UDP socket of the active role.
//!
//! - **`beacon`** – Host-role loop: broadcasts `LANBU_SERVER:<version>:<port>`
//!   once per interval until cancelled.
//!
//! - **`listener`** – Client-role loop: receives beacons, feeds the
//!   `HostRegistry` and sweeps expired hosts.
//!
//! - **`socket`** – Binding helpers shared by both roles.
//!
//! - **`stats`** – Lock-free counters the loops update and callers read.
//!
//! - **`transport`** – TCP implementation of the session transport used to
//!   reach a host once it has been chosen.

pub mod beacon;
pub mod controller;
pub mod listener;
pub mod socket;
pub mod stats;
pub mod transport;

pub use controller::{SessionError, SessionRoleController};
pub use stats::{LoopStats, StatsSnapshot};
