//! SessionRole: the mutually exclusive operating mode of a node.
//!
//! ```text
//!            start_hosting               start_discovering
//!   Hosting ◄──────────────── Idle ────────────────► Discovering
//!      │                      ▲  ▲                        │
//!      └──────── stop ────────┘  └──────── stop ──────────┘
//! ```
//!
//! There is no direct edge between `Hosting` and `Discovering`; a node must
//! pass through `Idle`, which is where its socket is released.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionRole {
    /// No socket open, no background loop running.
    #[default]
    Idle,
    /// Broadcasting beacons.
    Hosting,
    /// Listening for beacons and maintaining the host registry.
    Discovering,
}

impl SessionRole {
    /// `true` when the state machine allows moving from `self` to `next`.
    pub fn can_transition_to(self, next: SessionRole) -> bool {
        use SessionRole::*;
        matches!(
            (self, next),
            (Idle, Hosting) | (Idle, Discovering) | (Hosting, Idle) | (Discovering, Idle)
        )
    }

    pub fn is_idle(self) -> bool {
        self == SessionRole::Idle
    }
}

impl fmt::Display for SessionRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionRole::Idle => "idle",
            SessionRole::Hosting => "hosting",
            SessionRole::Discovering => "discovering",
        };
        f.write_str(s)
    }
}
