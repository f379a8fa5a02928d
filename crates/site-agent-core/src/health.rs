//! The three-field health snapshot: inventory, controller connection, and
//! availability.
//!
//! This is pure data; the writer/reader discipline (single atomic swap, edge
//! driven updates) lives in `site-agent-health::HealthCache`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthState {
    Up,
    Down,
    Error,
    Unknown,
}

impl Default for HealthState {
    fn default() -> Self {
        HealthState::Unknown
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub state: HealthState,
    pub message: String,
}

impl ComponentHealth {
    pub fn new(state: HealthState, message: impl Into<String>) -> Self {
        Self {
            state,
            message: message.into(),
        }
    }

    pub fn unknown() -> Self {
        Self::default()
    }
}

/// Created `Unknown` at startup, updated by edge-driven writers, never
/// destroyed for the lifetime of the process.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthSnapshot {
    pub inventory_health: ComponentHealth,
    pub controller_connection_health: ComponentHealth,
    pub availability_health: ComponentHealth,
}

impl HealthSnapshot {
    pub fn all_unknown() -> Self {
        Self::default()
    }

    /// `true` only when nothing has reported `Down`/`Error`; used by the
    /// `/readyz` handler in the binary crate.
    pub fn is_ready(&self) -> bool {
        [
            &self.inventory_health,
            &self.controller_connection_health,
            &self.availability_health,
        ]
        .into_iter()
        .all(|c| matches!(c.state, HealthState::Up | HealthState::Unknown))
    }
}
