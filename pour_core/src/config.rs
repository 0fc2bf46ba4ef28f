//! Runtime configuration for the `Coordinator`.
//!
//! Separate from the TOML-deserialized config in `pour_config`; see
//! `conversions` for the mapping.

use std::time::Duration;

/// Request limits enforced by the coordinator.
#[derive(Debug, Clone)]
pub struct Limits {
    /// Largest accepted pour, inclusive.
    pub max_dispense_ml: u32,
    /// Events returned by `recent_events(None)`.
    pub default_log_limit: u32,
    /// Cap applied to any requested log limit.
    pub max_log_limit: u32,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_dispense_ml: 60,
            default_log_limit: 20,
            max_log_limit: 500,
        }
    }
}

/// Per-call device timeouts.
#[derive(Debug, Clone)]
pub struct DeviceTimeouts {
    pub status_ms: u64,
    /// Longer than `status_ms`: the device starts the pump before answering.
    pub dispense_ms: u64,
}

impl DeviceTimeouts {
    #[inline]
    pub fn status(&self) -> Duration {
        Duration::from_millis(self.status_ms)
    }

    #[inline]
    pub fn dispense(&self) -> Duration {
        Duration::from_millis(self.dispense_ms)
    }
}

impl Default for DeviceTimeouts {
    fn default() -> Self {
        Self {
            status_ms: 1000,
            dispense_ms: 2000,
        }
    }
}
