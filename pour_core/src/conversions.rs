//! `From` implementations bridging `pour_config` types to `pour_core` types.

use crate::config::{DeviceTimeouts, Limits};

// ── Limits ───────────────────────────────────────────────────────────────────

impl From<&pour_config::Config> for Limits {
    fn from(c: &pour_config::Config) -> Self {
        Self {
            max_dispense_ml: c.dispense.max_ml,
            default_log_limit: c.logs.default_limit,
            max_log_limit: c.logs.max_limit,
        }
    }
}

// ── DeviceTimeouts ───────────────────────────────────────────────────────────

impl From<&pour_config::DeviceCfg> for DeviceTimeouts {
    fn from(c: &pour_config::DeviceCfg) -> Self {
        Self {
            status_ms: c.status_timeout_ms,
            dispense_ms: c.dispense_timeout_ms,
        }
    }
}
