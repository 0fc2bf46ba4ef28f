#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema for the pour relay.
//!
//! - `Config` and its sections are deserialized from TOML and validated.
//! - Every section is optional; an empty document yields a usable config.
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Largest pour any config may allow, regardless of device.
pub const HARD_MAX_ML: u32 = 1000;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Server {
    pub host: String,
    pub port: u16,
    /// Directory with the built frontend; unmatched routes are served from it.
    pub static_dir: Option<PathBuf>,
    /// Allow cross-origin requests (dev frontend on another port).
    pub cors: bool,
}

impl Default for Server {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            static_dir: None,
            cors: false,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DeviceCfg {
    /// Base URL of the dispenser, e.g. `http://esp32.local`
    pub url: String,
    /// Timeout for `GET /status` (ms)
    pub status_timeout_ms: u64,
    /// Timeout for `POST /dispense` (ms); longer since it starts the pump
    pub dispense_timeout_ms: u64,
    /// Use the in-process simulated device instead of HTTP
    pub simulate: bool,
    /// Simulated pour speed: how long the sim stays busy per ml
    pub sim_ms_per_ml: u64,
}

impl Default for DeviceCfg {
    fn default() -> Self {
        Self {
            url: "http://esp32.local".to_string(),
            status_timeout_ms: 1000,
            dispense_timeout_ms: 2000,
            simulate: false,
            sim_ms_per_ml: 50,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DispenseCfg {
    /// Upper bound (inclusive) on a single pour
    pub max_ml: u32,
    /// Token recorded when a request carries none
    pub anonymous_token: String,
}

impl Default for DispenseCfg {
    fn default() -> Self {
        Self {
            max_ml: 60,
            anonymous_token: "anonymous".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Database {
    /// sqlx connection URL, e.g. `sqlite://dispenser.db`
    pub url: String,
    pub max_connections: u32,
}

impl Default for Database {
    fn default() -> Self {
        Self {
            url: "sqlite://dispenser.db".to_string(),
            max_connections: 4,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LogsCfg {
    /// Rows returned by `/api/logs` when no limit is given
    pub default_limit: u32,
    /// Hard cap on rows per `/api/logs` call
    pub max_limit: u32,
}

impl Default for LogsCfg {
    fn default() -> Self {
        Self {
            default_limit: 20,
            max_limit: 500,
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Config {
    pub server: Server,
    pub device: DeviceCfg,
    pub dispense: DispenseCfg,
    pub database: Database,
    pub logs: LogsCfg,
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Read and parse a config file. Validation is left to the caller.
pub fn load_path(path: &Path) -> eyre::Result<Config> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("read config {:?}: {}", path, e))?;
    load_toml(&text).map_err(|e| eyre::eyre!("invalid configuration in {:?}: {}", path, e))
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Server
        if self.server.host.trim().is_empty() {
            eyre::bail!("server.host must not be empty");
        }

        // Device
        if !(self.device.url.starts_with("http://") || self.device.url.starts_with("https://")) {
            eyre::bail!("device.url must start with http:// or https://");
        }
        if self.device.status_timeout_ms == 0 {
            eyre::bail!("device.status_timeout_ms must be >= 1");
        }
        if self.device.dispense_timeout_ms == 0 {
            eyre::bail!("device.dispense_timeout_ms must be >= 1");
        }
        if self.device.status_timeout_ms > 60_000 || self.device.dispense_timeout_ms > 60_000 {
            eyre::bail!("device timeouts are unreasonably large (>60s)");
        }
        if self.device.sim_ms_per_ml > 10_000 {
            eyre::bail!("device.sim_ms_per_ml is unreasonably large (>10s per ml)");
        }

        // Dispense
        if self.dispense.max_ml == 0 {
            eyre::bail!("dispense.max_ml must be >= 1");
        }
        if self.dispense.max_ml > HARD_MAX_ML {
            eyre::bail!("dispense.max_ml must be <= {HARD_MAX_ML}");
        }
        if self.dispense.anonymous_token.is_empty() {
            eyre::bail!("dispense.anonymous_token must not be empty");
        }

        // Database
        if !self.database.url.starts_with("sqlite:") {
            eyre::bail!("database.url must be a sqlite: URL");
        }
        if self.database.max_connections == 0 {
            eyre::bail!("database.max_connections must be >= 1");
        }

        // Logs
        if self.logs.max_limit == 0 {
            eyre::bail!("logs.max_limit must be >= 1");
        }
        if self.logs.default_limit > self.logs.max_limit {
            eyre::bail!("logs.default_limit must be <= logs.max_limit");
        }

        // Logging
        if let Some(rot) = self.logging.rotation.as_deref()
            && !matches!(rot, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never, daily, hourly");
        }

        Ok(())
    }
}
