//! Config resolution and backend assembly: device, event log, coordinator.

use std::path::Path;
use std::sync::Arc;

use eyre::WrapErr;
use pour_config::Config;
use pour_core::{Coordinator, MemoryEventLog};
use pour_device::{HttpDevice, SimulatedDevice};
use pour_store::SqliteEventLog;
use pour_traits::{Device, EventLog};

use crate::cli::{Cli, DEFAULT_CONFIG};

/// Load the config file (or defaults), apply command-line overrides, validate.
pub fn load_config(cli: &Cli) -> eyre::Result<Config> {
    let mut cfg = match &cli.config {
        Some(path) => pour_config::load_path(path)?,
        None => {
            let path = Path::new(DEFAULT_CONFIG);
            if path.exists() {
                pour_config::load_path(path)?
            } else {
                Config::default()
            }
        }
    };
    apply_overrides(&mut cfg, cli);
    cfg.validate()?;
    Ok(cfg)
}

fn apply_overrides(cfg: &mut Config, cli: &Cli) {
    if let Some(port) = cli.port {
        cfg.server.port = port;
    }
    if let Some(url) = &cli.device_url {
        cfg.device.url.clone_from(url);
    }
    if cli.simulate {
        cfg.device.simulate = true;
    }
    if let Some(url) = &cli.database {
        cfg.database.url.clone_from(url);
    }
}

/// Where dispense events end up for this run.
pub enum EventLogBackend {
    Sqlite(SqliteEventLog),
    Memory(Arc<MemoryEventLog>),
}

impl EventLogBackend {
    pub async fn open(cfg: &Config, memory: bool) -> eyre::Result<Self> {
        if memory {
            tracing::info!("event log kept in memory; events are lost on exit");
            return Ok(Self::Memory(Arc::new(MemoryEventLog::new())));
        }
        let url = &cfg.database.url;
        let log = SqliteEventLog::connect(url, cfg.database.max_connections)
            .await
            .wrap_err_with(|| format!("open event log at {url}"))?;
        log.init()
            .await
            .wrap_err_with(|| format!("initialize event log schema at {url}"))?;
        tracing::info!(url = %url, "event log ready");
        Ok(Self::Sqlite(log))
    }

    pub fn shared(&self) -> Arc<dyn EventLog> {
        match self {
            Self::Sqlite(log) => Arc::new(log.clone()),
            Self::Memory(log) => log.clone(),
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            Self::Sqlite(_) => "sqlite",
            Self::Memory(_) => "memory",
        }
    }

    pub async fn count(&self) -> eyre::Result<i64> {
        match self {
            Self::Sqlite(log) => Ok(log.count().await?),
            Self::Memory(log) => Ok(i64::try_from(log.len())?),
        }
    }

    pub async fn close(&self) {
        if let Self::Sqlite(log) = self {
            log.close().await;
        }
    }
}

pub fn make_device(cfg: &Config) -> eyre::Result<Arc<dyn Device>> {
    if cfg.device.simulate {
        tracing::info!(ms_per_ml = cfg.device.sim_ms_per_ml, "using simulated device");
        return Ok(Arc::new(SimulatedDevice::new(cfg.device.sim_ms_per_ml)));
    }
    let device = HttpDevice::new(&cfg.device.url)
        .wrap_err_with(|| format!("create HTTP client for {}", cfg.device.url))?;
    tracing::info!(url = %device.base_url(), "using HTTP device");
    Ok(Arc::new(device))
}

pub fn build_coordinator(
    cfg: &Config,
    device: Arc<dyn Device>,
    log: Arc<dyn EventLog>,
) -> eyre::Result<Coordinator> {
    Coordinator::builder()
        .with_shared_device(device)
        .with_shared_event_log(log)
        .with_limits(cfg.into())
        .with_timeouts((&cfg.device).into())
        .build()
}
