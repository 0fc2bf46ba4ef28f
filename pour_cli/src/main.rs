#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

mod app;
mod cli;
mod error_fmt;
mod routes;

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use eyre::WrapErr;
use pour_config::Config;
use pour_core::{Coordinator, DispenseOutcome};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

use crate::app::EventLogBackend;
use crate::cli::{Cli, Commands, FILE_GUARD, JSON_MODE};
use crate::error_fmt::Stage;
use crate::routes::AppState;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);
    if let Err(e) = color_eyre::install() {
        eprintln!("warning: error reporter not installed: {e}");
    }

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "pour failed");
            if JSON_MODE.get().copied().unwrap_or(false) {
                println!("{}", error_fmt::format_error_json(&e));
            } else {
                eprintln!("{}", error_fmt::humanize(&e));
            }
            ExitCode::from(error_fmt::exit_code_for_error(&e))
        }
    }
}

async fn run(cli: Cli) -> eyre::Result<ExitCode> {
    let cfg = app::load_config(&cli).wrap_err(Stage::Config)?;
    init_tracing(&cli, &cfg).wrap_err(Stage::Config)?;
    tracing::debug!(?cfg, "configuration loaded");

    let device = app::make_device(&cfg)?;
    let events = EventLogBackend::open(&cfg, cli.memory_log)
        .await
        .wrap_err(Stage::Store)?;
    let coordinator = Arc::new(app::build_coordinator(&cfg, device, events.shared())?);

    let code = match cli.cmd {
        Commands::Serve => {
            serve(&cfg, coordinator).await?;
            ExitCode::SUCCESS
        }
        Commands::Status => {
            let status = coordinator.query_status().await;
            println!("{}", serde_json::to_string_pretty(&status)?);
            ExitCode::SUCCESS
        }
        Commands::Dispense { ml, token } => {
            let token = token.unwrap_or_else(|| cfg.dispense.anonymous_token.clone());
            dispense_once(&coordinator, ml, &token, cli.json).await
        }
        Commands::Logs { limit } => {
            let rows = coordinator.recent_events(limit).await?;
            println!("{}", serde_json::to_string_pretty(&rows)?);
            ExitCode::SUCCESS
        }
        Commands::SelfCheck => self_check(&coordinator, &events, cli.json).await?,
    };

    events.close().await;
    Ok(code)
}

async fn serve(cfg: &Config, coordinator: Arc<Coordinator>) -> eyre::Result<()> {
    let state = AppState {
        coordinator,
        anonymous_token: Arc::from(cfg.dispense.anonymous_token.as_str()),
    };
    let app = routes::router(state, &cfg.server);

    let address = format!("{}:{}", cfg.server.host, cfg.server.port);
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .wrap_err_with(|| format!("bind {address}"))
        .wrap_err(Stage::Bind)?;
    tracing::info!(%address, device = %cfg.device.url, simulate = cfg.device.simulate, "relay listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .wrap_err("http server")?;
    tracing::info!("relay stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "ctrl-c handler unavailable");
            std::future::pending::<()>().await;
        }
        tracing::info!("received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
                tracing::info!("received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::warn!(error = %e, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}

async fn dispense_once(coordinator: &Coordinator, ml: i64, token: &str, json: bool) -> ExitCode {
    let outcome = coordinator.request_dispense(ml, token).await;
    let body = match &outcome {
        DispenseOutcome::Accepted { request_id } => serde_json::json!({
            "success": true,
            "message": "Dispense started",
            "request_id": request_id,
        }),
        DispenseOutcome::Rejected(e) => serde_json::json!({
            "success": false,
            "reason": e.reason(),
        }),
    };
    if json {
        println!("{body}");
    } else {
        match &outcome {
            DispenseOutcome::Accepted { request_id } => {
                println!("Dispense started ({ml} ml, {request_id})");
            }
            DispenseOutcome::Rejected(e) => println!("Rejected: {}", e.reason()),
        }
    }
    if outcome.is_accepted() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

async fn self_check(
    coordinator: &Coordinator,
    events: &EventLogBackend,
    json: bool,
) -> eyre::Result<ExitCode> {
    let stored = events.count().await.wrap_err(Stage::Store)?;
    let status = coordinator.query_status().await;
    if json {
        println!(
            "{}",
            serde_json::json!({
                "config": "ok",
                "event_log": events.describe(),
                "events": stored,
                "device_online": status.device_online,
                "device": status.device,
            })
        );
    } else {
        println!("config: ok");
        println!("event log: {} ({stored} events)", events.describe());
        match &status.device {
            pour_core::DeviceSnapshot::Online(r) => println!(
                "device: online (state={}, glass_present={}, uptime={}s)",
                r.state, r.glass_present, r.uptime
            ),
            pour_core::DeviceSnapshot::Unavailable { error } => {
                println!("device: unreachable ({error})");
            }
        }
    }
    Ok(if status.device_online {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Console layer (pretty or JSON), optional rolling file sink, env filter.
///
/// Precedence for the level: `RUST_LOG`, then `--log-level`, then `[logging].level`.
fn init_tracing(cli: &Cli, cfg: &Config) -> eyre::Result<()> {
    let level = cli
        .log_level
        .clone()
        .or_else(|| cfg.logging.level.clone())
        .unwrap_or_else(|| "info".to_string());
    let filter = match EnvFilter::try_from_default_env() {
        Ok(f) => f,
        Err(_) => EnvFilter::try_new(&level).wrap_err_with(|| format!("invalid log level {level:?}"))?,
    };

    let mut layers: Vec<BoxedLayer> = Vec::new();
    if cli.json {
        layers.push(fmt::layer().json().with_writer(std::io::stderr).boxed());
    } else {
        layers.push(fmt::layer().with_writer(std::io::stderr).boxed());
    }

    if let Some(file) = &cfg.logging.file {
        let path = Path::new(file);
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let name = path
            .file_name()
            .ok_or_else(|| eyre::eyre!("logging.file {file:?} has no file name"))?;
        let rotation = match cfg.logging.rotation.as_deref() {
            Some("daily") => tracing_appender::rolling::Rotation::DAILY,
            Some("hourly") => tracing_appender::rolling::Rotation::HOURLY,
            _ => tracing_appender::rolling::Rotation::NEVER,
        };
        let appender = tracing_appender::rolling::RollingFileAppender::new(rotation, dir, name);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let _ = FILE_GUARD.set(guard);
        layers.push(fmt::layer().json().with_ansi(false).with_writer(writer).boxed());
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .wrap_err("install tracing subscriber")?;
    Ok(())
}
