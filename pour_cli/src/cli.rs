//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

/// Config file read when `--config` is not given. Absent means all defaults.
pub const DEFAULT_CONFIG: &str = "pour.toml";

#[derive(Parser, Debug)]
#[command(name = "pour", version, about = "HTTP relay for a networked drink dispenser")]
pub struct Cli {
    /// Path to config TOML (defaults to ./pour.toml when present)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Log and report errors as JSON lines instead of pretty text
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace); RUST_LOG wins when set
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Override server.port
    #[arg(long, value_name = "PORT", global = true)]
    pub port: Option<u16>,

    /// Override device.url
    #[arg(long = "device-url", value_name = "URL", global = true)]
    pub device_url: Option<String>,

    /// Use the in-process simulated device instead of HTTP
    #[arg(long, action = ArgAction::SetTrue, global = true)]
    pub simulate: bool,

    /// Keep the event log in memory instead of SQLite
    #[arg(long = "memory-log", action = ArgAction::SetTrue, global = true)]
    pub memory_log: bool,

    /// Override database.url (e.g. sqlite://dispenser.db)
    #[arg(long, value_name = "URL", global = true)]
    pub database: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP relay
    Serve,
    /// Query device status once and print it as JSON
    Status,
    /// Request a single dispense
    Dispense {
        /// Amount in millilitres
        #[arg(long, allow_negative_numbers = true)]
        ml: i64,
        /// User token recorded with the event
        #[arg(long, value_name = "TOKEN")]
        token: Option<String>,
    },
    /// Print recent events, newest first
    Logs {
        /// How many events to show (clamped to logs.max_limit)
        #[arg(long)]
        limit: Option<i64>,
    },
    /// Validate config, open the event log and probe the device
    SelfCheck,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn overrides_are_accepted_after_subcommand() {
        let cli = Cli::try_parse_from([
            "pour", "dispense", "--ml", "40", "--simulate", "--memory-log",
        ])
        .unwrap();
        assert!(cli.simulate);
        assert!(cli.memory_log);
        match cli.cmd {
            Commands::Dispense { ml, token } => {
                assert_eq!(ml, 40);
                assert_eq!(token, None);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn negative_amounts_parse() {
        let cli = Cli::try_parse_from(["pour", "dispense", "--ml", "-5"]).unwrap();
        assert!(matches!(cli.cmd, Commands::Dispense { ml: -5, .. }));
    }
}
