//! Human-readable error descriptions and structured JSON error formatting.

use std::fmt;

/// Startup phase an error came from; attached with `wrap_err` so it can be
/// recovered by downcasting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Config,
    Store,
    Bind,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Config => "failed to load configuration",
            Stage::Store => "failed to open the event log",
            Stage::Bind => "failed to start the HTTP server",
        })
    }
}

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    use pour_core::error::BuildError;

    let detail = chain_text(err);

    // Typed matches first
    if let Some(stage) = err.downcast_ref::<Stage>() {
        return match stage {
            Stage::Config => format!(
                "What happened: The configuration could not be used ({detail}).\nLikely causes: A typo in the TOML, an out-of-range value, or a --config path that does not exist.\nHow to fix: Edit the config file or the command-line override it names, then rerun."
            ),
            Stage::Store => format!(
                "What happened: The event log database could not be opened ({detail}).\nLikely causes: The directory does not exist or is not writable, or database.url is malformed.\nHow to fix: Check database.url (e.g. sqlite://dispenser.db) and file permissions, or run with --memory-log."
            ),
            Stage::Bind => format!(
                "What happened: The HTTP server could not listen ({detail}).\nLikely causes: Another process already uses the port, or the host address is not assigned to this machine.\nHow to fix: Stop the other process or pick a free port with --port."
            ),
        };
    }

    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingDevice => {
                "What happened: No device was provided to the coordinator.\nLikely causes: The device backend failed to initialize.\nHow to fix: Check [device] in the config or run with --simulate.".to_string()
            }
            BuildError::MissingEventLog => {
                "What happened: No event log was provided to the coordinator.\nLikely causes: The event log backend failed to initialize.\nHow to fix: Check [database] in the config or run with --memory-log.".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun."
            ),
        };
    }

    // Generic fallback
    format!(
        "Something went wrong: {detail}\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
    )
}

/// Stable exit codes per startup phase; anything else is 1.
pub fn exit_code_for_error(err: &eyre::Report) -> u8 {
    match err.downcast_ref::<Stage>() {
        Some(Stage::Config) => 2,
        Some(Stage::Store) => 3,
        Some(Stage::Bind) => 4,
        None => 1,
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;

    let reason = match err.downcast_ref::<Stage>() {
        Some(Stage::Config) => "Config",
        Some(Stage::Store) => "Store",
        Some(Stage::Bind) => "Bind",
        None => "Error",
    };
    json!({ "reason": reason, "message": humanize(err) }).to_string()
}

/// The error chain below the stage marker, joined with ": ".
fn chain_text(err: &eyre::Report) -> String {
    let skip = usize::from(err.downcast_ref::<Stage>().is_some());
    err.chain()
        .skip(skip)
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(": ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use eyre::WrapErr;
    use rstest::rstest;

    fn staged(stage: Stage) -> eyre::Report {
        Err::<(), _>(eyre::eyre!("device.url must start with http:// or https://"))
            .wrap_err(stage)
            .unwrap_err()
    }

    #[rstest]
    #[case(Stage::Config, 2, "configuration could not be used")]
    #[case(Stage::Store, 3, "event log database")]
    #[case(Stage::Bind, 4, "could not listen")]
    fn stages_map_to_codes_and_text(#[case] stage: Stage, #[case] code: u8, #[case] needle: &str) {
        let err = staged(stage);
        assert_eq!(exit_code_for_error(&err), code);
        let text = humanize(&err);
        assert!(text.starts_with("What happened:"), "{text}");
        assert!(text.contains(needle), "{text}");
        assert!(text.contains("device.url must start with"), "{text}");
        assert!(text.contains("How to fix:"), "{text}");
    }

    #[test]
    fn unstaged_errors_fall_back() {
        let err = eyre::eyre!("boom");
        assert_eq!(exit_code_for_error(&err), 1);
        assert!(humanize(&err).contains("boom"));
        let v: serde_json::Value = serde_json::from_str(&format_error_json(&err)).unwrap();
        assert_eq!(v["reason"], "Error");
    }

    #[test]
    fn build_errors_are_typed() {
        let err = eyre::Report::new(pour_core::BuildError::MissingDevice);
        assert!(humanize(&err).contains("No device was provided"));
    }

    #[test]
    fn json_carries_stage_reason() {
        let v: serde_json::Value =
            serde_json::from_str(&format_error_json(&staged(Stage::Store))).unwrap();
        assert_eq!(v["reason"], "Store");
        assert!(v["message"].as_str().unwrap().contains("What happened"));
    }
}
