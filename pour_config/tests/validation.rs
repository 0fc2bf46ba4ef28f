use pour_config::{load_path, load_toml};
use rstest::rstest;
use std::fs;
use tempfile::tempdir;

#[test]
fn empty_document_is_valid_with_defaults() {
    let cfg = load_toml("").expect("parse TOML");
    cfg.validate().expect("defaults should pass");
    assert_eq!(cfg.server.port, 5000);
    assert_eq!(cfg.device.url, "http://esp32.local");
    assert_eq!(cfg.device.status_timeout_ms, 1000);
    assert_eq!(cfg.device.dispense_timeout_ms, 2000);
    assert_eq!(cfg.dispense.max_ml, 60);
    assert_eq!(cfg.dispense.anonymous_token, "anonymous");
    assert_eq!(cfg.logs.default_limit, 20);
}

#[test]
fn accepts_full_config() {
    let toml = r#"
[server]
host = "127.0.0.1"
port = 8080
static_dir = "frontend/dist"
cors = true

[device]
url = "http://192.168.4.1"
status_timeout_ms = 500
dispense_timeout_ms = 3000
simulate = true
sim_ms_per_ml = 20

[dispense]
max_ml = 45

[database]
url = "sqlite://events.db"
max_connections = 2

[logs]
default_limit = 10
max_limit = 100

[logging]
level = "debug"
rotation = "daily"
"#;

    let cfg = load_toml(toml).expect("parse TOML");
    cfg.validate().expect("valid config should pass");
    assert_eq!(cfg.server.port, 8080);
    assert!(cfg.device.simulate);
    assert_eq!(cfg.dispense.max_ml, 45);
    // untouched field in a present section keeps its default
    assert_eq!(cfg.dispense.anonymous_token, "anonymous");
}

#[rstest]
#[case("[device]\nstatus_timeout_ms = 0", "status_timeout_ms must be >= 1")]
#[case("[device]\ndispense_timeout_ms = 0", "dispense_timeout_ms must be >= 1")]
#[case("[device]\nurl = \"esp32.local\"", "device.url must start with")]
#[case("[dispense]\nmax_ml = 0", "max_ml must be >= 1")]
#[case("[dispense]\nmax_ml = 5000", "max_ml must be <=")]
#[case("[database]\nurl = \"postgres://x\"", "sqlite: url")]
#[case("[logs]\ndefault_limit = 50\nmax_limit = 10", "default_limit must be <=")]
#[case("[logging]\nrotation = \"weekly\"", "rotation must be one of")]
fn rejects_out_of_range_values(#[case] toml: &str, #[case] needle: &str) {
    let cfg = load_toml(toml).expect("parse TOML");
    let err = cfg.validate().expect_err("should reject");
    assert!(
        format!("{err}")
            .to_lowercase()
            .contains(&needle.to_lowercase()),
        "unexpected error: {err}"
    );
}

#[test]
fn load_path_reads_file_and_reports_missing() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("pour.toml");
    fs::write(&path, "[server]\nport = 9000\n").unwrap();
    let cfg = load_path(&path).expect("load");
    assert_eq!(cfg.server.port, 9000);

    let err = load_path(&dir.path().join("missing.toml")).expect_err("missing file");
    assert!(format!("{err}").contains("read config"));
}

#[test]
fn load_path_reports_type_errors() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.toml");
    fs::write(&path, "[server]\nport = \"eighty\"\n").unwrap();
    let err = load_path(&path).expect_err("bad type");
    assert!(format!("{err}").contains("invalid configuration"));
}
