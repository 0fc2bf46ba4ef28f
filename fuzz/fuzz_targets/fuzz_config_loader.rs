#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Parse and validation errors are fine; panics are not.
    if let Ok(cfg) = pour_config::load_toml(data) {
        if cfg.validate().is_ok() {
            // anything that validates must be usable as-is
            assert!(cfg.dispense.max_ml >= 1 && cfg.dispense.max_ml <= pour_config::HARD_MAX_ML);
            assert!(cfg.logs.default_limit <= cfg.logs.max_limit);
            assert!(cfg.device.status_timeout_ms >= 1);
        }
    }
});
