//! Scenario: Typed settings from layered config files
//!
//! GREEN when:
//! - An empty config yields the built-in defaults.
//! - Values from files on disk (base + overlay) flow into `BuildLimits`,
//!   `RetryPolicy` and the ledger capacity.
//! - Zero, negative, or non-integer limits are rejected, not defaulted.
//! - A missing file is an error naming the path.

use std::io::Write;
use std::time::Duration;

use fg_config::{load_layered_yaml, load_layered_yaml_from_strings, FraudGateSettings};

fn write_yaml(dir: &tempfile::TempDir, name: &str, body: &str) -> String {
    let path = dir.path().join(name);
    let mut f = std::fs::File::create(&path).unwrap();
    f.write_all(body.as_bytes()).unwrap();
    path.to_string_lossy().into_owned()
}

#[test]
fn empty_config_yields_defaults() {
    let cfg = load_layered_yaml_from_strings(&[]).unwrap();
    let s = FraudGateSettings::from_config_json(&cfg.config_json).unwrap();
    assert_eq!(s, FraudGateSettings::default());
    assert_eq!(s.build_limits.max_rules, 10_000);
    assert_eq!(s.build_limits.max_payload_bytes, None);
}

#[test]
fn files_on_disk_are_layered() {
    let dir = tempfile::tempdir().unwrap();
    let base = write_yaml(
        &dir,
        "base.yaml",
        "snapshot:\n  max_rules: 500\nreconcile:\n  retry:\n    max_attempts: 5\n    base_backoff_ms: 10\n    max_backoff_ms: 80\n",
    );
    let overlay = write_yaml(
        &dir,
        "prod.yaml",
        "snapshot:\n  max_payload_bytes: 65536\nreconcile:\n  ledger_capacity: 1234\n",
    );

    let cfg = load_layered_yaml(&[&base, &overlay]).unwrap();
    let s = FraudGateSettings::from_config_json(&cfg.config_json).unwrap();

    assert_eq!(s.build_limits.max_rules, 500);
    assert_eq!(s.build_limits.max_payload_bytes, Some(65536));
    assert_eq!(s.retry.max_attempts, 5);
    assert_eq!(s.retry.base_backoff, Duration::from_millis(10));
    assert_eq!(s.retry.max_backoff, Duration::from_millis(80));
    assert_eq!(s.ledger_capacity, 1234);
}

#[test]
fn invalid_values_are_rejected() {
    for yaml in [
        "snapshot:\n  max_rules: 0\n",
        "snapshot:\n  max_rules: -5\n",
        "snapshot:\n  max_rules: \"lots\"\n",
        "reconcile:\n  retry:\n    max_attempts: 1.5\n",
        "reconcile:\n  retry:\n    base_backoff_ms: 100\n    max_backoff_ms: 10\n",
    ] {
        let cfg = load_layered_yaml_from_strings(&[yaml]).unwrap();
        let err = FraudGateSettings::from_config_json(&cfg.config_json).unwrap_err();
        assert!(err.to_string().contains("CONFIG_INVALID"), "{yaml}: {err}");
    }
}

#[test]
fn missing_file_names_the_path() {
    let err = load_layered_yaml(&["/definitely/not/here.yaml"]).unwrap_err();
    assert!(err.to_string().contains("/definitely/not/here.yaml"));
}
