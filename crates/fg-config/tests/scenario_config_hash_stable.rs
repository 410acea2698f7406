//! Scenario: Config hash stability
//!
//! GREEN when:
//! - Loading the same YAML twice yields the same `config_hash`.
//! - Reordering keys within YAML does not change the hash.
//! - Different values produce different hashes.
//! - The hash covers the merged tree, not the individual layers.

use fg_config::load_layered_yaml_from_strings;

const BASE_YAML: &str = r#"
snapshot:
  max_rules: 5000
  max_payload_bytes: 1048576
reconcile:
  ledger_capacity: 50000
  retry:
    max_attempts: 4
    base_backoff_ms: 25
"#;

const BASE_YAML_REORDERED: &str = r#"
reconcile:
  retry:
    base_backoff_ms: 25
    max_attempts: 4
  ledger_capacity: 50000
snapshot:
  max_payload_bytes: 1048576
  max_rules: 5000
"#;

const OVERLAY_YAML: &str = r#"
snapshot:
  max_rules: 20000
"#;

#[test]
fn same_input_produces_identical_hash() {
    let a = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let b = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    assert_eq!(a.config_hash, b.config_hash);
    assert_eq!(a.canonical_json, b.canonical_json);
    assert_eq!(a.config_hash.len(), 64, "sha256 hex");
}

#[test]
fn key_order_does_not_change_hash() {
    let a = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let b = load_layered_yaml_from_strings(&[BASE_YAML_REORDERED]).unwrap();
    assert_eq!(a.config_hash, b.config_hash);
}

#[test]
fn overlay_changes_hash() {
    let base = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let merged = load_layered_yaml_from_strings(&[BASE_YAML, OVERLAY_YAML]).unwrap();
    assert_ne!(base.config_hash, merged.config_hash);
    assert_eq!(
        merged.config_json.pointer("/snapshot/max_rules").and_then(|v| v.as_u64()),
        Some(20000)
    );
}

#[test]
fn equivalent_layering_produces_same_hash() {
    let flattened = r#"
snapshot:
  max_rules: 20000
  max_payload_bytes: 1048576
reconcile:
  ledger_capacity: 50000
  retry:
    max_attempts: 4
    base_backoff_ms: 25
"#;
    let layered = load_layered_yaml_from_strings(&[BASE_YAML, OVERLAY_YAML]).unwrap();
    let single = load_layered_yaml_from_strings(&[flattened]).unwrap();
    assert_eq!(layered.config_hash, single.config_hash);
}

#[test]
fn invalid_yaml_is_an_error() {
    let err = load_layered_yaml_from_strings(&["snapshot: [unclosed"]).unwrap_err();
    assert!(err.to_string().contains("invalid yaml"));
}
