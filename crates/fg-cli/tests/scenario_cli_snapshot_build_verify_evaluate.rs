//! Scenario: CLI snapshot build -> verify -> evaluate
//!
//! # Invariants under test
//!
//! 1. `snapshot build` writes a snapshot that `snapshot verify` accepts.
//! 2. A hand-edited snapshot file fails `verify` and `evaluate`.
//! 3. `evaluate` prints the violations as JSON, target "cart".
//! 4. A config ceiling below the rule count fails the build with
//!    SNAPSHOT_TOO_LARGE and writes nothing.
//! 5. `config-hash --strict` fails on keys nothing reads.
//!
//! Pure filesystem; no network or database.

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use std::process::Command;

const RULES_JSON: &str = r#"{
  "merchant_id": "shop-1",
  "revision": 3,
  "email_blacklist": [
    {"id": "e1", "merchant_id": "shop-1", "email": "Fraud@Evil.com", "status": "ACTIVE"}
  ],
  "geo_rules": [
    {"id": "g1", "merchant_id": "shop-1", "country_code": "US", "action": "BLOCK"},
    {"id": "g2", "merchant_id": "shop-1", "country_code": "US", "action": "ALLOW"}
  ],
  "first_order": {
    "id": "f1", "merchant_id": "shop-1",
    "max_order_value": "100.00", "currency": "USD", "required_fields": []
  }
}"#;

fn write(dir: &Path, name: &str, body: &str) -> String {
    let p = dir.join(name);
    fs::write(&p, body).unwrap();
    p.to_string_lossy().into_owned()
}

fn fraudgate() -> Command {
    Command::cargo_bin("fraudgate").unwrap()
}

fn build(dir: &Path) -> String {
    let rules = write(dir, "rules.json", RULES_JSON);
    let out = dir.join("snapshot.json").to_string_lossy().into_owned();
    fraudgate()
        .args(["snapshot", "build", "--rules", &rules, "--out", &out])
        .assert()
        .success()
        .stdout(predicate::str::contains("version=3"))
        .stdout(predicate::str::contains("rule_count=4"));
    out
}

#[test]
fn build_then_verify() {
    let dir = tempfile::tempdir().unwrap();
    let snap = build(dir.path());

    fraudgate()
        .args(["snapshot", "verify", &snap])
        .assert()
        .success()
        .stdout(predicate::str::contains("integrity=ok"))
        .stdout(predicate::str::contains("merchant_id=shop-1"));
}

#[test]
fn tampered_file_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let snap = build(dir.path());

    let raw = fs::read_to_string(&snap).unwrap();
    fs::write(&snap, raw.replace("fraud@evil.com", "nobody@evil.com")).unwrap();

    fraudgate()
        .args(["snapshot", "verify", &snap])
        .assert()
        .failure()
        .stderr(predicate::str::contains("SNAPSHOT_INTEGRITY_MISMATCH"));

    let ctx = write(dir.path(), "ctx.json", r#"{"email":"fraud@evil.com"}"#);
    fraudgate()
        .args(["evaluate", "--snapshot", &snap, "--context", &ctx])
        .assert()
        .failure();
}

#[test]
fn evaluate_prints_violations() {
    let dir = tempfile::tempdir().unwrap();
    let snap = build(dir.path());
    let ctx = write(
        dir.path(),
        "ctx.json",
        r#"{"attempt_id":"a-1","email":"fraud@evil.com","country_code":"us",
            "is_first_order":true,"order_total":{"amount":"100.01","currency":"USD"}}"#,
    );

    let output = fraudgate()
        .args(["evaluate", "--snapshot", &snap, "--context", &ctx])
        .output()
        .unwrap();
    assert!(output.status.success());

    let v: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let messages: Vec<&str> = v
        .as_array()
        .unwrap()
        .iter()
        .map(|x| x["message"].as_str().unwrap())
        .collect();
    assert_eq!(
        messages,
        vec![
            "Email not allowed",
            "Orders not allowed from your country",
            "Order value exceeds the limit for first orders"
        ]
    );
    assert!(v.as_array().unwrap().iter().all(|x| x["target"] == "cart"));
}

#[test]
fn evaluate_with_provenance_names_rules() {
    let dir = tempfile::tempdir().unwrap();
    let snap = build(dir.path());
    let ctx = write(dir.path(), "ctx.json", r#"{"country_code":"US"}"#);

    fraudgate()
        .args(["evaluate", "--snapshot", &snap, "--context", &ctx, "--provenance"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"rule_id\": \"g1\""));
}

#[test]
fn oversized_rule_set_fails_build() {
    let dir = tempfile::tempdir().unwrap();
    let rules = write(dir.path(), "rules.json", RULES_JSON);
    let cfg = write(dir.path(), "limits.yaml", "snapshot:\n  max_rules: 2\n");
    let out = dir.path().join("snapshot.json");

    fraudgate()
        .args([
            "snapshot",
            "build",
            "--rules",
            &rules,
            "--config",
            &cfg,
            "--out",
            &out.to_string_lossy(),
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("SNAPSHOT_TOO_LARGE"));
    assert!(!out.exists());
}

#[test]
fn config_hash_strict_rejects_unused_keys() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = write(dir.path(), "base.yaml", "snapshot:\n  max_rules: 5\n  typo: 1\n");

    fraudgate()
        .args(["config-hash", &cfg])
        .assert()
        .success()
        .stdout(predicate::str::contains("config_hash="));

    fraudgate()
        .args(["config-hash", "--strict", &cfg])
        .assert()
        .failure()
        .stderr(predicate::str::contains("CONFIG_UNUSED_KEYS"));
}
