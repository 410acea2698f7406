//! `fraudgate snapshot build` and `fraudgate snapshot verify`.

use anyhow::{Context, Result};
use chrono::Utc;
use fg_config::FraudGateSettings;
use fg_rules::{MerchantId, RuleSet};
use fg_snapshot::{build_snapshot, decode_snapshot, encode_snapshot};
use std::fs;
use tracing::info;

use super::{load_config, read_json};

pub fn build(
    rules_path: &str,
    merchant: Option<&str>,
    config_paths: &[String],
    out: &str,
) -> Result<()> {
    let settings = if config_paths.is_empty() {
        FraudGateSettings::default()
    } else {
        let loaded = load_config(config_paths, false)?;
        FraudGateSettings::from_config_json(&loaded.config_json)?
    };

    let rules: RuleSet = read_json(rules_path, "rule set")?;
    let merchant_id = merchant
        .map(MerchantId::new)
        .unwrap_or_else(|| rules.merchant_id.clone());

    let snapshot = build_snapshot(&merchant_id, &rules, &settings.build_limits, Utc::now())
        .with_context(|| format!("snapshot build failed for merchant {merchant_id}"))?;
    let bytes = encode_snapshot(&snapshot).context("encode snapshot failed")?;
    fs::write(out, &bytes).with_context(|| format!("write snapshot failed: {out}"))?;

    info!(%merchant_id, version = snapshot.version, path = out, "snapshot written");
    println!("snapshot_written=true path={out}");
    println!("merchant_id={}", snapshot.merchant_id);
    println!("version={}", snapshot.version);
    println!("rule_count={}", snapshot.rule_count());
    println!("rule_set_hash={}", snapshot.rule_set_hash);
    Ok(())
}

pub fn verify(path: &str) -> Result<()> {
    let bytes = fs::read(path).with_context(|| format!("read snapshot failed: {path}"))?;
    let snapshot = decode_snapshot(&bytes).with_context(|| format!("snapshot rejected: {path}"))?;

    println!("integrity=ok");
    println!("merchant_id={}", snapshot.merchant_id);
    println!("version={}", snapshot.version);
    println!("built_at_utc={}", snapshot.built_at.to_rfc3339());
    println!("rule_count={}", snapshot.rule_count());
    println!("rule_set_hash={}", snapshot.rule_set_hash);
    Ok(())
}
