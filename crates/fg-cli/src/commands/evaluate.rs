//! `fraudgate evaluate`: offline evaluation for rule debugging.

use anyhow::{Context, Result};
use fg_evaluator::{evaluate_with_provenance, CheckoutContext};
use fg_snapshot::decode_snapshot;
use std::fs;
use uuid::Uuid;

use super::read_json;

pub fn evaluate(snapshot_path: &str, context_path: &str, provenance: bool) -> Result<()> {
    let bytes =
        fs::read(snapshot_path).with_context(|| format!("read snapshot failed: {snapshot_path}"))?;
    let snapshot =
        decode_snapshot(&bytes).with_context(|| format!("snapshot rejected: {snapshot_path}"))?;

    let mut ctx: CheckoutContext = read_json(context_path, "checkout context")?;
    if ctx.attempt_id.trim().is_empty() {
        ctx.attempt_id = Uuid::new_v4().to_string();
    }

    let evaluation = evaluate_with_provenance(&snapshot, &ctx);
    tracing::debug!(
        attempt_id = %ctx.attempt_id,
        blocked = evaluation.is_blocked(),
        "checkout evaluated"
    );

    let json = if provenance {
        serde_json::to_string_pretty(&evaluation.findings)
    } else {
        serde_json::to_string_pretty(&evaluation.into_violations())
    }
    .context("serialize violations failed")?;
    println!("{json}");
    Ok(())
}
