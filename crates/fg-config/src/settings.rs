//! Typed settings read out of the effective config tree.
//!
//! Absent keys fall back to defaults. Present keys of the wrong type or out of
//! range are errors: a typo'd limit must not silently become "unlimited".

use anyhow::{bail, Result};
use fg_reconcile::{IdempotencyLedger, RetryPolicy};
use fg_snapshot::BuildLimits;
use serde_json::Value;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FraudGateSettings {
    pub build_limits: BuildLimits,
    pub retry: RetryPolicy,
    pub ledger_capacity: usize,
}

impl Default for FraudGateSettings {
    fn default() -> Self {
        Self {
            build_limits: BuildLimits::sane_defaults(),
            retry: RetryPolicy::sane_defaults(),
            ledger_capacity: IdempotencyLedger::DEFAULT_CAPACITY,
        }
    }
}

impl FraudGateSettings {
    pub fn from_config_json(config: &Value) -> Result<Self> {
        let d = Self::default();

        let max_rules = read_positive(config, "/snapshot/max_rules")?
            .map(to_usize)
            .unwrap_or(d.build_limits.max_rules);
        let max_payload_bytes = read_positive(config, "/snapshot/max_payload_bytes")?
            .map(to_usize)
            .or(d.build_limits.max_payload_bytes);

        let max_attempts = match read_positive(config, "/reconcile/retry/max_attempts")? {
            Some(n) => match u32::try_from(n) {
                Ok(n) => n,
                Err(_) => bail!("CONFIG_INVALID /reconcile/retry/max_attempts={n} exceeds u32"),
            },
            None => d.retry.max_attempts,
        };
        let base_backoff = read_u64(config, "/reconcile/retry/base_backoff_ms")?
            .map(Duration::from_millis)
            .unwrap_or(d.retry.base_backoff);
        let max_backoff = read_u64(config, "/reconcile/retry/max_backoff_ms")?
            .map(Duration::from_millis)
            .unwrap_or(d.retry.max_backoff);
        if max_backoff < base_backoff {
            bail!(
                "CONFIG_INVALID /reconcile/retry/max_backoff_ms ({}) < base_backoff_ms ({})",
                max_backoff.as_millis(),
                base_backoff.as_millis()
            );
        }

        let ledger_capacity = read_positive(config, "/reconcile/ledger_capacity")?
            .map(to_usize)
            .unwrap_or(d.ledger_capacity);

        Ok(Self {
            build_limits: BuildLimits {
                max_rules,
                max_payload_bytes,
            },
            retry: RetryPolicy {
                max_attempts,
                base_backoff,
                max_backoff,
            },
            ledger_capacity,
        })
    }
}

fn read_u64(config: &Value, ptr: &str) -> Result<Option<u64>> {
    match config.pointer(ptr) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => match v.as_u64() {
            Some(n) => Ok(Some(n)),
            None => bail!("CONFIG_INVALID {ptr} must be a non-negative integer, got {v}"),
        },
    }
}

fn read_positive(config: &Value, ptr: &str) -> Result<Option<u64>> {
    match read_u64(config, ptr)? {
        Some(0) => bail!("CONFIG_INVALID {ptr} must be > 0"),
        other => Ok(other),
    }
}

fn to_usize(n: u64) -> usize {
    usize::try_from(n).unwrap_or(usize::MAX)
}
