//! Deterministic in-memory rule store.
//!
//! - `put_rules` replaces a merchant's rule set and bumps its revision.
//!   Counters of rules that survive the edit never go backwards.
//! - `increment_match` is atomic under the store mutex.
//! - `fail_next_increments(n)` makes the next `n` increment calls return
//!   `Unavailable`, for retry scenarios.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use fg_rules::{MerchantId, RuleId, RuleSet};
use tracing::debug;

use crate::{RuleStore, StoreError};

#[derive(Debug, Default)]
struct Inner {
    rules: BTreeMap<MerchantId, RuleSet>,
    failures_remaining: u32,
    increment_calls: u64,
}

#[derive(Debug, Default)]
pub struct MemoryRuleStore {
    inner: Mutex<Inner>,
}

impl MemoryRuleStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store `rules` for its merchant. The revision becomes one past the
    /// previous revision (or the supplied one, if higher). A rule id already
    /// stored keeps `max(stored, incoming)` matches.
    pub fn put_rules(&self, mut rules: RuleSet) -> u64 {
        let mut inner = self.lock();
        let (prev, counts) = match inner.rules.get(&rules.merchant_id) {
            Some(existing) => (existing.revision, existing.match_counts()),
            None => (0, BTreeMap::new()),
        };
        for (id, stored) in counts {
            if let Some(m) = rules.matches_mut(&id) {
                *m = (*m).max(stored);
            }
        }
        rules.revision = rules.revision.max(prev + 1);
        let revision = rules.revision;
        debug!(merchant_id = %rules.merchant_id, revision, "rule set stored");
        inner.rules.insert(rules.merchant_id.clone(), rules);
        revision
    }

    /// Current `matches` counter for a rule.
    pub fn matches(&self, merchant_id: &MerchantId, rule_id: &RuleId) -> Option<u64> {
        let mut inner = self.lock();
        inner
            .rules
            .get_mut(merchant_id)
            .and_then(|r| r.matches_mut(rule_id).map(|m| *m))
    }

    pub fn fail_next_increments(&self, n: u32) {
        self.lock().failures_remaining = n;
    }

    /// Number of `increment_match` calls received, failed ones included.
    pub fn increment_calls(&self) -> u64 {
        self.lock().increment_calls
    }
}

impl RuleStore for MemoryRuleStore {
    fn get_active_rules(&self, merchant_id: &MerchantId) -> Result<RuleSet, StoreError> {
        Ok(self
            .lock()
            .rules
            .get(merchant_id)
            .cloned()
            .unwrap_or_else(|| RuleSet::empty(merchant_id.clone())))
    }

    fn increment_match(
        &self,
        merchant_id: &MerchantId,
        rule_id: &RuleId,
        delta: u64,
    ) -> Result<(), StoreError> {
        let mut inner = self.lock();
        inner.increment_calls += 1;

        if inner.failures_remaining > 0 {
            inner.failures_remaining -= 1;
            return Err(StoreError::unavailable("injected failure"));
        }

        let counter = inner
            .rules
            .get_mut(merchant_id)
            .and_then(|r| r.matches_mut(rule_id))
            .ok_or_else(|| StoreError::UnknownRule {
                merchant_id: merchant_id.clone(),
                rule_id: rule_id.clone(),
            })?;
        *counter = counter.saturating_add(delta);
        Ok(())
    }
}
