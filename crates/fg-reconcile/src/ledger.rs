//! Idempotency ledger for counter increments.
//!
//! A key moves `claim` -> `commit` on success or `claim` -> `release` on
//! failure. A committed key is never claimable again until evicted; a claimed
//! key is not claimable by anyone else while in flight.
//!
//! Committed keys are bounded: once `capacity` is exceeded the oldest
//! committed key is evicted (FIFO). Eviction only weakens duplicate detection
//! for very old attempts; it never double-applies an in-flight key.

use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use fg_rules::{MerchantId, RuleId};

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct IdempotencyKey {
    pub merchant_id: MerchantId,
    pub attempt_id: String,
    pub rule_id: RuleId,
}

impl IdempotencyKey {
    pub fn new(merchant_id: &MerchantId, attempt_id: &str, rule_id: &RuleId) -> Self {
        Self {
            merchant_id: merchant_id.clone(),
            attempt_id: attempt_id.to_string(),
            rule_id: rule_id.clone(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Claim {
    /// Caller owns the key and must `commit` or `release` it.
    Acquired,
    InFlight,
    AlreadyCommitted,
}

#[derive(Debug, Default)]
struct Inner {
    in_flight: HashSet<IdempotencyKey>,
    committed: HashSet<IdempotencyKey>,
    order: VecDeque<IdempotencyKey>,
}

#[derive(Debug)]
pub struct IdempotencyLedger {
    capacity: usize,
    inner: Mutex<Inner>,
}

impl IdempotencyLedger {
    pub const DEFAULT_CAPACITY: usize = 100_000;

    /// A zero capacity is bumped to one.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: Mutex::new(Inner::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn claim(&self, key: &IdempotencyKey) -> Claim {
        let mut inner = self.lock();
        if inner.committed.contains(key) {
            return Claim::AlreadyCommitted;
        }
        if !inner.in_flight.insert(key.clone()) {
            return Claim::InFlight;
        }
        Claim::Acquired
    }

    pub fn commit(&self, key: &IdempotencyKey) {
        let mut inner = self.lock();
        inner.in_flight.remove(key);
        if inner.committed.insert(key.clone()) {
            inner.order.push_back(key.clone());
        }
        while inner.order.len() > self.capacity {
            if let Some(oldest) = inner.order.pop_front() {
                inner.committed.remove(&oldest);
            }
        }
    }

    pub fn release(&self, key: &IdempotencyKey) {
        self.lock().in_flight.remove(key);
    }

    pub fn is_committed(&self, key: &IdempotencyKey) -> bool {
        self.lock().committed.contains(key)
    }

    pub fn committed_len(&self) -> usize {
        self.lock().committed.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for IdempotencyLedger {
    fn default() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(attempt: &str, rule: &str) -> IdempotencyKey {
        IdempotencyKey::new(&MerchantId::new("m"), attempt, &RuleId::new(rule))
    }

    #[test]
    fn claim_commit_then_duplicate() {
        let l = IdempotencyLedger::with_capacity(10);
        let k = key("a1", "r1");
        assert_eq!(l.claim(&k), Claim::Acquired);
        assert_eq!(l.claim(&k), Claim::InFlight);
        l.commit(&k);
        assert_eq!(l.claim(&k), Claim::AlreadyCommitted);
        assert!(l.is_committed(&k));
    }

    #[test]
    fn release_makes_key_claimable_again() {
        let l = IdempotencyLedger::with_capacity(10);
        let k = key("a1", "r1");
        assert_eq!(l.claim(&k), Claim::Acquired);
        l.release(&k);
        assert_eq!(l.claim(&k), Claim::Acquired);
    }

    #[test]
    fn same_rule_different_attempt_is_distinct() {
        let l = IdempotencyLedger::with_capacity(10);
        let a = key("a1", "r1");
        let b = key("a2", "r1");
        assert_eq!(l.claim(&a), Claim::Acquired);
        l.commit(&a);
        assert_eq!(l.claim(&b), Claim::Acquired);
    }

    #[test]
    fn oldest_committed_key_is_evicted() {
        let l = IdempotencyLedger::with_capacity(2);
        for a in ["a1", "a2", "a3"] {
            let k = key(a, "r1");
            assert_eq!(l.claim(&k), Claim::Acquired);
            l.commit(&k);
        }
        assert_eq!(l.committed_len(), 2);
        assert!(!l.is_committed(&key("a1", "r1")));
        assert!(l.is_committed(&key("a3", "r1")));
    }
}
