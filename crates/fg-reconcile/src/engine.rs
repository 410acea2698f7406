use std::collections::BTreeSet;
use std::sync::Arc;

use fg_rules::{MerchantId, RuleId};
use fg_store::RuleStore;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::ledger::{Claim, IdempotencyKey, IdempotencyLedger};
use crate::types::{DeliveryOutcome, ReconcileReport, ReconcileRequest, RetryPolicy};

/// `Dropped` reason for a request without an attempt id.
pub const MISSING_ATTEMPT_ID: &str = "missing attempt id";

/// Delivers match-counter increments for evaluated checkouts.
///
/// Cloning is cheap: clones share the store and the idempotency ledger, so
/// deliveries from any clone dedupe against each other.
pub struct Reconciler<S: RuleStore + ?Sized> {
    store: Arc<S>,
    ledger: Arc<IdempotencyLedger>,
    policy: RetryPolicy,
}

impl<S: RuleStore + ?Sized> Clone for Reconciler<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            ledger: Arc::clone(&self.ledger),
            policy: self.policy.clone(),
        }
    }
}

impl<S: RuleStore + ?Sized> Reconciler<S> {
    pub fn new(store: Arc<S>, policy: RetryPolicy, ledger_capacity: usize) -> Self {
        Self {
            store,
            ledger: Arc::new(IdempotencyLedger::with_capacity(ledger_capacity)),
            policy,
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn ledger(&self) -> &IdempotencyLedger {
        &self.ledger
    }

    /// Deliver one increment per distinct rule id in `req`.
    ///
    /// Never fails: every rule ends as applied, duplicate, or dropped. A blank
    /// attempt id cannot be deduplicated, so its increments are dropped
    /// without touching the store or the ledger.
    pub async fn reconcile(&self, req: ReconcileRequest) -> ReconcileReport {
        let mut seen = BTreeSet::new();
        let mut outcomes = Vec::with_capacity(req.rule_ids.len());
        let blank = req.attempt_id.trim().is_empty();
        if blank {
            warn!(
                merchant_id = %req.merchant_id,
                rules = req.rule_ids.len(),
                "ReconciliationDeliveryFailed: blank attempt id, increments dropped"
            );
        }

        for rule_id in &req.rule_ids {
            if !seen.insert(rule_id.clone()) {
                continue;
            }
            let outcome = if blank {
                DeliveryOutcome::Dropped {
                    attempts: 0,
                    reason: MISSING_ATTEMPT_ID.to_string(),
                }
            } else {
                self.deliver(&req.merchant_id, &req.attempt_id, rule_id).await
            };
            outcomes.push((rule_id.clone(), outcome));
        }

        let report = ReconcileReport {
            merchant_id: req.merchant_id,
            attempt_id: req.attempt_id,
            outcomes,
        };
        info!(
            merchant_id = %report.merchant_id,
            attempt_id = %report.attempt_id,
            applied = report.applied_count(),
            duplicate = report.duplicate_count(),
            dropped = report.dropped_count(),
            "reconciliation finished"
        );
        report
    }

    async fn deliver(
        &self,
        merchant_id: &MerchantId,
        attempt_id: &str,
        rule_id: &RuleId,
    ) -> DeliveryOutcome {
        let key = IdempotencyKey::new(merchant_id, attempt_id, rule_id);
        match self.ledger.claim(&key) {
            Claim::Acquired => {}
            Claim::InFlight | Claim::AlreadyCommitted => {
                debug!(%merchant_id, attempt_id, %rule_id, "duplicate increment skipped");
                return DeliveryOutcome::Duplicate;
            }
        }

        let max = self.policy.attempts();
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.store.increment_match(merchant_id, rule_id, 1) {
                Ok(()) => {
                    self.ledger.commit(&key);
                    return DeliveryOutcome::Applied { attempts: attempt };
                }
                Err(e) if e.is_retryable() && attempt < max => {
                    let delay = self.policy.backoff_after(attempt);
                    debug!(
                        %merchant_id, %rule_id, attempt, delay_ms = delay.as_millis() as u64,
                        error = %e, "increment failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    self.ledger.release(&key);
                    warn!(
                        %merchant_id, attempt_id, %rule_id, attempts = attempt, error = %e,
                        "ReconciliationDeliveryFailed: match increment dropped"
                    );
                    return DeliveryOutcome::Dropped {
                        attempts: attempt,
                        reason: e.to_string(),
                    };
                }
            }
        }
    }
}

impl<S: RuleStore + ?Sized + 'static> Reconciler<S> {
    /// Fire-and-forget: reconcile on a detached tokio task.
    ///
    /// Must be called from within a tokio runtime. Dropping the handle does
    /// not cancel delivery.
    pub fn spawn(&self, req: ReconcileRequest) -> JoinHandle<ReconcileReport> {
        let this = self.clone();
        tokio::spawn(async move { this.reconcile(req).await })
    }
}
