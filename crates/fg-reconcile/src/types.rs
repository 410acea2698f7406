use fg_evaluator::Evaluation;
use fg_rules::{MerchantId, RuleId};
use std::time::Duration;

/// Bounded exponential backoff for counter delivery.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total delivery attempts per rule, including the first. Zero is treated as one.
    pub max_attempts: u32,
    pub base_backoff: Duration,
    pub max_backoff: Duration,
}

impl RetryPolicy {
    pub fn sane_defaults() -> Self {
        Self {
            max_attempts: 3,
            base_backoff: Duration::from_millis(50),
            max_backoff: Duration::from_secs(1),
        }
    }

    /// Delay to wait after failed attempt number `attempt` (1-based).
    pub fn backoff_after(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(31);
        self.base_backoff
            .saturating_mul(1u32 << shift)
            .min(self.max_backoff)
    }

    pub(crate) fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::sane_defaults()
    }
}

/// One checkout attempt's worth of counter increments.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconcileRequest {
    pub merchant_id: MerchantId,
    pub attempt_id: String,
    pub rule_ids: Vec<RuleId>,
}

impl ReconcileRequest {
    pub fn new(
        merchant_id: MerchantId,
        attempt_id: impl Into<String>,
        rule_ids: Vec<RuleId>,
    ) -> Self {
        Self {
            merchant_id,
            attempt_id: attempt_id.into(),
            rule_ids,
        }
    }

    /// Every rule that fired in `evaluation`, once each.
    pub fn from_evaluation(
        merchant_id: MerchantId,
        attempt_id: impl Into<String>,
        evaluation: &Evaluation,
    ) -> Self {
        Self::new(merchant_id, attempt_id, evaluation.triggered_rules())
    }

    pub fn is_empty(&self) -> bool {
        self.rule_ids.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Increment landed in the store.
    Applied { attempts: u32 },

    /// Already delivered, or being delivered by a concurrent task.
    Duplicate,

    /// Gave up (`ReconciliationDeliveryFailed`). The counter is under-reported
    /// by one; evaluation is unaffected.
    Dropped { attempts: u32, reason: String },
}

impl DeliveryOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, DeliveryOutcome::Applied { .. })
    }

    pub fn is_dropped(&self) -> bool {
        matches!(self, DeliveryOutcome::Dropped { .. })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconcileReport {
    pub merchant_id: MerchantId,
    pub attempt_id: String,
    /// One entry per distinct rule id, in request order.
    pub outcomes: Vec<(RuleId, DeliveryOutcome)>,
}

impl ReconcileReport {
    pub fn applied_count(&self) -> usize {
        self.outcomes.iter().filter(|(_, o)| o.is_applied()).count()
    }

    pub fn duplicate_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, o)| matches!(o, DeliveryOutcome::Duplicate))
            .count()
    }

    pub fn dropped_count(&self) -> usize {
        self.outcomes.iter().filter(|(_, o)| o.is_dropped()).count()
    }

    pub fn outcome_for(&self, rule_id: &RuleId) -> Option<&DeliveryOutcome> {
        self.outcomes
            .iter()
            .find(|(id, _)| id == rule_id)
            .map(|(_, o)| o)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_then_caps() {
        let p = RetryPolicy {
            max_attempts: 10,
            base_backoff: Duration::from_millis(10),
            max_backoff: Duration::from_millis(50),
        };
        assert_eq!(p.backoff_after(1), Duration::from_millis(10));
        assert_eq!(p.backoff_after(2), Duration::from_millis(20));
        assert_eq!(p.backoff_after(3), Duration::from_millis(40));
        assert_eq!(p.backoff_after(4), Duration::from_millis(50));
        assert_eq!(p.backoff_after(40), Duration::from_millis(50));
    }

    #[test]
    fn zero_attempts_still_tries_once() {
        let p = RetryPolicy {
            max_attempts: 0,
            ..RetryPolicy::sane_defaults()
        };
        assert_eq!(p.attempts(), 1);
    }
}
