//! fg-store
//!
//! Rule store collaborator contract.
//!
//! Rule persistence lives outside this workspace. Only the interface it
//! presents is defined here, plus a deterministic in-memory implementation
//! for tests and the CLI:
//! - read path: `get_active_rules` (snapshot builder only)
//! - write path: `increment_match` (reconciler only)

mod memory;

pub use memory::MemoryRuleStore;

use fg_rules::{MerchantId, RuleId, RuleSet};

/// Failure reported by a store collaborator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreError {
    /// Transient: the store could not be reached. Safe to retry.
    Unavailable { reason: String },
    /// The rule does not exist (deleted since evaluation). Retrying cannot help.
    UnknownRule { merchant_id: MerchantId, rule_id: RuleId },
}

impl StoreError {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        StoreError::Unavailable {
            reason: reason.into(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Unavailable { .. })
    }
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Unavailable { reason } => write!(f, "rule store unavailable: {reason}"),
            StoreError::UnknownRule {
                merchant_id,
                rule_id,
            } => write!(f, "unknown rule {rule_id} for merchant {merchant_id}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// The rule store as seen from this workspace.
pub trait RuleStore: Send + Sync {
    /// Full current rule set for `merchant_id`. A merchant with no rules gets
    /// an empty set, not an error.
    fn get_active_rules(&self, merchant_id: &MerchantId) -> Result<RuleSet, StoreError>;

    /// Atomically add `delta` to the rule's `matches` counter.
    ///
    /// Implementations must serialize updates per `(merchant_id, rule_id)` so
    /// concurrent increments are additive.
    fn increment_match(
        &self,
        merchant_id: &MerchantId,
        rule_id: &RuleId,
        delta: u64,
    ) -> Result<(), StoreError>;
}
