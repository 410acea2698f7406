//! fg-reconcile
//!
//! Asynchronous, idempotent delivery of rule match-counter increments.
//! The only component that writes rule state; never on the checkout path.

mod engine;
mod ledger;
mod types;

pub use engine::{Reconciler, MISSING_ATTEMPT_ID};
pub use ledger::{Claim, IdempotencyLedger, IdempotencyKey};
pub use types::*;
