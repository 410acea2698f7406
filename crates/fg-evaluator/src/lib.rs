//! fg-evaluator
//!
//! Deterministic checkout evaluation against an immutable rule snapshot.
//! No IO, no logging, no clocks: same snapshot + same context = same output.

mod engine;
mod types;

pub use engine::{
    evaluate, evaluate_with_provenance, MSG_COUNTRY_BLOCKED, MSG_DOMAIN_BLOCKED,
    MSG_EMAIL_BLOCKED, MSG_FIRST_ORDER_FIELDS, MSG_FIRST_ORDER_LIMIT, MSG_IP_BLOCKED,
};
pub use types::*;
