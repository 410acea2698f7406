//! fg-testkit
//!
//! Fixtures and an in-process checkout pipeline for end-to-end scenarios.
//! Everything here runs against the in-memory store and transport.

mod fixtures;
mod pipeline;

pub use fixtures::{load_context_json, load_rule_set_json, RuleSetBuilder};
pub use pipeline::{CheckoutOutcome, CheckoutPipeline};
