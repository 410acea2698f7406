//! Scenario: Concurrent increments are atomic
//!
//! # Invariants under test
//!
//! 1. Concurrent `increment_match` calls on one rule lose no updates.
//! 2. Counters of different merchants never bleed into each other.
//! 3. A rule-set edit bumps the revision but never rewinds it.
//! 4. Injected failures are transient and counted as calls.
//! 5. A rule-set edit never rewinds the counter of a rule that survives it.

use std::sync::Arc;
use std::thread;

use fg_rules::{EmailRule, GeoAction, GeoRule, MerchantId, RuleId, RuleSet, RuleStatus};
use fg_store::{MemoryRuleStore, RuleStore, StoreError};

fn rule_set(merchant: &str) -> RuleSet {
    let merchant_id = MerchantId::new(merchant);
    let mut rules = RuleSet::empty(merchant_id.clone());
    rules.email_blacklist.push(EmailRule {
        id: RuleId::new("e1"),
        merchant_id,
        email: "fraud@evil.com".to_string(),
        status: RuleStatus::Active,
        matches: 0,
    });
    rules
}

#[test]
fn concurrent_increments_lose_nothing() {
    let store = Arc::new(MemoryRuleStore::new());
    store.put_rules(rule_set("m1"));
    let m = MerchantId::new("m1");
    let r = RuleId::new("e1");

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let store = Arc::clone(&store);
            let (m, r) = (m.clone(), r.clone());
            thread::spawn(move || {
                for _ in 0..250 {
                    store.increment_match(&m, &r, 1).unwrap();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(store.matches(&m, &r), Some(2_000));
    assert_eq!(store.increment_calls(), 2_000);
}

#[test]
fn merchants_are_isolated() {
    let store = MemoryRuleStore::new();
    store.put_rules(rule_set("m1"));
    store.put_rules(rule_set("m2"));

    store
        .increment_match(&MerchantId::new("m1"), &RuleId::new("e1"), 3)
        .unwrap();
    assert_eq!(store.matches(&MerchantId::new("m1"), &RuleId::new("e1")), Some(3));
    assert_eq!(store.matches(&MerchantId::new("m2"), &RuleId::new("e1")), Some(0));
}

#[test]
fn revision_never_rewinds() {
    let store = MemoryRuleStore::new();
    assert_eq!(store.put_rules(rule_set("m1")), 1);
    assert_eq!(store.put_rules(rule_set("m1")), 2);

    let mut jumped = rule_set("m1");
    jumped.revision = 10;
    assert_eq!(store.put_rules(jumped), 10);
    assert_eq!(store.put_rules(rule_set("m1")), 11);

    let fetched = store.get_active_rules(&MerchantId::new("m1")).unwrap();
    assert_eq!(fetched.revision, 11);
}

#[test]
fn injected_failures_are_transient() {
    let store = MemoryRuleStore::new();
    store.put_rules(rule_set("m1"));
    store.fail_next_increments(2);

    let m = MerchantId::new("m1");
    let r = RuleId::new("e1");
    for _ in 0..2 {
        let err = store.increment_match(&m, &r, 1).unwrap_err();
        assert!(err.is_retryable());
    }
    store.increment_match(&m, &r, 1).unwrap();
    assert_eq!(store.matches(&m, &r), Some(1));
    assert_eq!(store.increment_calls(), 3);

    let err = store
        .increment_match(&m, &RuleId::new("missing"), 1)
        .unwrap_err();
    assert!(matches!(err, StoreError::UnknownRule { .. }));
    assert!(!err.is_retryable());
}

#[test]
fn edit_keeps_applied_counters() {
    let store = MemoryRuleStore::new();
    store.put_rules(rule_set("m1"));
    let m = MerchantId::new("m1");
    let e1 = RuleId::new("e1");
    store.increment_match(&m, &e1, 1).unwrap();
    assert_eq!(store.matches(&m, &e1), Some(1));

    // Edited set as read before the increment landed: e1 still shows 0.
    let mut edited = rule_set("m1");
    edited.geo_rules.push(GeoRule {
        id: RuleId::new("g1"),
        merchant_id: m.clone(),
        country_code: "US".to_string(),
        action: GeoAction::Block,
        status: RuleStatus::Active,
        matches: 0,
    });
    store.put_rules(edited);

    assert_eq!(store.matches(&m, &e1), Some(1));
    assert_eq!(store.matches(&m, &RuleId::new("g1")), Some(0));

    // A higher incoming value wins.
    let mut bumped = rule_set("m1");
    bumped.email_blacklist[0].matches = 7;
    store.put_rules(bumped);
    assert_eq!(store.matches(&m, &e1), Some(7));

    // Removed rules take their counters with them.
    store.put_rules(RuleSet::empty(m.clone()));
    assert_eq!(store.matches(&m, &e1), None);
}
