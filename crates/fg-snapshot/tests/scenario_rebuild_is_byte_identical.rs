//! Scenario: Rebuilding an unchanged rule set is byte-identical except `built_at`
//!
//! # Invariants under test
//!
//! 1. Two builds of the same rule set at different times differ only in `built_at`.
//! 2. The encoded payloads are byte-identical once `built_at` is aligned.
//! 3. `rule_set_hash` does not depend on `built_at`.
//! 4. Any rule edit changes the hash.
//! 5. The JSON payload round-trips losslessly.

use chrono::{Duration, TimeZone, Utc};
use fg_rules::{
    DomainRule, EmailRule, FieldName, FilterType, FirstOrderRule, GeoAction, GeoRule, IpRule,
    MerchantId, RuleId, RuleSet, RuleStatus,
};
use fg_snapshot::{build_snapshot, decode_snapshot, encode_snapshot, BuildLimits};
use rust_decimal_macros::dec;

fn mid() -> MerchantId {
    MerchantId::new("shop-1")
}

fn full_rule_set() -> RuleSet {
    let m = mid();
    let mut rules = RuleSet::empty(m.clone());
    rules.revision = 7;
    for (i, e) in ["z@x.com", "a@x.com", "m@x.com"].iter().enumerate() {
        rules.email_blacklist.push(EmailRule {
            id: RuleId::new(format!("e{i}")),
            merchant_id: m.clone(),
            email: e.to_string(),
            status: RuleStatus::Active,
            matches: 0,
        });
    }
    rules.geo_rules.push(GeoRule {
        id: RuleId::new("g1"),
        merchant_id: m.clone(),
        country_code: "RU".to_string(),
        action: GeoAction::Block,
        status: RuleStatus::Active,
        matches: 0,
    });
    rules.blocked_ips.push(IpRule {
        id: RuleId::new("i1"),
        merchant_id: m.clone(),
        address: "2001:db8::/32".to_string(),
        status: RuleStatus::Active,
        matches: 0,
    });
    rules.domain_filters.push(DomainRule {
        id: RuleId::new("d1"),
        merchant_id: m.clone(),
        domain: "*.mailinator.com".to_string(),
        filter_type: FilterType::Blacklist,
        status: RuleStatus::Active,
        matches: 0,
    });
    rules.first_order = Some(FirstOrderRule {
        id: RuleId::new("f1"),
        merchant_id: m,
        max_order_value: Some(dec!(250.00)),
        currency: Some("EUR".to_string()),
        required_fields: [FieldName::Phone, FieldName::ShippingAddress]
            .into_iter()
            .collect(),
        status: RuleStatus::Active,
        matches: 0,
    });
    rules
}

#[test]
fn rebuild_differs_only_in_built_at() {
    let rules = full_rule_set();
    let t1 = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
    let t2 = t1 + Duration::minutes(5);

    let a = build_snapshot(&mid(), &rules, &BuildLimits::default(), t1).unwrap();
    let mut b = build_snapshot(&mid(), &rules, &BuildLimits::default(), t2).unwrap();

    assert_ne!(a.built_at, b.built_at);
    assert_eq!(a.rule_set_hash, b.rule_set_hash);

    b.built_at = a.built_at;
    assert_eq!(
        encode_snapshot(&a).unwrap(),
        encode_snapshot(&b).unwrap(),
        "payload bytes must be identical apart from built_at"
    );
}

#[test]
fn rule_edit_changes_hash() {
    let rules = full_rule_set();
    let mut edited = rules.clone();
    edited.geo_rules[0].action = GeoAction::Allow;

    let t = Utc::now();
    let a = build_snapshot(&mid(), &rules, &BuildLimits::default(), t).unwrap();
    let b = build_snapshot(&mid(), &edited, &BuildLimits::default(), t).unwrap();
    assert_ne!(a.rule_set_hash, b.rule_set_hash);
}

#[test]
fn payload_round_trips_losslessly() {
    let snap = build_snapshot(&mid(), &full_rule_set(), &BuildLimits::default(), Utc::now())
        .unwrap();
    let bytes = encode_snapshot(&snap).unwrap();
    let back = decode_snapshot(&bytes).unwrap();
    assert_eq!(back, snap);
    assert_eq!(back.version, 7);
}
