use fg_rules::{FilterType, GeoAction, RuleCategory, RuleId};
use fg_snapshot::Snapshot;

use crate::types::{CheckoutContext, Evaluation, Finding, NormalizedContext, Violation};

pub const MSG_EMAIL_BLOCKED: &str = "Email not allowed";
pub const MSG_COUNTRY_BLOCKED: &str = "Orders not allowed from your country";
pub const MSG_IP_BLOCKED: &str = "IP address not allowed";
pub const MSG_DOMAIN_BLOCKED: &str = "Email domain not allowed";
pub const MSG_FIRST_ORDER_LIMIT: &str = "Order value exceeds the limit for first orders";
pub const MSG_FIRST_ORDER_FIELDS: &str = "Missing required information for first order";

/// Evaluate a checkout attempt. Violations come back in category precedence
/// order; an empty list means the checkout may proceed.
pub fn evaluate(snapshot: &Snapshot, ctx: &CheckoutContext) -> Vec<Violation> {
    evaluate_with_provenance(snapshot, ctx).into_violations()
}

/// Same as [`evaluate`], keeping the id of the rule behind each violation.
pub fn evaluate_with_provenance(snapshot: &Snapshot, ctx: &CheckoutContext) -> Evaluation {
    let n = ctx.normalized();
    let mut findings = Vec::new();

    for category in RuleCategory::PRECEDENCE {
        match category {
            RuleCategory::EmailBlacklist => check_email(snapshot, &n, &mut findings),
            RuleCategory::Geo => check_geo(snapshot, &n, &mut findings),
            RuleCategory::IpFilter => check_ip(snapshot, &n, &mut findings),
            RuleCategory::DomainFilter => check_domain(snapshot, &n, &mut findings),
            RuleCategory::FirstOrder => check_first_order(snapshot, ctx, &mut findings),
        }
    }

    Evaluation { findings }
}

fn push(out: &mut Vec<Finding>, category: RuleCategory, msg: &str, rule_id: Option<RuleId>) {
    out.push(Finding {
        violation: Violation::new(category, msg),
        rule_id,
    });
}

fn check_email(snap: &Snapshot, n: &NormalizedContext, out: &mut Vec<Finding>) {
    let Some(email) = n.email.as_ref().and_then(|e| e.as_str()) else {
        return;
    };
    if let Some(id) = snap.email_blacklist.get(email) {
        push(out, RuleCategory::EmailBlacklist, MSG_EMAIL_BLOCKED, Some(id.clone()));
    }
}

/// First rule with an equal country decides.
fn check_geo(snap: &Snapshot, n: &NormalizedContext, out: &mut Vec<Finding>) {
    let Some(country) = n.country.as_ref() else {
        return;
    };
    let Some(rule) = snap
        .geo_rules
        .iter()
        .find(|r| r.country_code.matches(country))
    else {
        return;
    };
    match rule.action {
        GeoAction::Block => push(out, RuleCategory::Geo, MSG_COUNTRY_BLOCKED, Some(rule.id.clone())),
        GeoAction::Allow => {}
    }
}

fn check_ip(snap: &Snapshot, n: &NormalizedContext, out: &mut Vec<Finding>) {
    let Some(ip) = n.ip else {
        return;
    };
    if let Some(rule) = snap.blocked_ips.iter().find(|r| r.entry.contains(ip)) {
        push(out, RuleCategory::IpFilter, MSG_IP_BLOCKED, Some(rule.id.clone()));
    }
}

/// First matching entry decides; no match with any whitelist present is a deny.
fn check_domain(snap: &Snapshot, n: &NormalizedContext, out: &mut Vec<Finding>) {
    let Some(domain) = n.domain.as_deref() else {
        return;
    };
    match snap.domain_filters.iter().find(|r| r.pattern.matches(domain)) {
        Some(rule) => match rule.filter_type {
            FilterType::Blacklist => push(
                out,
                RuleCategory::DomainFilter,
                MSG_DOMAIN_BLOCKED,
                Some(rule.id.clone()),
            ),
            FilterType::Whitelist => {}
        },
        None if snap.has_domain_whitelist() => {
            push(out, RuleCategory::DomainFilter, MSG_DOMAIN_BLOCKED, None)
        }
        None => {}
    }
}

fn check_first_order(snap: &Snapshot, ctx: &CheckoutContext, out: &mut Vec<Finding>) {
    if !ctx.is_first_order {
        return;
    }
    let Some(rule) = snap.first_order.as_ref() else {
        return;
    };

    if let (Some(max), Some(total)) = (rule.max_order_value, ctx.order_total.as_ref()) {
        let same_currency = rule.currency.as_deref().map_or(true, |c| total.is_in(c));
        if same_currency && total.amount > max {
            push(out, RuleCategory::FirstOrder, MSG_FIRST_ORDER_LIMIT, Some(rule.id.clone()));
        }
    }

    if !rule.required_fields.is_subset(&ctx.present_fields) {
        push(out, RuleCategory::FirstOrder, MSG_FIRST_ORDER_FIELDS, Some(rule.id.clone()));
    }
}
