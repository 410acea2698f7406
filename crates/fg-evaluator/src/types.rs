use fg_rules::{
    normalize_country, normalize_domain, normalize_email, CountryCode, FieldName, Money,
    NormalizedEmail, RuleCategory, RuleId,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::net::IpAddr;

/// Every violation targets the cart as a whole.
pub const VIOLATION_TARGET: &str = "cart";

/// What the checkout runtime knows about the attempt being evaluated.
///
/// All fields are raw; normalization happens once per evaluation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutContext {
    #[serde(default)]
    pub attempt_id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub country_code: Option<String>,
    #[serde(default)]
    pub ip: Option<String>,
    /// Derived from `email` when absent.
    #[serde(default)]
    pub email_domain: Option<String>,
    #[serde(default)]
    pub order_total: Option<Money>,
    #[serde(default)]
    pub is_first_order: bool,
    #[serde(default)]
    pub present_fields: BTreeSet<FieldName>,
}

impl CheckoutContext {
    pub fn new(attempt_id: impl Into<String>) -> Self {
        Self {
            attempt_id: attempt_id.into(),
            ..Self::default()
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_country(mut self, cc: impl Into<String>) -> Self {
        self.country_code = Some(cc.into());
        self
    }

    pub fn with_ip(mut self, ip: impl Into<String>) -> Self {
        self.ip = Some(ip.into());
        self
    }

    pub fn with_email_domain(mut self, domain: impl Into<String>) -> Self {
        self.email_domain = Some(domain.into());
        self
    }

    pub fn with_order_total(mut self, total: Money) -> Self {
        self.order_total = Some(total);
        self
    }

    pub fn first_order(mut self, fields: impl IntoIterator<Item = FieldName>) -> Self {
        self.is_first_order = true;
        self.present_fields = fields.into_iter().collect();
        self
    }

    /// Normalize every matchable field once. Missing or malformed inputs
    /// become `None` and match nothing.
    pub(crate) fn normalized(&self) -> NormalizedContext {
        let email = self
            .email
            .as_deref()
            .map(normalize_email)
            .filter(NormalizedEmail::is_valid);

        let domain = match self.email_domain.as_deref() {
            Some(raw) => Some(normalize_domain(raw)),
            None => email.as_ref().and_then(|e| e.domain()).map(normalize_domain),
        }
        .and_then(|p| p.as_exact().map(str::to_string));

        let country = self
            .country_code
            .as_deref()
            .map(normalize_country)
            .filter(CountryCode::is_valid);

        let ip = self
            .ip
            .as_deref()
            .and_then(|raw| raw.trim().parse::<IpAddr>().ok());

        NormalizedContext {
            email,
            domain,
            country,
            ip,
        }
    }
}

pub(crate) struct NormalizedContext {
    pub email: Option<NormalizedEmail>,
    /// Concrete host name; a wildcard here is treated as absent.
    pub domain: Option<String>,
    pub country: Option<CountryCode>,
    pub ip: Option<IpAddr>,
}

/// A user-visible rule violation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub category: RuleCategory,
    pub message: String,
    pub target: String,
}

impl Violation {
    pub fn new(category: RuleCategory, message: &str) -> Self {
        Self {
            category,
            message: message.to_string(),
            target: VIOLATION_TARGET.to_string(),
        }
    }
}

/// A violation plus the rule that produced it.
///
/// `rule_id` is `None` only for the domain whitelist default deny, where no
/// single rule matched.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub violation: Violation,
    pub rule_id: Option<RuleId>,
}

/// Evaluation result with provenance, in precedence order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evaluation {
    pub findings: Vec<Finding>,
}

impl Evaluation {
    pub fn is_blocked(&self) -> bool {
        !self.findings.is_empty()
    }

    pub fn violations(&self) -> impl Iterator<Item = &Violation> {
        self.findings.iter().map(|f| &f.violation)
    }

    pub fn into_violations(self) -> Vec<Violation> {
        self.findings.into_iter().map(|f| f.violation).collect()
    }

    /// Distinct rule ids that fired, in first-seen order.
    pub fn triggered_rules(&self) -> Vec<RuleId> {
        let mut seen = BTreeSet::new();
        self.findings
            .iter()
            .filter_map(|f| f.rule_id.as_ref())
            .filter(|id| seen.insert((*id).clone()))
            .cloned()
            .collect()
    }
}
