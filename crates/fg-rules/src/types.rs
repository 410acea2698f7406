use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Merchant identity (stable string assigned by the platform).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MerchantId(pub String);

impl MerchantId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MerchantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Rule identity. Unique per merchant across all categories.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleId(pub String);

impl RuleId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RuleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Only `Active` rules are eligible for matching.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleStatus {
    #[default]
    Active,
    Inactive,
}

impl RuleStatus {
    pub fn is_active(self) -> bool {
        self == RuleStatus::Active
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GeoAction {
    Allow,
    Block,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FilterType {
    Blacklist,
    Whitelist,
}

/// Order fields a first-order rule can require.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldName {
    FirstName,
    LastName,
    Phone,
    Company,
    ShippingAddress,
    BillingAddress,
}

impl FieldName {
    pub fn as_str(self) -> &'static str {
        match self {
            FieldName::FirstName => "first_name",
            FieldName::LastName => "last_name",
            FieldName::Phone => "phone",
            FieldName::Company => "company",
            FieldName::ShippingAddress => "shipping_address",
            FieldName::BillingAddress => "billing_address",
        }
    }
}

/// The closed set of rule categories.
///
/// `PRECEDENCE` is the order in which the evaluator runs the checks and
/// therefore the order violations appear in its output.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleCategory {
    EmailBlacklist,
    Geo,
    IpFilter,
    DomainFilter,
    FirstOrder,
}

impl RuleCategory {
    pub const PRECEDENCE: [RuleCategory; 5] = [
        RuleCategory::EmailBlacklist,
        RuleCategory::Geo,
        RuleCategory::IpFilter,
        RuleCategory::DomainFilter,
        RuleCategory::FirstOrder,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RuleCategory::EmailBlacklist => "EMAIL_BLACKLIST",
            RuleCategory::Geo => "GEO",
            RuleCategory::IpFilter => "IP_FILTER",
            RuleCategory::DomainFilter => "DOMAIN_FILTER",
            RuleCategory::FirstOrder => "FIRST_ORDER",
        }
    }
}

// ---------------------------------------------------------------------------
// Stored rules (as the rule store hands them out, pre-normalization)
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailRule {
    pub id: RuleId,
    pub merchant_id: MerchantId,
    pub email: String,
    #[serde(default)]
    pub status: RuleStatus,
    /// Advisory telemetry. Never an evaluation input.
    #[serde(default)]
    pub matches: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeoRule {
    pub id: RuleId,
    pub merchant_id: MerchantId,
    pub country_code: String,
    pub action: GeoAction,
    #[serde(default)]
    pub status: RuleStatus,
    #[serde(default)]
    pub matches: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpRule {
    pub id: RuleId,
    pub merchant_id: MerchantId,
    /// Exact address or CIDR range, as entered by the merchant.
    pub address: String,
    #[serde(default)]
    pub status: RuleStatus,
    #[serde(default)]
    pub matches: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainRule {
    pub id: RuleId,
    pub merchant_id: MerchantId,
    pub domain: String,
    pub filter_type: FilterType,
    #[serde(default)]
    pub status: RuleStatus,
    #[serde(default)]
    pub matches: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirstOrderRule {
    pub id: RuleId,
    pub merchant_id: MerchantId,
    /// Inclusive ceiling on the first order total.
    #[serde(default)]
    pub max_order_value: Option<Decimal>,
    /// When set, the ceiling only applies to orders in this currency.
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub required_fields: BTreeSet<FieldName>,
    #[serde(default)]
    pub status: RuleStatus,
    #[serde(default)]
    pub matches: u64,
}

/// Live, mutable collection of one merchant's rules as read from the store.
///
/// `revision` is bumped by the store on every edit; snapshots inherit it as
/// their version.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSet {
    pub merchant_id: MerchantId,
    #[serde(default)]
    pub revision: u64,
    #[serde(default)]
    pub email_blacklist: Vec<EmailRule>,
    #[serde(default)]
    pub geo_rules: Vec<GeoRule>,
    #[serde(default)]
    pub blocked_ips: Vec<IpRule>,
    #[serde(default)]
    pub domain_filters: Vec<DomainRule>,
    #[serde(default)]
    pub first_order: Option<FirstOrderRule>,
}

impl RuleSet {
    pub fn empty(merchant_id: MerchantId) -> Self {
        Self {
            merchant_id,
            revision: 0,
            email_blacklist: Vec::new(),
            geo_rules: Vec::new(),
            blocked_ips: Vec::new(),
            domain_filters: Vec::new(),
            first_order: None,
        }
    }

    /// Category of the rule with `id`, if it exists in this set.
    pub fn category_of(&self, id: &RuleId) -> Option<RuleCategory> {
        if self.email_blacklist.iter().any(|r| &r.id == id) {
            return Some(RuleCategory::EmailBlacklist);
        }
        if self.geo_rules.iter().any(|r| &r.id == id) {
            return Some(RuleCategory::Geo);
        }
        if self.blocked_ips.iter().any(|r| &r.id == id) {
            return Some(RuleCategory::IpFilter);
        }
        if self.domain_filters.iter().any(|r| &r.id == id) {
            return Some(RuleCategory::DomainFilter);
        }
        match &self.first_order {
            Some(r) if &r.id == id => Some(RuleCategory::FirstOrder),
            _ => None,
        }
    }

    /// `matches` counter of every rule in the set, keyed by rule id.
    pub fn match_counts(&self) -> BTreeMap<RuleId, u64> {
        let mut out = BTreeMap::new();
        out.extend(self.email_blacklist.iter().map(|r| (r.id.clone(), r.matches)));
        out.extend(self.geo_rules.iter().map(|r| (r.id.clone(), r.matches)));
        out.extend(self.blocked_ips.iter().map(|r| (r.id.clone(), r.matches)));
        out.extend(self.domain_filters.iter().map(|r| (r.id.clone(), r.matches)));
        out.extend(self.first_order.iter().map(|r| (r.id.clone(), r.matches)));
        out
    }

    /// Mutable access to the `matches` counter of the rule with `id`.
    pub fn matches_mut(&mut self, id: &RuleId) -> Option<&mut u64> {
        if let Some(r) = self.email_blacklist.iter_mut().find(|r| &r.id == id) {
            return Some(&mut r.matches);
        }
        if let Some(r) = self.geo_rules.iter_mut().find(|r| &r.id == id) {
            return Some(&mut r.matches);
        }
        if let Some(r) = self.blocked_ips.iter_mut().find(|r| &r.id == id) {
            return Some(&mut r.matches);
        }
        if let Some(r) = self.domain_filters.iter_mut().find(|r| &r.id == id) {
            return Some(&mut r.matches);
        }
        match &mut self.first_order {
            Some(r) if &r.id == id => Some(&mut r.matches),
            _ => None,
        }
    }
}
