use anyhow::{Context, Result};
use fg_evaluator::CheckoutContext;
use fg_rules::{
    DomainRule, EmailRule, FieldName, FilterType, FirstOrderRule, GeoAction, GeoRule, IpRule,
    MerchantId, RuleId, RuleSet, RuleStatus,
};
use rust_decimal::Decimal;
use std::fs;

/// Fluent builder for a merchant's stored rules. Every rule is ACTIVE and
/// owned by the builder's merchant unless changed afterwards.
#[derive(Clone, Debug)]
pub struct RuleSetBuilder {
    rules: RuleSet,
}

impl RuleSetBuilder {
    pub fn new(merchant_id: &str) -> Self {
        Self {
            rules: RuleSet::empty(MerchantId::new(merchant_id)),
        }
    }

    fn mid(&self) -> MerchantId {
        self.rules.merchant_id.clone()
    }

    pub fn revision(mut self, revision: u64) -> Self {
        self.rules.revision = revision;
        self
    }

    pub fn email(mut self, id: &str, email: &str) -> Self {
        let merchant_id = self.mid();
        self.rules.email_blacklist.push(EmailRule {
            id: RuleId::new(id),
            merchant_id,
            email: email.to_string(),
            status: RuleStatus::Active,
            matches: 0,
        });
        self
    }

    pub fn geo(mut self, id: &str, country_code: &str, action: GeoAction) -> Self {
        let merchant_id = self.mid();
        self.rules.geo_rules.push(GeoRule {
            id: RuleId::new(id),
            merchant_id,
            country_code: country_code.to_string(),
            action,
            status: RuleStatus::Active,
            matches: 0,
        });
        self
    }

    pub fn ip(mut self, id: &str, address: &str) -> Self {
        let merchant_id = self.mid();
        self.rules.blocked_ips.push(IpRule {
            id: RuleId::new(id),
            merchant_id,
            address: address.to_string(),
            status: RuleStatus::Active,
            matches: 0,
        });
        self
    }

    pub fn domain(mut self, id: &str, domain: &str, filter_type: FilterType) -> Self {
        let merchant_id = self.mid();
        self.rules.domain_filters.push(DomainRule {
            id: RuleId::new(id),
            merchant_id,
            domain: domain.to_string(),
            filter_type,
            status: RuleStatus::Active,
            matches: 0,
        });
        self
    }

    pub fn first_order(
        mut self,
        id: &str,
        max_order_value: Option<Decimal>,
        currency: Option<&str>,
        required_fields: &[FieldName],
    ) -> Self {
        let merchant_id = self.mid();
        self.rules.first_order = Some(FirstOrderRule {
            id: RuleId::new(id),
            merchant_id,
            max_order_value,
            currency: currency.map(str::to_string),
            required_fields: required_fields.iter().copied().collect(),
            status: RuleStatus::Active,
            matches: 0,
        });
        self
    }

    /// Flip a rule (any category) to INACTIVE. Unknown ids are ignored.
    pub fn deactivate(mut self, id: &str) -> Self {
        let id = RuleId::new(id);
        let r = &mut self.rules;
        r.email_blacklist
            .iter_mut()
            .filter(|x| x.id == id)
            .for_each(|x| x.status = RuleStatus::Inactive);
        r.geo_rules
            .iter_mut()
            .filter(|x| x.id == id)
            .for_each(|x| x.status = RuleStatus::Inactive);
        r.blocked_ips
            .iter_mut()
            .filter(|x| x.id == id)
            .for_each(|x| x.status = RuleStatus::Inactive);
        r.domain_filters
            .iter_mut()
            .filter(|x| x.id == id)
            .for_each(|x| x.status = RuleStatus::Inactive);
        if let Some(fo) = r.first_order.as_mut().filter(|fo| fo.id == id) {
            fo.status = RuleStatus::Inactive;
        }
        self
    }

    pub fn build(self) -> RuleSet {
        self.rules
    }
}

pub fn load_rule_set_json(path: &str) -> Result<RuleSet> {
    let s = fs::read_to_string(path).with_context(|| format!("read rule set: {path}"))?;
    serde_json::from_str(&s).context("parse rule set json")
}

pub fn load_context_json(path: &str) -> Result<CheckoutContext> {
    let s = fs::read_to_string(path).with_context(|| format!("read checkout context: {path}"))?;
    serde_json::from_str(&s).context("parse checkout context json")
}
