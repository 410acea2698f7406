use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use fg_rules::{
    normalize_country, normalize_domain, normalize_email, parse_ip_or_range, DomainPattern,
    IpEntry, MerchantId, RuleSet,
};
use fg_store::RuleStore;
use tracing::{debug, info, warn};

use crate::transport::SnapshotTransport;
use crate::types::{
    Snapshot, SnapshotDomainRule, SnapshotError, SnapshotFirstOrderRule, SnapshotGeoRule,
    SnapshotIpRule, SNAPSHOT_SCHEMA_VERSION,
};

/// Size ceilings for a single snapshot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BuildLimits {
    /// Maximum number of normalized rules across all categories.
    pub max_rules: usize,
    /// Optional ceiling on the JSON-encoded payload size.
    pub max_payload_bytes: Option<usize>,
}

impl BuildLimits {
    pub fn sane_defaults() -> Self {
        Self {
            max_rules: 10_000,
            max_payload_bytes: None,
        }
    }
}

impl Default for BuildLimits {
    fn default() -> Self {
        Self::sane_defaults()
    }
}

/// Build a snapshot for `merchant_id` from a full rule set.
///
/// Rules that are INACTIVE, belong to another merchant, or fail normalization
/// are left out. Fails with [`SnapshotError::TooLarge`] instead of truncating.
pub fn build_snapshot(
    merchant_id: &MerchantId,
    rules: &RuleSet,
    limits: &BuildLimits,
    built_at: DateTime<Utc>,
) -> Result<Snapshot, SnapshotError> {
    let eligible = |status: fg_rules::RuleStatus, owner: &MerchantId| {
        status.is_active() && owner == merchant_id
    };

    // 1) Email blacklist: set semantics, first stored occurrence keeps its id.
    let mut email_blacklist = BTreeMap::new();
    for r in rules
        .email_blacklist
        .iter()
        .filter(|r| eligible(r.status, &r.merchant_id))
    {
        match normalize_email(&r.email).as_str() {
            Some(email) => {
                email_blacklist
                    .entry(email.to_string())
                    .or_insert_with(|| r.id.clone());
            }
            None => debug!(rule_id = %r.id, "dropping malformed blacklist email"),
        }
    }

    // 2) Geo rules: stored order is priority. No dedup.
    let mut geo_rules = Vec::new();
    for r in rules
        .geo_rules
        .iter()
        .filter(|r| eligible(r.status, &r.merchant_id))
    {
        let country_code = normalize_country(&r.country_code);
        if !country_code.is_valid() {
            debug!(rule_id = %r.id, "dropping geo rule with malformed country code");
            continue;
        }
        geo_rules.push(SnapshotGeoRule {
            id: r.id.clone(),
            country_code,
            action: r.action,
        });
    }

    // 3) Blocked IPs: set semantics over the normalized entry.
    let mut seen_ips: BTreeSet<IpEntry> = BTreeSet::new();
    let mut blocked_ips = Vec::new();
    for r in rules
        .blocked_ips
        .iter()
        .filter(|r| eligible(r.status, &r.merchant_id))
    {
        let entry = parse_ip_or_range(&r.address);
        if !entry.is_valid() {
            debug!(rule_id = %r.id, "dropping malformed ip entry");
            continue;
        }
        if seen_ips.insert(entry.clone()) {
            blocked_ips.push(SnapshotIpRule {
                id: r.id.clone(),
                entry,
            });
        }
    }

    // 4) Domain filters: stored order is priority. No dedup.
    let mut domain_filters = Vec::new();
    for r in rules
        .domain_filters
        .iter()
        .filter(|r| eligible(r.status, &r.merchant_id))
    {
        let pattern = normalize_domain(&r.domain);
        if pattern == DomainPattern::Invalid {
            debug!(rule_id = %r.id, "dropping malformed domain filter");
            continue;
        }
        domain_filters.push(SnapshotDomainRule {
            id: r.id.clone(),
            pattern,
            filter_type: r.filter_type,
        });
    }

    // 5) First-order constraint: kept only if it constrains something.
    let first_order = rules
        .first_order
        .as_ref()
        .filter(|r| eligible(r.status, &r.merchant_id))
        .filter(|r| r.max_order_value.is_some() || !r.required_fields.is_empty())
        .map(|r| SnapshotFirstOrderRule {
            id: r.id.clone(),
            max_order_value: r.max_order_value,
            currency: r
                .currency
                .as_deref()
                .map(|c| c.trim().to_ascii_uppercase())
                .filter(|c| !c.is_empty()),
            required_fields: r.required_fields.clone(),
        });

    let mut snapshot = Snapshot {
        schema_version: SNAPSHOT_SCHEMA_VERSION,
        version: rules.revision,
        built_at,
        merchant_id: merchant_id.clone(),
        rule_set_hash: String::new(),
        email_blacklist,
        geo_rules,
        blocked_ips,
        domain_filters,
        first_order,
    };

    let rule_count = snapshot.rule_count();
    if rule_count > limits.max_rules {
        return Err(SnapshotError::TooLarge {
            merchant_id: merchant_id.clone(),
            rule_count,
            max_rules: limits.max_rules,
        });
    }

    snapshot.rule_set_hash = snapshot.compute_hash()?;

    if let Some(max_bytes) = limits.max_payload_bytes {
        let bytes = serde_json::to_vec(&snapshot)
            .map_err(|e| SnapshotError::Encode {
                reason: e.to_string(),
            })?
            .len();
        if bytes > max_bytes {
            return Err(SnapshotError::PayloadTooLarge {
                merchant_id: merchant_id.clone(),
                bytes,
                max_bytes,
            });
        }
    }

    Ok(snapshot)
}

/// Builds snapshots from a rule store and hands them to a transport.
#[derive(Clone, Debug, Default)]
pub struct SnapshotBuilder {
    limits: BuildLimits,
}

impl SnapshotBuilder {
    pub fn new(limits: BuildLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &BuildLimits {
        &self.limits
    }

    /// Read the merchant's rules and build a snapshot stamped with the
    /// current time. No writes to the store.
    pub fn build_from_store(
        &self,
        store: &dyn RuleStore,
        merchant_id: &MerchantId,
    ) -> Result<Snapshot, SnapshotError> {
        let rules = store.get_active_rules(merchant_id)?;
        build_snapshot(merchant_id, &rules, &self.limits, Utc::now())
    }

    /// Build and publish. On any failure nothing is published, so consumers
    /// keep using the previous snapshot.
    pub fn publish_latest(
        &self,
        store: &dyn RuleStore,
        transport: &dyn SnapshotTransport,
        merchant_id: &MerchantId,
    ) -> Result<Arc<Snapshot>, SnapshotError> {
        let snapshot = match self.build_from_store(store, merchant_id) {
            Ok(s) => Arc::new(s),
            Err(e) => {
                warn!(%merchant_id, error = %e, "snapshot build failed; previous snapshot stays current");
                return Err(e);
            }
        };

        transport.publish(merchant_id, Arc::clone(&snapshot))?;
        info!(
            %merchant_id,
            version = snapshot.version,
            rules = snapshot.rule_count(),
            hash = %snapshot.rule_set_hash,
            "snapshot published"
        );
        Ok(snapshot)
    }
}
