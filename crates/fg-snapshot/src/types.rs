use chrono::{DateTime, Utc};
use fg_rules::{
    CountryCode, DomainPattern, FieldName, FilterType, GeoAction, IpEntry, MerchantId, RuleId,
};
use fg_store::StoreError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::hash::{canonical_json, sha256_hex};

/// Bumped whenever the snapshot wire shape changes.
pub const SNAPSHOT_SCHEMA_VERSION: u32 = 1;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotGeoRule {
    pub id: RuleId,
    pub country_code: CountryCode,
    pub action: GeoAction,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotIpRule {
    pub id: RuleId,
    pub entry: IpEntry,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotDomainRule {
    pub id: RuleId,
    pub pattern: DomainPattern,
    pub filter_type: FilterType,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotFirstOrderRule {
    pub id: RuleId,
    pub max_order_value: Option<Decimal>,
    /// Upper-case ISO 4217 code.
    pub currency: Option<String>,
    pub required_fields: BTreeSet<FieldName>,
}

/// Immutable, versioned projection of one merchant's ACTIVE rules.
///
/// Contains only normalized, valid entries. Match counters are never carried.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub schema_version: u32,
    /// Revision of the rule set this snapshot was built from.
    pub version: u64,
    pub built_at: DateTime<Utc>,
    pub merchant_id: MerchantId,
    pub rule_set_hash: String,
    /// normalized email -> rule id (first stored occurrence wins)
    pub email_blacklist: BTreeMap<String, RuleId>,
    pub geo_rules: Vec<SnapshotGeoRule>,
    pub blocked_ips: Vec<SnapshotIpRule>,
    pub domain_filters: Vec<SnapshotDomainRule>,
    pub first_order: Option<SnapshotFirstOrderRule>,
}

/// The hashed portion of a snapshot: everything except `built_at` and the
/// hash itself.
#[derive(Serialize)]
struct HashedContent<'a> {
    schema_version: u32,
    version: u64,
    merchant_id: &'a MerchantId,
    email_blacklist: &'a BTreeMap<String, RuleId>,
    geo_rules: &'a [SnapshotGeoRule],
    blocked_ips: &'a [SnapshotIpRule],
    domain_filters: &'a [SnapshotDomainRule],
    first_order: &'a Option<SnapshotFirstOrderRule>,
}

impl Snapshot {
    /// Recompute the content hash from the snapshot's fields.
    pub fn compute_hash(&self) -> Result<String, SnapshotError> {
        let content = HashedContent {
            schema_version: self.schema_version,
            version: self.version,
            merchant_id: &self.merchant_id,
            email_blacklist: &self.email_blacklist,
            geo_rules: &self.geo_rules,
            blocked_ips: &self.blocked_ips,
            domain_filters: &self.domain_filters,
            first_order: &self.first_order,
        };
        let canonical = canonical_json(&content).map_err(|e| SnapshotError::Encode {
            reason: e.to_string(),
        })?;
        Ok(sha256_hex(canonical.as_bytes()))
    }

    /// Verify `rule_set_hash` against the content. Catches corruption and
    /// edits that left the hash alone; the hash is unkeyed, so an editor who
    /// recomputes it passes.
    pub fn verify_integrity(&self) -> Result<(), SnapshotError> {
        if self.schema_version != SNAPSHOT_SCHEMA_VERSION {
            return Err(SnapshotError::UnsupportedSchema {
                got: self.schema_version,
            });
        }
        let recomputed = self.compute_hash()?;
        if recomputed != self.rule_set_hash {
            return Err(SnapshotError::IntegrityMismatch {
                claimed: self.rule_set_hash.clone(),
                recomputed,
            });
        }
        Ok(())
    }

    /// Number of normalized rules carried.
    pub fn rule_count(&self) -> usize {
        self.email_blacklist.len()
            + self.geo_rules.len()
            + self.blocked_ips.len()
            + self.domain_filters.len()
            + usize::from(self.first_order.is_some())
    }

    /// `true` if any WHITELIST domain entry exists (domain category becomes
    /// default-deny).
    pub fn has_domain_whitelist(&self) -> bool {
        self.domain_filters
            .iter()
            .any(|d| d.filter_type == FilterType::Whitelist)
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SnapshotError {
    /// Normalized rule count exceeds the configured ceiling. The build is
    /// abandoned; the previously published snapshot stays in use.
    TooLarge {
        merchant_id: MerchantId,
        rule_count: usize,
        max_rules: usize,
    },
    /// Encoded payload exceeds the configured byte ceiling.
    PayloadTooLarge {
        merchant_id: MerchantId,
        bytes: usize,
        max_bytes: usize,
    },
    Store(StoreError),
    Encode { reason: String },
    Decode { reason: String },
    UnsupportedSchema { got: u32 },
    IntegrityMismatch { claimed: String, recomputed: String },
    Transport { reason: String },
}

impl SnapshotError {
    pub fn is_too_large(&self) -> bool {
        matches!(
            self,
            SnapshotError::TooLarge { .. } | SnapshotError::PayloadTooLarge { .. }
        )
    }
}

impl std::fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SnapshotError::TooLarge {
                merchant_id,
                rule_count,
                max_rules,
            } => write!(
                f,
                "SNAPSHOT_TOO_LARGE merchant={merchant_id}: {rule_count} rules > max {max_rules}"
            ),
            SnapshotError::PayloadTooLarge {
                merchant_id,
                bytes,
                max_bytes,
            } => write!(
                f,
                "SNAPSHOT_TOO_LARGE merchant={merchant_id}: {bytes} bytes > max {max_bytes}"
            ),
            SnapshotError::Store(e) => write!(f, "snapshot build failed: {e}"),
            SnapshotError::Encode { reason } => write!(f, "snapshot encode failed: {reason}"),
            SnapshotError::Decode { reason } => write!(f, "snapshot decode failed: {reason}"),
            SnapshotError::UnsupportedSchema { got } => write!(
                f,
                "unsupported snapshot schema_version {got} (expected {SNAPSHOT_SCHEMA_VERSION})"
            ),
            SnapshotError::IntegrityMismatch {
                claimed,
                recomputed,
            } => write!(
                f,
                "SNAPSHOT_INTEGRITY_MISMATCH claimed={claimed} recomputed={recomputed}"
            ),
            SnapshotError::Transport { reason } => write!(f, "snapshot transport failed: {reason}"),
        }
    }
}

impl std::error::Error for SnapshotError {}

impl From<StoreError> for SnapshotError {
    fn from(e: StoreError) -> Self {
        SnapshotError::Store(e)
    }
}
