//! Snapshot freshness watermark.
//!
//! # Invariants
//!
//! - **Non-decreasing**: a snapshot is accepted only if its `version` is ≥
//!   the last accepted version.
//! - **Same version, same content**: a snapshot with the accepted version but
//!   a different `rule_set_hash` is rejected (fail-closed).
//! - **Watermark advances only on acceptance**.
//! - **Pure, no IO**: the caller decides what to do with a rejection
//!   (normally: keep evaluating with the snapshot it already holds).

use crate::types::Snapshot;

/// Freshness signal from the transport layer: what it believes is current.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FreshnessSignal {
    pub version: u64,
    pub rule_set_hash: String,
}

impl FreshnessSignal {
    pub fn of(snapshot: &Snapshot) -> Self {
        Self {
            version: snapshot.version,
            rule_set_hash: snapshot.rule_set_hash.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SnapshotFreshness {
    Fresh,

    /// Snapshot version is strictly older than the reference.
    Stale { current_version: u64, got_version: u64 },

    /// Same version, different content hash.
    HashMismatch {
        version: u64,
        expected_hash: String,
        got_hash: String,
    },
}

impl SnapshotFreshness {
    pub fn is_fresh(&self) -> bool {
        matches!(self, SnapshotFreshness::Fresh)
    }

    pub fn is_rejected(&self) -> bool {
        !self.is_fresh()
    }

    /// Cross-check a snapshot against a transport freshness signal.
    ///
    /// A snapshot newer than the signal is fresh (the signal lags).
    pub fn against_signal(snapshot: &Snapshot, signal: &FreshnessSignal) -> Self {
        compare(snapshot, signal.version, &signal.rule_set_hash)
    }
}

fn compare(snapshot: &Snapshot, version: u64, hash: &str) -> SnapshotFreshness {
    if snapshot.version < version {
        return SnapshotFreshness::Stale {
            current_version: version,
            got_version: snapshot.version,
        };
    }
    if snapshot.version == version && snapshot.rule_set_hash != hash {
        return SnapshotFreshness::HashMismatch {
            version,
            expected_hash: hash.to_string(),
            got_hash: snapshot.rule_set_hash.clone(),
        };
    }
    SnapshotFreshness::Fresh
}

/// Tracks the last accepted snapshot per consumer.
#[derive(Clone, Debug, Default)]
pub struct SnapshotWatermark {
    last: Option<FreshnessSignal>,
}

impl SnapshotWatermark {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check freshness without advancing the watermark.
    pub fn check(&self, snapshot: &Snapshot) -> SnapshotFreshness {
        match &self.last {
            None => SnapshotFreshness::Fresh,
            Some(last) => compare(snapshot, last.version, &last.rule_set_hash),
        }
    }

    /// Check freshness and advance the watermark if fresh.
    pub fn accept(&mut self, snapshot: &Snapshot) -> SnapshotFreshness {
        let result = self.check(snapshot);
        if result.is_fresh() {
            self.last = Some(FreshnessSignal::of(snapshot));
        }
        result
    }

    pub fn last_accepted(&self) -> Option<&FreshnessSignal> {
        self.last.as_ref()
    }
}
