//! Snapshot transport collaborator.
//!
//! The real transport is external; it only has to round-trip the snapshot
//! losslessly. `encode_snapshot` / `decode_snapshot` define the JSON payload
//! used by `MemoryTransport` and the CLI. Decoding always verifies integrity.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use fg_rules::MerchantId;

use crate::types::{Snapshot, SnapshotError};

pub trait SnapshotTransport: Send + Sync {
    fn publish(&self, merchant_id: &MerchantId, snapshot: Arc<Snapshot>)
        -> Result<(), SnapshotError>;

    fn fetch_latest(&self, merchant_id: &MerchantId) -> Result<Option<Arc<Snapshot>>, SnapshotError>;
}

pub fn encode_snapshot(snapshot: &Snapshot) -> Result<Vec<u8>, SnapshotError> {
    serde_json::to_vec(snapshot).map_err(|e| SnapshotError::Encode {
        reason: e.to_string(),
    })
}

/// Decode and verify. A payload whose content no longer matches its
/// `rule_set_hash` is rejected.
pub fn decode_snapshot(bytes: &[u8]) -> Result<Snapshot, SnapshotError> {
    let snapshot: Snapshot = serde_json::from_slice(bytes).map_err(|e| SnapshotError::Decode {
        reason: e.to_string(),
    })?;
    snapshot.verify_integrity()?;
    Ok(snapshot)
}

/// In-memory transport that stores the encoded payload, so every fetch goes
/// through the same decode + verify path a remote consumer would.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    payloads: RwLock<BTreeMap<MerchantId, Vec<u8>>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the stored payload bytes directly (tamper scenarios).
    pub fn put_raw(&self, merchant_id: &MerchantId, bytes: Vec<u8>) {
        self.payloads
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(merchant_id.clone(), bytes);
    }

    pub fn raw(&self, merchant_id: &MerchantId) -> Option<Vec<u8>> {
        self.payloads
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(merchant_id)
            .cloned()
    }
}

impl SnapshotTransport for MemoryTransport {
    fn publish(
        &self,
        merchant_id: &MerchantId,
        snapshot: Arc<Snapshot>,
    ) -> Result<(), SnapshotError> {
        if &snapshot.merchant_id != merchant_id {
            return Err(SnapshotError::Transport {
                reason: format!(
                    "snapshot for merchant {} published under {}",
                    snapshot.merchant_id, merchant_id
                ),
            });
        }
        let bytes = encode_snapshot(&snapshot)?;
        self.put_raw(merchant_id, bytes);
        Ok(())
    }

    fn fetch_latest(&self, merchant_id: &MerchantId) -> Result<Option<Arc<Snapshot>>, SnapshotError> {
        match self.raw(merchant_id) {
            Some(bytes) => Ok(Some(Arc::new(decode_snapshot(&bytes)?))),
            None => Ok(None),
        }
    }
}
