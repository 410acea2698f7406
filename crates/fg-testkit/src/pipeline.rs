//! In-process checkout pipeline.
//!
//! store -> builder -> transport -> watermark -> evaluator -> reconciler
//!
//! - The pipeline holds one snapshot per merchant and only replaces it with a
//!   transport snapshot the watermark accepts.
//! - Checkout never waits on reconciliation; increments run on a detached task.
//! - With no snapshot ever accepted, a checkout evaluates against no rules.
//! - A checkout without an attempt id gets a fresh one, so it counts once.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use fg_config::FraudGateSettings;
use fg_evaluator::{evaluate_with_provenance, CheckoutContext, Evaluation};
use fg_reconcile::{ReconcileReport, ReconcileRequest, Reconciler};
use fg_rules::MerchantId;
use fg_snapshot::{
    MemoryTransport, Snapshot, SnapshotBuilder, SnapshotError, SnapshotFreshness,
    SnapshotTransport, SnapshotWatermark,
};
use fg_store::MemoryRuleStore;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Default)]
struct Held {
    snapshots: BTreeMap<MerchantId, Arc<Snapshot>>,
    watermarks: BTreeMap<MerchantId, SnapshotWatermark>,
}

pub struct CheckoutPipeline {
    store: Arc<MemoryRuleStore>,
    transport: Arc<MemoryTransport>,
    builder: SnapshotBuilder,
    reconciler: Reconciler<MemoryRuleStore>,
    held: Mutex<Held>,
}

pub struct CheckoutOutcome {
    pub evaluation: Evaluation,
    /// `None` when nothing fired.
    pub reconcile: Option<JoinHandle<ReconcileReport>>,
}

impl CheckoutPipeline {
    pub fn new(settings: &FraudGateSettings) -> Self {
        let store = Arc::new(MemoryRuleStore::new());
        Self {
            reconciler: Reconciler::new(
                Arc::clone(&store),
                settings.retry.clone(),
                settings.ledger_capacity,
            ),
            store,
            transport: Arc::new(MemoryTransport::new()),
            builder: SnapshotBuilder::new(settings.build_limits.clone()),
            held: Mutex::new(Held::default()),
        }
    }

    pub fn store(&self) -> &MemoryRuleStore {
        &self.store
    }

    pub fn transport(&self) -> &MemoryTransport {
        &self.transport
    }

    pub fn reconciler(&self) -> &Reconciler<MemoryRuleStore> {
        &self.reconciler
    }

    fn lock(&self) -> MutexGuard<'_, Held> {
        self.held.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Build from the store and publish. On failure the transport keeps
    /// whatever it had.
    pub fn publish(&self, merchant_id: &MerchantId) -> Result<Arc<Snapshot>, SnapshotError> {
        self.builder
            .publish_latest(self.store.as_ref(), self.transport.as_ref(), merchant_id)
    }

    /// Pull the latest transport snapshot through the watermark. Returns the
    /// snapshot now held, which is the previous one if the fetched one was
    /// rejected or the fetch failed.
    pub fn refresh(&self, merchant_id: &MerchantId) -> Option<Arc<Snapshot>> {
        let fetched = match self.transport.fetch_latest(merchant_id) {
            Ok(f) => f,
            Err(e) => {
                warn!(%merchant_id, error = %e, "snapshot fetch failed; keeping held snapshot");
                None
            }
        };

        let mut held = self.lock();
        if let Some(snap) = fetched {
            let verdict = held
                .watermarks
                .entry(merchant_id.clone())
                .or_default()
                .accept(&snap);
            match verdict {
                SnapshotFreshness::Fresh => {
                    held.snapshots.insert(merchant_id.clone(), snap);
                }
                rejected => {
                    warn!(%merchant_id, ?rejected, "snapshot rejected by watermark");
                }
            }
        }
        held.snapshots.get(merchant_id).cloned()
    }

    pub fn held_snapshot(&self, merchant_id: &MerchantId) -> Option<Arc<Snapshot>> {
        self.lock().snapshots.get(merchant_id).cloned()
    }

    /// Evaluate against the held snapshot and fire off counter increments.
    /// Must be called from within a tokio runtime.
    pub fn checkout(&self, merchant_id: &MerchantId, ctx: &CheckoutContext) -> CheckoutOutcome {
        let evaluation = match self.held_snapshot(merchant_id) {
            Some(snap) => evaluate_with_provenance(&snap, ctx),
            None => Evaluation::default(),
        };

        let attempt_id = if ctx.attempt_id.trim().is_empty() {
            let minted = Uuid::new_v4().to_string();
            debug!(%merchant_id, attempt_id = %minted, "checkout without attempt id; minted one");
            minted
        } else {
            ctx.attempt_id.clone()
        };
        let request = ReconcileRequest::from_evaluation(merchant_id.clone(), attempt_id, &evaluation);
        let reconcile = if request.is_empty() {
            None
        } else {
            Some(self.reconciler.spawn(request))
        };

        CheckoutOutcome {
            evaluation,
            reconcile,
        }
    }
}
