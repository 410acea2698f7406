//! fg-snapshot
//!
//! Immutable rule snapshots: the only thing the evaluator ever sees.
//!
//! Architectural decisions:
//! - INACTIVE rules are filtered at build time; the evaluator never re-checks status
//! - Exact-match sets (emails, IPs) are deduplicated; ordered sequences (geo, domain) keep stored order
//! - Oversized rule sets fail the build (`SnapshotError::TooLarge`), never truncate
//! - `rule_set_hash` is SHA-256 over canonical JSON of everything except `built_at`
//! - Snapshots are shared by `Arc` and superseded, never mutated
//!
//! Building is pure apart from `tracing` output and the store read.

mod builder;
mod hash;
mod transport;
mod types;
mod watermark;

pub use builder::{build_snapshot, BuildLimits, SnapshotBuilder};
pub use hash::{canonical_json, sha256_hex};
pub use transport::{decode_snapshot, encode_snapshot, MemoryTransport, SnapshotTransport};
pub use types::*;
pub use watermark::{FreshnessSignal, SnapshotFreshness, SnapshotWatermark};
