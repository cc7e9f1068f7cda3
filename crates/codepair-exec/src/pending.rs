//! Pending request table: correlation id -> outstanding caller continuation.
//!
//! Exactly-once resolution is structural: `resolve` and `abandon` both remove
//! the entry under the table lock, so whichever side removes it first owns
//! delivery and the loser's arrival finds nothing to act on.

use std::collections::HashMap;

use codepair_protocol::{CorrelationId, ExecutionResult};
use tokio::sync::{Mutex, oneshot};
use tracing::{debug, warn};

#[derive(Default)]
pub struct PendingTable {
    entries: Mutex<HashMap<CorrelationId, oneshot::Sender<ExecutionResult>>>,
}

impl PendingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fresh entry and hand back the continuation to await.
    ///
    /// Correlation ids are unique for the process lifetime, so a replaced
    /// entry indicates a bug upstream; the stale continuation is dropped.
    pub async fn register(&self, id: CorrelationId) -> oneshot::Receiver<ExecutionResult> {
        let (tx, rx) = oneshot::channel();
        if self.entries.lock().await.insert(id.clone(), tx).is_some() {
            warn!(correlation_id = %id, "replaced pending entry for duplicate correlation id");
        }
        rx
    }

    /// Deliver a backend reply. Returns `false` when no entry exists (already
    /// resolved by timeout, or never registered) — the caller discards the
    /// reply.
    pub async fn resolve(&self, id: &CorrelationId, result: ExecutionResult) -> bool {
        let Some(tx) = self.entries.lock().await.remove(id) else {
            return false;
        };
        if tx.send(result).is_err() {
            // The caller stopped waiting; the entry was still ours to retire.
            debug!(correlation_id = %id, "caller abandoned execution before resolution");
        }
        true
    }

    /// Timeout path: drop the entry without delivering. Returns `false` when
    /// a reply already won the race.
    pub async fn abandon(&self, id: &CorrelationId) -> bool {
        self.entries.lock().await.remove(id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }
}
