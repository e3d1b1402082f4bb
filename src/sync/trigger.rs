//! Coalescing sync requests.
//!
//! UI actions that change local resources request a pass here instead of
//! writing catalog rows themselves. While a request for a user is still queued,
//! further requests for that user fold into it.

use dashmap::DashSet;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::orchestrator::{Session, SyncOrchestrator};

pub const DEFAULT_TRIGGER_CAPACITY: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    Queued,
    Coalesced,
}

#[derive(Debug, Error)]
pub enum TriggerError {
    #[error("Sync worker is no longer running")]
    Closed,
}

#[derive(Debug, Clone)]
pub struct SyncTrigger {
    tx: mpsc::Sender<i32>,
    pending: Arc<DashSet<i32>>,
}

impl SyncTrigger {
    /// Starts the worker that drains requests and runs `sync_all` for each.
    pub fn spawn(orchestrator: Arc<SyncOrchestrator>, capacity: usize) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel::<i32>(capacity);
        let pending = Arc::new(DashSet::new());
        let worker_pending = pending.clone();

        let handle = tokio::spawn(async move {
            info!("Sync trigger worker started.");
            while let Some(user_id) = rx.recv().await {
                // Cleared before running so changes made during this pass queue another.
                worker_pending.remove(&user_id);
                match orchestrator.sync_all(&Session::user(user_id)).await {
                    Ok(summary) if summary.has_errors => {
                        warn!(user_id, errors = summary.error_count(), "Requested sync finished with errors.");
                    }
                    Ok(_) => debug!(user_id, "Requested sync finished."),
                    Err(e) => error!(user_id, error = %e, "Requested sync rejected."),
                }
            }
            info!("Sync trigger channel closed; worker exiting.");
        });

        (Self { tx, pending }, handle)
    }

    pub async fn request(&self, user_id: i32) -> Result<TriggerOutcome, TriggerError> {
        if !self.pending.insert(user_id) {
            debug!(user_id, "Sync already pending; request coalesced.");
            return Ok(TriggerOutcome::Coalesced);
        }
        if self.tx.send(user_id).await.is_err() {
            self.pending.remove(&user_id);
            return Err(TriggerError::Closed);
        }
        Ok(TriggerOutcome::Queued)
    }
}
