//! Sync lifecycle events, published on an injected broadcast bus.
//!
//! Whoever renders toasts or refreshes views subscribes here; nothing in the
//! sync path knows who is listening.

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

use crate::resources::ResourceKind;
use crate::sync::report::ReconcileResult;

pub const DEFAULT_EVENT_CAPACITY: usize = 100;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SyncEvent {
    #[serde(rename_all = "camelCase")]
    PassStarted {
        run_id: Uuid,
        user_id: i32,
        kind: ResourceKind,
    },
    #[serde(rename_all = "camelCase")]
    PassCompleted {
        run_id: Uuid,
        user_id: i32,
        result: ReconcileResult,
    },
    #[serde(rename_all = "camelCase")]
    PassFailed {
        run_id: Uuid,
        user_id: i32,
        kind: ResourceKind,
        error: String,
    },
    #[serde(rename_all = "camelCase")]
    SyncFinished {
        run_id: Uuid,
        user_id: i32,
        created: usize,
        updated: usize,
        deleted: usize,
        error_count: usize,
        has_errors: bool,
    },
}

impl SyncEvent {
    pub fn name(&self) -> &'static str {
        match self {
            SyncEvent::PassStarted { .. } => "pass_started",
            SyncEvent::PassCompleted { .. } => "pass_completed",
            SyncEvent::PassFailed { .. } => "pass_failed",
            SyncEvent::SyncFinished { .. } => "sync_finished",
        }
    }
}

#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<SyncEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.tx.subscribe()
    }

    /// Publishes to current subscribers and returns how many received it.
    pub fn publish(&self, event: SyncEvent) -> usize {
        let name = event.name();
        match self.tx.send(event) {
            Ok(receivers) => {
                debug!(event = name, receivers, "Published sync event.");
                receivers
            }
            Err(_) => {
                debug!(event = name, "No active subscribers, skipping sync event.");
                0
            }
        }
    }
}
