//! Reconciliation engine keeping the remote catalog consistent with the local runtime.

pub mod error;
pub mod natural_key;
pub mod orchestrator;
pub mod reconciler;
pub mod report;
pub mod trigger;

pub use error::{FetchSide, ReconcileError, SyncError};
pub use natural_key::{DiskKey, KeyError, NaturalKey};
pub use orchestrator::{Session, SyncOrchestrator};
pub use reconciler::{ReconcilePlan, Reconciler};
pub use report::{ReconcileResult, SyncSummary};
pub use trigger::{SyncTrigger, TriggerOutcome};
