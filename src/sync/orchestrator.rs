use chrono::Utc;
use futures::future::join_all;
use std::sync::Arc;
use tracing::{error, info, instrument};
use uuid::Uuid;

use super::error::{FetchSide, ReconcileError, SyncError};
use super::reconciler::Reconciler;
use super::report::{ReconcileResult, SyncSummary};
use crate::catalog::{CatalogScope, CatalogStore};
use crate::events::{EventBus, SyncEvent};
use crate::inventory::Inventory;
use crate::resources::ResourceKind;

/// Who a sync runs for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Session {
    Anonymous,
    User { user_id: i32 },
}

impl Session {
    pub fn user(user_id: i32) -> Self {
        Session::User { user_id }
    }

    fn user_id(&self) -> Result<i32, SyncError> {
        match self {
            Session::User { user_id } => Ok(*user_id),
            Session::Anonymous => Err(SyncError::NotAuthenticated),
        }
    }
}

/// Runs one reconciliation pass per kind and aggregates the outcome.
pub struct SyncOrchestrator {
    inventory: Inventory,
    catalog: Arc<dyn CatalogStore>,
    reconciler: Reconciler,
    events: EventBus,
}

impl SyncOrchestrator {
    pub fn new(inventory: Inventory, catalog: Arc<dyn CatalogStore>, events: EventBus) -> Self {
        let reconciler = Reconciler::new(catalog.clone());
        Self {
            inventory,
            catalog,
            reconciler,
            events,
        }
    }

    pub fn with_max_concurrent_writes(mut self, limit: usize) -> Self {
        self.reconciler = self.reconciler.with_max_concurrent_writes(limit);
        self
    }

    /// Reconciles every kind for the session's user. Kinds run concurrently and
    /// fail independently; only a missing user fails the whole call.
    #[instrument(skip(self), fields(run_id = tracing::field::Empty))]
    pub async fn sync_all(&self, session: &Session) -> Result<SyncSummary, SyncError> {
        let user_id = session.user_id()?;
        let run_id = Uuid::new_v4();
        tracing::Span::current().record("run_id", tracing::field::display(run_id));
        let started_at = Utc::now();

        let results = join_all(
            ResourceKind::ALL
                .into_iter()
                .map(|kind| self.run_pass(run_id, user_id, kind)),
        )
        .await;

        let summary = SyncSummary::new(user_id, started_at, results);
        let (created, updated, deleted) = summary.totals();
        info!(
            user_id,
            created,
            updated,
            deleted,
            errors = summary.error_count(),
            "Sync finished."
        );
        self.events.publish(SyncEvent::SyncFinished {
            run_id,
            user_id,
            created,
            updated,
            deleted,
            error_count: summary.error_count(),
            has_errors: summary.has_errors,
        });
        Ok(summary)
    }

    /// Reconciles a single kind, e.g. when one view is refreshed.
    pub async fn sync_kind(&self, session: &Session, kind: ResourceKind) -> Result<ReconcileResult, SyncError> {
        let user_id = session.user_id()?;
        Ok(self.run_pass(Uuid::new_v4(), user_id, kind).await)
    }

    async fn run_pass(&self, run_id: Uuid, user_id: i32, kind: ResourceKind) -> ReconcileResult {
        let scope = CatalogScope::new(user_id, kind);
        self.events.publish(SyncEvent::PassStarted { run_id, user_id, kind });

        let (local, remote) = tokio::join!(self.inventory.list(kind), self.catalog.list(scope));

        let result = match (local, remote) {
            (Err(e), _) => {
                error!(user_id, kind = %kind, error = %e, "Local inventory fetch failed; pass aborted.");
                ReconcileResult::fetch_failed(kind, FetchSide::Local, e.to_string())
            }
            (_, Err(e)) => {
                error!(user_id, kind = %kind, error = %e, "Catalog fetch failed; pass aborted.");
                ReconcileResult::fetch_failed(kind, FetchSide::Remote, e.to_string())
            }
            (Ok(local), Ok(remote)) => self.reconciler.reconcile(scope, &local, &remote).await,
        };

        match result.fetch_error() {
            Some(ReconcileError::FetchFailed { message, .. }) => {
                self.events.publish(SyncEvent::PassFailed {
                    run_id,
                    user_id,
                    kind,
                    error: message.clone(),
                });
            }
            _ => {
                self.events.publish(SyncEvent::PassCompleted {
                    run_id,
                    user_id,
                    result: result.clone(),
                });
            }
        }
        result
    }
}
