//! Diff-and-apply reconciliation for one resource kind.
//!
//! [`plan`] is pure: it joins the local list and the catalog rows on their
//! natural keys and decides every write up front. [`Reconciler::apply`] then
//! runs the writes concurrently, one record's failure never blocking another.

use futures::stream::{self, StreamExt};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::error::ReconcileError;
use super::natural_key::{self, NaturalKey};
use super::report::ReconcileResult;
use crate::catalog::{CatalogError, CatalogRow, CatalogScope, CatalogStore, NewCatalogRow};
use crate::resources::{AttributeSet, LocalResource, ResourceKind};

pub const DEFAULT_MAX_CONCURRENT_WRITES: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedUpdate {
    pub row_id: i32,
    pub key: NaturalKey,
    pub changes: AttributeSet,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedDelete {
    pub row_id: i32,
    pub key: NaturalKey,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcilePlan {
    pub kind: ResourceKind,
    pub creates: Vec<NewCatalogRow>,
    pub updates: Vec<PlannedUpdate>,
    pub deletes: Vec<PlannedDelete>,
    pub unchanged: usize,
    pub deferred_deletes: usize,
    pub errors: Vec<ReconcileError>,
}

impl ReconcilePlan {
    fn new(kind: ResourceKind) -> Self {
        Self {
            kind,
            creates: Vec::new(),
            updates: Vec::new(),
            deletes: Vec::new(),
            unchanged: 0,
            deferred_deletes: 0,
            errors: Vec::new(),
        }
    }

    pub fn is_noop(&self) -> bool {
        self.creates.is_empty() && self.updates.is_empty() && self.deletes.is_empty()
    }
}

/// Groups local resources by natural key. Returns whether every resource got a key.
fn index_local<'a>(
    kind: ResourceKind,
    local: &'a [LocalResource],
    errors: &mut Vec<ReconcileError>,
) -> (BTreeMap<NaturalKey, Vec<&'a LocalResource>>, bool) {
    let mut by_key: BTreeMap<NaturalKey, Vec<&LocalResource>> = BTreeMap::new();
    let mut complete = true;
    for resource in local {
        if resource.kind() != kind {
            complete = false;
            errors.push(ReconcileError::KeyDerivation {
                message: format!(
                    "{} resource '{}' reported in the {kind} list",
                    resource.kind(),
                    resource.local_ref()
                ),
            });
            continue;
        }
        match natural_key::local_key(resource) {
            Ok(key) => by_key.entry(key).or_default().push(resource),
            Err(e) => {
                complete = false;
                errors.push(ReconcileError::KeyDerivation { message: e.to_string() });
            }
        }
    }
    (by_key, complete)
}

fn index_remote<'a>(
    remote: &'a [CatalogRow],
    errors: &mut Vec<ReconcileError>,
) -> BTreeMap<NaturalKey, Vec<&'a CatalogRow>> {
    let mut by_key: BTreeMap<NaturalKey, Vec<&CatalogRow>> = BTreeMap::new();
    for row in remote {
        match natural_key::row_key(row) {
            Ok(key) => by_key.entry(key).or_default().push(row),
            Err(e) => errors.push(ReconcileError::KeyDerivation { message: e.to_string() }),
        }
    }
    by_key
}

/// Computes the writes that converge `remote` onto `local`.
///
/// Keys that are ambiguous on either side get no writes at all. If any local
/// resource could not be keyed the local set is incomplete, so orphan deletes
/// are deferred instead of issued.
pub fn plan(kind: ResourceKind, local: &[LocalResource], remote: &[CatalogRow]) -> ReconcilePlan {
    let mut plan = ReconcilePlan::new(kind);
    let (mut local_by_key, local_complete) = index_local(kind, local, &mut plan.errors);
    let mut remote_by_key = index_remote(remote, &mut plan.errors);

    // Drop ambiguous keys from both maps so nothing below touches them.
    let ambiguous_local: Vec<NaturalKey> = local_by_key
        .iter()
        .filter(|(_, resources)| resources.len() > 1)
        .map(|(key, _)| key.clone())
        .collect();
    for key in ambiguous_local {
        let resources = local_by_key.remove(&key).unwrap_or_default();
        remote_by_key.remove(&key);
        plan.errors.push(ReconcileError::AmbiguousLocalState {
            key: key.canonical(),
            local_refs: resources.iter().map(|r| r.local_ref().to_string()).collect(),
        });
    }

    let ambiguous_remote: Vec<NaturalKey> = remote_by_key
        .iter()
        .filter(|(_, rows)| rows.len() > 1)
        .map(|(key, _)| key.clone())
        .collect();
    for key in ambiguous_remote {
        let rows = remote_by_key.remove(&key).unwrap_or_default();
        local_by_key.remove(&key);
        plan.errors.push(ReconcileError::AmbiguousRemoteState {
            key: key.canonical(),
            row_ids: rows.iter().map(|r| r.id).collect(),
        });
    }

    for (key, resources) in &local_by_key {
        let attributes = resources[0].attributes();
        match remote_by_key.remove(key) {
            None => plan.creates.push(NewCatalogRow {
                key: key.clone(),
                attributes,
            }),
            Some(rows) => {
                let row = rows[0];
                let changes = attributes.changed_fields(&row.attributes);
                if changes.is_empty() {
                    plan.unchanged += 1;
                } else {
                    plan.updates.push(PlannedUpdate {
                        row_id: row.id,
                        key: key.clone(),
                        changes,
                    });
                }
            }
        }
    }

    // Whatever is left on the remote side has no local counterpart.
    for (key, rows) in remote_by_key {
        if local_complete {
            plan.deletes.push(PlannedDelete {
                row_id: rows[0].id,
                key,
            });
        } else {
            plan.deferred_deletes += 1;
        }
    }

    plan
}

enum WriteOp {
    Create(NewCatalogRow),
    Update(PlannedUpdate),
    Delete(PlannedDelete),
}

enum WriteOutcome {
    Created,
    Updated,
    Deleted,
    Conflict,
    AlreadyConverged,
    Failed(ReconcileError),
}

#[derive(Clone)]
pub struct Reconciler {
    catalog: Arc<dyn CatalogStore>,
    max_concurrent_writes: usize,
}

impl Reconciler {
    pub fn new(catalog: Arc<dyn CatalogStore>) -> Self {
        Self {
            catalog,
            max_concurrent_writes: DEFAULT_MAX_CONCURRENT_WRITES,
        }
    }

    pub fn with_max_concurrent_writes(mut self, limit: usize) -> Self {
        self.max_concurrent_writes = limit.max(1);
        self
    }

    /// Plans and applies one pass for `scope.kind`.
    pub async fn reconcile(
        &self,
        scope: CatalogScope,
        local: &[LocalResource],
        remote: &[CatalogRow],
    ) -> ReconcileResult {
        let plan = plan(scope.kind, local, remote);
        debug!(
            user_id = scope.user_id,
            kind = %scope.kind,
            creates = plan.creates.len(),
            updates = plan.updates.len(),
            deletes = plan.deletes.len(),
            unchanged = plan.unchanged,
            "Reconciliation plan computed."
        );
        self.apply(scope, plan).await
    }

    pub async fn apply(&self, scope: CatalogScope, plan: ReconcilePlan) -> ReconcileResult {
        let mut result = ReconcileResult::new(scope.kind);
        result.unchanged = plan.unchanged;
        result.deferred_deletes = plan.deferred_deletes;
        result.errors = plan.errors;

        if result.deferred_deletes > 0 {
            warn!(
                user_id = scope.user_id,
                kind = %scope.kind,
                deferred = result.deferred_deletes,
                "Local list incomplete; orphan deletes deferred."
            );
        }

        let ops = plan
            .creates
            .into_iter()
            .map(WriteOp::Create)
            .chain(plan.updates.into_iter().map(WriteOp::Update))
            .chain(plan.deletes.into_iter().map(WriteOp::Delete));

        let outcomes: Vec<WriteOutcome> = stream::iter(ops)
            .map(|op| self.execute(scope, op))
            .buffer_unordered(self.max_concurrent_writes)
            .collect()
            .await;

        for outcome in outcomes {
            match outcome {
                WriteOutcome::Created => result.created += 1,
                WriteOutcome::Updated => result.updated += 1,
                WriteOutcome::Deleted => result.deleted += 1,
                WriteOutcome::Conflict => result.conflicts += 1,
                WriteOutcome::AlreadyConverged => result.already_converged += 1,
                WriteOutcome::Failed(e) => result.errors.push(e),
            }
        }

        info!(
            user_id = scope.user_id,
            kind = %scope.kind,
            created = result.created,
            updated = result.updated,
            deleted = result.deleted,
            errors = result.errors.len(),
            "Reconciliation pass finished."
        );
        result
    }

    async fn execute(&self, scope: CatalogScope, op: WriteOp) -> WriteOutcome {
        match op {
            WriteOp::Create(row) => {
                let key = row.key.canonical();
                match self.catalog.create(scope, row).await {
                    Ok(created) => {
                        debug!(row_id = created.id, key = %key, "Catalog row created.");
                        WriteOutcome::Created
                    }
                    Err(CatalogError::Conflict(_)) => {
                        debug!(key = %key, "Create lost a race to an existing row; keeping it.");
                        WriteOutcome::Conflict
                    }
                    Err(e) => {
                        warn!(key = %key, error = %e, "Catalog create failed.");
                        WriteOutcome::Failed(ReconcileError::CreateFailed {
                            key,
                            message: e.to_string(),
                        })
                    }
                }
            }
            WriteOp::Update(update) => {
                match self.catalog.update(scope, update.row_id, &update.changes).await {
                    Ok(()) => {
                        debug!(
                            row_id = update.row_id,
                            fields = ?update.changes.fields(),
                            "Catalog row updated."
                        );
                        WriteOutcome::Updated
                    }
                    Err(CatalogError::NotFound(_)) => WriteOutcome::AlreadyConverged,
                    Err(e) => {
                        warn!(row_id = update.row_id, error = %e, "Catalog update failed.");
                        WriteOutcome::Failed(ReconcileError::UpdateFailed {
                            row_id: update.row_id,
                            key: update.key.canonical(),
                            message: e.to_string(),
                        })
                    }
                }
            }
            WriteOp::Delete(delete) => match self.catalog.delete(scope, delete.row_id).await {
                Ok(()) => {
                    debug!(row_id = delete.row_id, key = %delete.key, "Orphan catalog row deleted.");
                    WriteOutcome::Deleted
                }
                Err(CatalogError::NotFound(_)) => WriteOutcome::AlreadyConverged,
                Err(e) => {
                    warn!(row_id = delete.row_id, error = %e, "Catalog delete failed.");
                    WriteOutcome::Failed(ReconcileError::DeleteFailed {
                        row_id: delete.row_id,
                        key: delete.key.canonical(),
                        message: e.to_string(),
                    })
                }
            },
        }
    }
}
