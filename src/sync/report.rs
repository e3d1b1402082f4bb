use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use super::error::{FetchSide, ReconcileError};
use crate::resources::ResourceKind;

/// Outcome of one reconciliation pass for one kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileResult {
    pub kind: ResourceKind,
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    pub unchanged: usize,
    /// Creates rejected by the uniqueness constraint; the existing row stands.
    pub conflicts: usize,
    /// Updates or deletes whose row was already gone.
    pub already_converged: usize,
    /// Orphan deletions held back because the local list was incomplete.
    pub deferred_deletes: usize,
    pub errors: Vec<ReconcileError>,
}

impl ReconcileResult {
    pub fn new(kind: ResourceKind) -> Self {
        Self {
            kind,
            created: 0,
            updated: 0,
            deleted: 0,
            unchanged: 0,
            conflicts: 0,
            already_converged: 0,
            deferred_deletes: 0,
            errors: Vec::new(),
        }
    }

    pub fn fetch_failed(kind: ResourceKind, side: FetchSide, message: impl Into<String>) -> Self {
        let mut result = Self::new(kind);
        result.errors.push(ReconcileError::FetchFailed {
            side,
            message: message.into(),
        });
        result
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn fetch_error(&self) -> Option<&ReconcileError> {
        self.errors
            .iter()
            .find(|e| matches!(e, ReconcileError::FetchFailed { .. }))
    }

    pub fn writes(&self) -> usize {
        self.created + self.updated + self.deleted
    }
}

/// Aggregate of one `sync_all` run across every kind.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncSummary {
    pub user_id: i32,
    pub per_kind: BTreeMap<ResourceKind, ReconcileResult>,
    pub has_errors: bool,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

impl SyncSummary {
    pub fn new(user_id: i32, started_at: DateTime<Utc>, results: Vec<ReconcileResult>) -> Self {
        let has_errors = results.iter().any(ReconcileResult::has_errors);
        Self {
            user_id,
            per_kind: results.into_iter().map(|r| (r.kind, r)).collect(),
            has_errors,
            started_at,
            completed_at: Utc::now(),
        }
    }

    pub fn error_count(&self) -> usize {
        self.per_kind.values().map(|r| r.errors.len()).sum()
    }

    pub fn totals(&self) -> (usize, usize, usize) {
        self.per_kind.values().fold((0, 0, 0), |(c, u, d), r| {
            (c + r.created, u + r.updated, d + r.deleted)
        })
    }
}
