use serde::Serialize;
use thiserror::Error;

/// Which side of a pass failed to produce its list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchSide {
    Local,
    Remote,
}

/// Errors recorded inside a reconciliation pass. None of these abort the
/// other kinds; only `FetchFailed` aborts its own kind.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ReconcileError {
    #[error("Failed to fetch {side:?} list: {message}")]
    FetchFailed { side: FetchSide, message: String },
    #[error("Several local resources share key {key}: {local_refs:?}")]
    AmbiguousLocalState { key: String, local_refs: Vec<String> },
    #[error("Several catalog rows share key {key}: {row_ids:?}")]
    AmbiguousRemoteState { key: String, row_ids: Vec<i32> },
    #[error("Could not derive natural key: {message}")]
    KeyDerivation { message: String },
    #[error("Create failed for {key}: {message}")]
    CreateFailed { key: String, message: String },
    #[error("Update failed for row {row_id} ({key}): {message}")]
    UpdateFailed { row_id: i32, key: String, message: String },
    #[error("Delete failed for row {row_id} ({key}): {message}")]
    DeleteFailed { row_id: i32, key: String, message: String },
}

/// Conditions that make a whole sync meaningless.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Sync requires an authenticated user")]
    NotAuthenticated,
}
