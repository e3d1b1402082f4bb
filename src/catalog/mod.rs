//! Remote catalog: the per-user, per-kind mirror of local resources.
//!
//! [`CatalogStore`] is the seam the reconciler writes through. The production
//! implementation lives in `db::services::catalog_service`; [`memory::MemoryCatalog`]
//! keeps the same uniqueness rules in process.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::DbErr;
use serde::Serialize;
use thiserror::Error;

use crate::resources::{AttributeSet, ResourceKind};
use crate::sync::natural_key::NaturalKey;

pub mod memory;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("A catalog row already exists for {0}")]
    Conflict(String),
    #[error("Catalog row not found: {0}")]
    NotFound(i32),
    #[error("Database error: {0}")]
    DbErr(#[from] DbErr),
    #[error("Catalog unavailable: {0}")]
    Unavailable(String),
}

/// Every catalog call is confined to one user and one resource kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct CatalogScope {
    pub user_id: i32,
    pub kind: ResourceKind,
}

impl CatalogScope {
    pub fn new(user_id: i32, kind: ResourceKind) -> Self {
        Self { user_id, kind }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogRow {
    pub id: i32,
    pub user_id: i32,
    pub kind: ResourceKind,
    pub local_id: Option<String>,
    pub name: Option<String>,
    pub format: Option<String>,
    pub path: Option<String>,
    pub attributes: AttributeSet,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCatalogRow {
    pub key: NaturalKey,
    pub attributes: AttributeSet,
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn list(&self, scope: CatalogScope) -> Result<Vec<CatalogRow>, CatalogError>;

    /// Fails with [`CatalogError::Conflict`] if the scope already holds the key.
    async fn create(&self, scope: CatalogScope, row: NewCatalogRow) -> Result<CatalogRow, CatalogError>;

    /// Writes only the given fields. Fails with [`CatalogError::NotFound`] if the row is gone.
    async fn update(&self, scope: CatalogScope, row_id: i32, changes: &AttributeSet) -> Result<(), CatalogError>;

    /// Fails with [`CatalogError::NotFound`] if the row is already gone.
    async fn delete(&self, scope: CatalogScope, row_id: i32) -> Result<(), CatalogError>;
}
