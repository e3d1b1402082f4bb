use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::atomic::{AtomicI32, Ordering};

use super::{CatalogError, CatalogRow, CatalogScope, CatalogStore, NewCatalogRow};
use crate::resources::{AttributeSet, ResourceKind};

type UniqueKey = (i32, ResourceKind, String);

/// In-process catalog with the same `(user, kind, natural key)` uniqueness rule
/// as the database.
#[derive(Debug)]
pub struct MemoryCatalog {
    rows: DashMap<i32, (String, CatalogRow)>,
    unique: DashMap<UniqueKey, i32>,
    next_id: AtomicI32,
}

impl Default for MemoryCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self {
            rows: DashMap::new(),
            unique: DashMap::new(),
            next_id: AtomicI32::new(1),
        }
    }

    /// Inserts a row without the uniqueness check, for seeding stores that
    /// already violate the invariant.
    pub fn insert_unchecked(&self, mut row: CatalogRow, canonical_key: &str) -> i32 {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        row.id = id;
        self.unique
            .entry((row.user_id, row.kind, canonical_key.to_string()))
            .or_insert(id);
        self.rows.insert(id, (canonical_key.to_string(), row));
        id
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn owned_by(row: &CatalogRow, scope: CatalogScope) -> bool {
        row.user_id == scope.user_id && row.kind == scope.kind
    }
}

#[async_trait]
impl CatalogStore for MemoryCatalog {
    async fn list(&self, scope: CatalogScope) -> Result<Vec<CatalogRow>, CatalogError> {
        let mut rows: Vec<CatalogRow> = self
            .rows
            .iter()
            .filter(|entry| Self::owned_by(&entry.value().1, scope))
            .map(|entry| entry.value().1.clone())
            .collect();
        rows.sort_by_key(|row| row.id);
        Ok(rows)
    }

    async fn create(&self, scope: CatalogScope, row: NewCatalogRow) -> Result<CatalogRow, CatalogError> {
        let canonical = row.key.canonical();
        let slot = match self.unique.entry((scope.user_id, scope.kind, canonical.clone())) {
            Entry::Occupied(_) => return Err(CatalogError::Conflict(canonical)),
            Entry::Vacant(slot) => slot,
        };

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let columns = row.key.columns();
        let now = Utc::now();
        let created = CatalogRow {
            id,
            user_id: scope.user_id,
            kind: scope.kind,
            local_id: columns.local_id,
            name: columns.name,
            format: columns.format,
            path: columns.path,
            attributes: row.attributes,
            created_at: now,
            updated_at: now,
        };
        slot.insert(id);
        self.rows.insert(id, (canonical, created.clone()));
        Ok(created)
    }

    async fn update(
        &self,
        scope: CatalogScope,
        row_id: i32,
        changes: &AttributeSet,
    ) -> Result<(), CatalogError> {
        let mut entry = self
            .rows
            .get_mut(&row_id)
            .filter(|entry| Self::owned_by(&entry.1, scope))
            .ok_or(CatalogError::NotFound(row_id))?;
        let row = &mut entry.1;
        for (field, value) in changes.iter() {
            row.attributes.insert(*field, value.clone());
        }
        row.updated_at = Utc::now();
        Ok(())
    }

    async fn delete(&self, scope: CatalogScope, row_id: i32) -> Result<(), CatalogError> {
        let (canonical, row) = self
            .rows
            .remove_if(&row_id, |_, (_, row)| Self::owned_by(row, scope))
            .map(|(_, value)| value)
            .ok_or(CatalogError::NotFound(row_id))?;
        self.unique
            .remove_if(&(row.user_id, row.kind, canonical), |_, id| *id == row_id);
        Ok(())
    }
}
