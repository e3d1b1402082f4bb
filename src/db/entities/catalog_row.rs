use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::db::enums::ResourceKind;

/// One mirrored local resource owned by a user.
///
/// `natural_key` holds the canonical form of the row's natural key and backs the
/// `(user_id, kind, natural_key)` unique index. It is written, never parsed; the
/// key is always re-derived from the structured key columns.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "catalog_rows")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: i32,
    pub kind: ResourceKind,
    pub natural_key: String,
    // Key-forming columns
    pub local_id: Option<String>,
    pub name: Option<String>,
    pub format: Option<String>,
    pub path: Option<String>,
    // Mirrored attributes
    pub cores: Option<i64>,
    pub memory_mb: Option<i64>,
    pub status: Option<String>,
    pub disk_path: Option<String>,
    pub iso_path: Option<String>,
    pub size_gb: Option<i64>,
    #[sea_orm(column_type = "Text", nullable)]
    pub content: Option<String>,
    pub repository: Option<String>,
    pub tag: Option<String>,
    pub size_bytes: Option<i64>,
    pub image: Option<String>,
    pub created_at: ChronoDateTimeUtc,
    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
