use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::{Expr, Index};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectOptions, ConnectionTrait, Database, DatabaseConnection,
    DbErr, EntityTrait, NotSet, QueryFilter, QueryOrder, Schema, Set, SqlErr, Value,
};
use tracing::{debug, info};

use crate::catalog::{CatalogError, CatalogRow, CatalogScope, CatalogStore, NewCatalogRow};
use crate::db::entities::catalog_row;
use crate::resources::{AttrValue, AttributeSet, Field};

pub const CATALOG_UNIQUE_INDEX: &str = "idx_catalog_rows_user_kind_key";

/// `CatalogStore` over the relational metadata store.
#[derive(Debug)]
pub struct DbCatalogStore {
    db: DatabaseConnection,
}

impl DbCatalogStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, DbErr> {
        let mut opt = ConnectOptions::new(database_url.to_owned());
        opt.max_connections(max_connections).sqlx_logging(false);
        let db = Database::connect(opt).await?;
        Ok(Self::new(db))
    }

    pub fn into_connection(self) -> DatabaseConnection {
        self.db
    }

    /// Creates `catalog_rows` and its `(user_id, kind, natural_key)` unique index if missing.
    pub async fn ensure_schema(&self) -> Result<(), DbErr> {
        let backend = self.db.get_database_backend();
        let schema = Schema::new(backend);

        let mut table = schema.create_table_from_entity(catalog_row::Entity);
        table.if_not_exists();
        self.db.execute(backend.build(&table)).await?;

        let index = Index::create()
            .name(CATALOG_UNIQUE_INDEX)
            .table(catalog_row::Entity)
            .col(catalog_row::Column::UserId)
            .col(catalog_row::Column::Kind)
            .col(catalog_row::Column::NaturalKey)
            .unique()
            .if_not_exists()
            .to_owned();
        self.db.execute(backend.build(&index)).await?;

        info!(table = "catalog_rows", "Catalog schema ready.");
        Ok(())
    }
}

fn column_for(field: Field) -> catalog_row::Column {
    match field {
        Field::Name => catalog_row::Column::Name,
        Field::Cores => catalog_row::Column::Cores,
        Field::MemoryMb => catalog_row::Column::MemoryMb,
        Field::Status => catalog_row::Column::Status,
        Field::DiskPath => catalog_row::Column::DiskPath,
        Field::IsoPath => catalog_row::Column::IsoPath,
        Field::SizeGb => catalog_row::Column::SizeGb,
        Field::Content => catalog_row::Column::Content,
        Field::Repository => catalog_row::Column::Repository,
        Field::Tag => catalog_row::Column::Tag,
        Field::SizeBytes => catalog_row::Column::SizeBytes,
        Field::Image => catalog_row::Column::Image,
    }
}

fn value_for(value: &AttrValue) -> Value {
    match value {
        AttrValue::Int(v) => Value::from(*v),
        AttrValue::Text(v) => Value::from(v.clone()),
    }
}

fn attribute_of(model: &catalog_row::Model, field: Field) -> AttrValue {
    match field {
        Field::Name => AttrValue::Text(model.name.clone()),
        Field::Cores => AttrValue::Int(model.cores),
        Field::MemoryMb => AttrValue::Int(model.memory_mb),
        Field::Status => AttrValue::Text(model.status.clone()),
        Field::DiskPath => AttrValue::Text(model.disk_path.clone()),
        Field::IsoPath => AttrValue::Text(model.iso_path.clone()),
        Field::SizeGb => AttrValue::Int(model.size_gb),
        Field::Content => AttrValue::Text(model.content.clone()),
        Field::Repository => AttrValue::Text(model.repository.clone()),
        Field::Tag => AttrValue::Text(model.tag.clone()),
        Field::SizeBytes => AttrValue::Int(model.size_bytes),
        Field::Image => AttrValue::Text(model.image.clone()),
    }
}

impl From<catalog_row::Model> for CatalogRow {
    fn from(model: catalog_row::Model) -> Self {
        let mut attributes = AttributeSet::new();
        for field in Field::mirrored_by(model.kind) {
            attributes.insert(*field, attribute_of(&model, *field));
        }
        CatalogRow {
            id: model.id,
            user_id: model.user_id,
            kind: model.kind,
            local_id: model.local_id,
            name: model.name,
            format: model.format,
            path: model.path,
            attributes,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

fn scoped(scope: CatalogScope) -> sea_orm::Condition {
    sea_orm::Condition::all()
        .add(catalog_row::Column::UserId.eq(scope.user_id))
        .add(catalog_row::Column::Kind.eq(scope.kind))
}

#[async_trait]
impl CatalogStore for DbCatalogStore {
    async fn list(&self, scope: CatalogScope) -> Result<Vec<CatalogRow>, CatalogError> {
        let models = catalog_row::Entity::find()
            .filter(scoped(scope))
            .order_by_asc(catalog_row::Column::Id)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(CatalogRow::from).collect())
    }

    async fn create(&self, scope: CatalogScope, row: NewCatalogRow) -> Result<CatalogRow, CatalogError> {
        let canonical = row.key.canonical();
        let columns = row.key.columns();
        let now = Utc::now();

        let mut active = catalog_row::ActiveModel {
            id: NotSet,
            user_id: Set(scope.user_id),
            kind: Set(scope.kind),
            natural_key: Set(canonical.clone()),
            local_id: Set(columns.local_id),
            name: Set(columns.name),
            format: Set(columns.format),
            path: Set(columns.path),
            cores: Set(None),
            memory_mb: Set(None),
            status: Set(None),
            disk_path: Set(None),
            iso_path: Set(None),
            size_gb: Set(None),
            content: Set(None),
            repository: Set(None),
            tag: Set(None),
            size_bytes: Set(None),
            image: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };
        for (field, value) in row.attributes.iter() {
            active.set(column_for(*field), value_for(value));
        }

        match active.insert(&self.db).await {
            Ok(model) => {
                debug!(row_id = model.id, key = %canonical, "Inserted catalog row.");
                Ok(model.into())
            }
            Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                Err(CatalogError::Conflict(canonical))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn update(&self, scope: CatalogScope, row_id: i32, changes: &AttributeSet) -> Result<(), CatalogError> {
        if changes.is_empty() {
            return Ok(());
        }

        let mut query = catalog_row::Entity::update_many();
        for (field, value) in changes.iter() {
            query = query.col_expr(column_for(*field), Expr::value(value_for(value)));
        }
        let result = query
            .col_expr(catalog_row::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(catalog_row::Column::Id.eq(row_id))
            .filter(scoped(scope))
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(CatalogError::NotFound(row_id));
        }
        Ok(())
    }

    async fn delete(&self, scope: CatalogScope, row_id: i32) -> Result<(), CatalogError> {
        let result = catalog_row::Entity::delete_many()
            .filter(catalog_row::Column::Id.eq(row_id))
            .filter(scoped(scope))
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(CatalogError::NotFound(row_id));
        }
        Ok(())
    }
}
