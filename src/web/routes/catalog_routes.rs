use axum::{
    Json, Router,
    extract::{Extension, Path, State},
    routing::get,
};
use std::sync::Arc;

use crate::catalog::{CatalogRow, CatalogScope};
use crate::resources::ResourceKind;
use crate::web::models::AuthenticatedUser;
use crate::web::{AppError, AppState};

/// Rows the caller owns for one kind. Visibility follows ownership only; an
/// empty catalog yields an empty list.
async fn list_catalog_handler(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Path(kind): Path<String>,
) -> Result<Json<Vec<CatalogRow>>, AppError> {
    let kind: ResourceKind = kind.parse()?;
    let rows = app_state
        .catalog
        .list(CatalogScope::new(authenticated_user.id, kind))
        .await?;
    Ok(Json(rows))
}

pub fn create_catalog_router() -> Router<Arc<AppState>> {
    Router::new().route("/{kind}", get(list_catalog_handler))
}
