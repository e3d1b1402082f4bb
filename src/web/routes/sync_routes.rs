use axum::{
    Json, Router,
    extract::{Extension, Path, State},
    http::StatusCode,
    routing::post,
};
use std::sync::Arc;

use crate::resources::ResourceKind;
use crate::sync::{ReconcileResult, Session, SyncSummary};
use crate::web::models::{AuthenticatedUser, SyncRequestResponse};
use crate::web::{AppError, AppState};

async fn sync_all_handler(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<SyncSummary>, AppError> {
    let summary = app_state
        .orchestrator
        .sync_all(&Session::user(authenticated_user.id))
        .await?;
    Ok(Json(summary))
}

async fn sync_kind_handler(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Path(kind): Path<String>,
) -> Result<Json<ReconcileResult>, AppError> {
    let kind: ResourceKind = kind.parse()?;
    let result = app_state
        .orchestrator
        .sync_kind(&Session::user(authenticated_user.id), kind)
        .await?;
    Ok(Json(result))
}

async fn request_sync_handler(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
) -> Result<(StatusCode, Json<SyncRequestResponse>), AppError> {
    let outcome = app_state.trigger.request(authenticated_user.id).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(SyncRequestResponse::new(authenticated_user.id, outcome)),
    ))
}

pub fn create_sync_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(sync_all_handler))
        .route("/request", post(request_sync_handler))
        .route("/{kind}", post(sync_kind_handler))
}
