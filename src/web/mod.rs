use axum::{
    Router,
    http::Method,
    middleware as axum_middleware,
    routing::get,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::catalog::CatalogStore;
use crate::sync::{SyncOrchestrator, SyncTrigger};

pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;

pub use error::AppError;

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<SyncOrchestrator>,
    pub catalog: Arc<dyn CatalogStore>,
    pub trigger: SyncTrigger,
    pub jwt_secret: String,
}

async fn health_check_handler() -> &'static str {
    "OK"
}

pub fn create_axum_router(app_state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    let api_routes = Router::new()
        .nest("/sync", routes::sync_routes::create_sync_router())
        .nest("/catalog", routes::catalog_routes::create_catalog_router())
        .route_layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            middleware::auth::auth,
        ));

    Router::new()
        .route("/health", get(health_check_handler))
        .nest("/api", api_routes)
        .layer(cors)
        .with_state(app_state)
}
