mod common;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

use common::{FakeAdapter, disk};
use vmconsole::catalog::memory::MemoryCatalog;
use vmconsole::events::EventBus;
use vmconsole::inventory::Inventory;
use vmconsole::resources::ResourceKind;
use vmconsole::sync::{SyncOrchestrator, SyncTrigger};
use vmconsole::web::models::Claims;
use vmconsole::web::{AppState, create_axum_router};

const SECRET: &str = "test-secret";

fn app() -> Router {
    let catalog = Arc::new(MemoryCatalog::new());
    let mut inventory = Inventory::new();
    for kind in ResourceKind::ALL {
        let resources = match kind {
            ResourceKind::Disk => vec![disk("web.qcow2", 20)],
            _ => Vec::new(),
        };
        inventory = inventory.with_adapter(FakeAdapter::new(kind, resources));
    }
    let orchestrator = Arc::new(SyncOrchestrator::new(inventory, catalog.clone(), EventBus::default()));
    let (trigger, _handle) = SyncTrigger::spawn(orchestrator.clone(), 8);

    create_axum_router(Arc::new(AppState {
        orchestrator,
        catalog,
        trigger,
        jwt_secret: SECRET.to_string(),
    }))
}

fn token(user_id: i32, secret: &str) -> String {
    let claims = Claims {
        sub: format!("user{user_id}"),
        user_id,
        exp: (chrono::Utc::now().timestamp() + 3600) as usize,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes())).unwrap()
}

fn request(method: &str, uri: &str, bearer: Option<String>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_needs_no_token() {
    let response = app().oneshot(request("GET", "/health", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn api_rejects_missing_or_forged_tokens() {
    let app = app();

    let response = app.clone().oneshot(request("POST", "/api/sync", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let forged = token(1, "someone-else");
    let response = app
        .oneshot(request("GET", "/api/catalog/disk", Some(forged)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await["error"], "Invalid credentials");
}

#[tokio::test]
async fn unknown_kind_is_a_bad_request() {
    let response = app()
        .oneshot(request("POST", "/api/sync/floppy", Some(token(1, SECRET))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn sync_then_list_shows_only_the_callers_rows() {
    let app = app();

    let response = app
        .clone()
        .oneshot(request("POST", "/api/sync", Some(token(1, SECRET))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let summary = json_body(response).await;
    assert_eq!(summary["userId"], 1);
    assert_eq!(summary["hasErrors"], false);
    assert_eq!(summary["perKind"]["disk"]["created"], 1);

    let response = app
        .clone()
        .oneshot(request("GET", "/api/catalog/disk", Some(token(1, SECRET))))
        .await
        .unwrap();
    let rows = json_body(response).await;
    assert_eq!(rows.as_array().unwrap().len(), 1);
    assert_eq!(rows[0]["name"], "web");
    assert_eq!(rows[0]["format"], "qcow2");

    let response = app
        .oneshot(request("GET", "/api/catalog/disk", Some(token(2, SECRET))))
        .await
        .unwrap();
    assert_eq!(json_body(response).await, serde_json::json!([]));
}

#[tokio::test]
async fn sync_one_kind_returns_its_result() {
    let response = app()
        .oneshot(request("POST", "/api/sync/DISK", Some(token(3, SECRET))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let result = json_body(response).await;
    assert_eq!(result["kind"], "disk");
    assert_eq!(result["created"], 1);
}

#[tokio::test]
async fn sync_request_is_accepted() {
    let response = app()
        .oneshot(request("POST", "/api/sync/request", Some(token(4, SECRET))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let body = json_body(response).await;
    assert_eq!(body["userId"], 4);
    assert!(body["status"] == "queued" || body["status"] == "coalesced");
}
