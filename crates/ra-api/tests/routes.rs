use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use ra_api::{router, AppState};
use ra_core::{Archiver, ContentSource, SourceRegistry, ThreadStore};
use ra_source_demo::DemoSource;
use ra_store_memory::MemoryThreadStore;
use secrecy::SecretString;
use serde_json::Value;
use tower::ServiceExt;

const TOKEN: &str = "letmein";

fn app_with_token(token: &str) -> (Router, Arc<Archiver>) {
    let store: Arc<dyn ThreadStore> = Arc::new(MemoryThreadStore::new());
    let sources = SourceRegistry::new([Arc::new(DemoSource::new()) as Arc<dyn ContentSource>]);
    let archiver = Arc::new(Archiver::new(Arc::clone(&store), sources));
    let state = AppState {
        store,
        archiver: Arc::clone(&archiver),
        admin_token: Arc::new(SecretString::from(token.to_string())),
        default_every: Duration::from_secs(30),
    };
    (router(state), archiver)
}

fn app() -> (Router, Arc<Archiver>) {
    app_with_token(TOKEN)
}

async fn send(app: &Router, method: &str, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("X-Admin-Token", token);
    }
    let response = app
        .clone()
        .oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

#[tokio::test]
async fn health_is_public() {
    let (app, _) = app();
    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
}

#[tokio::test]
async fn unknown_thread_is_404() {
    let (app, _) = app();
    let (status, body) = send(&app, "GET", "/api/thread/404", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not found");
}

#[tokio::test]
async fn admin_routes_require_token() {
    let (app, _) = app();
    let (status, _) = send(&app, "GET", "/api/watches", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = send(&app, "GET", "/api/watches", Some("wrong")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = send(&app, "GET", "/api/watches", Some(TOKEN)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn empty_configured_token_disables_admin_routes() {
    let (app, _) = app_with_token("");
    let (status, _) = send(&app, "GET", "/api/watches", Some("")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn fetch_then_read_back() {
    let (app, _) = app();
    let (status, body) = send(&app, "POST", "/api/fetch/demo/g/42", Some(TOKEN)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["saved_id"], "42");

    let (status, thread) = send(&app, "GET", "/api/thread/42", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(thread["board"], "g");
    assert_eq!(thread["posts"].as_array().unwrap().len(), 2);

    let (status, threads) = send(&app, "GET", "/api/threads/g", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(threads[0]["id"], "42");
}

#[tokio::test]
async fn fetch_from_unknown_source_is_400() {
    let (app, _) = app();
    let (status, body) = send(&app, "POST", "/api/fetch/8chan/g/1", Some(TOKEN)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "unknown source");
}

#[tokio::test]
async fn watch_lifecycle() {
    let (app, archiver) = app();
    let (status, body) = send(&app, "POST", "/api/watch/demo/g/1?every=5m", Some(TOKEN)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["watch"]["every"], "5m");

    // default interval applies when none is given; same key is replaced
    send(&app, "POST", "/api/watch/demo/g/1", Some(TOKEN)).await;
    let (_, watches) = send(&app, "GET", "/api/watches", Some(TOKEN)).await;
    assert_eq!(watches.as_array().unwrap().len(), 1);
    assert_eq!(watches[0]["every"], "30s");
    assert_eq!(archiver.list_watches().await[0].every, Duration::from_secs(30));

    let (_, body) = send(&app, "DELETE", "/api/watch/demo/g/1", Some(TOKEN)).await;
    assert_eq!(body["removed"], true);
    let (_, body) = send(&app, "DELETE", "/api/watch/demo/g/1", Some(TOKEN)).await;
    assert_eq!(body["removed"], false);
}

#[tokio::test]
async fn bad_interval_is_400() {
    let (app, _) = app();
    let (status, _) = send(&app, "POST", "/api/watch/demo/g/1?every=soon", Some(TOKEN)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn negative_interval_registers_zero_interval_watch() {
    let (app, archiver) = app();
    let (status, body) = send(&app, "POST", "/api/watch/demo/g/1?every=-5s", Some(TOKEN)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["watch"]["every"], "0s");
    assert_eq!(archiver.list_watches().await[0].every, Duration::ZERO);
}

#[tokio::test]
async fn fractional_interval_is_accepted() {
    let (app, archiver) = app();
    let (status, body) = send(&app, "POST", "/api/watch/demo/g/1?every=1.5h", Some(TOKEN)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["watch"]["every"], "1h30m");
    assert_eq!(archiver.list_watches().await[0].every, Duration::from_secs(5400));
}

#[tokio::test]
async fn scan_saves_and_optionally_watches() {
    let (app, archiver) = app();
    let (status, body) = send(&app, "POST", "/api/scan/demo/g?limit=2", Some(TOKEN)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["scanned"], 2);
    assert_eq!(body["saved"], 2);
    assert!(archiver.list_watches().await.is_empty());

    let (_, body) = send(&app, "POST", "/api/scan/demo/g?watch=true&every=1m", Some(TOKEN)).await;
    assert_eq!(body["scanned"], 3);
    let watches = archiver.list_watches().await;
    assert_eq!(watches.len(), 3);
    assert!(watches.iter().all(|w| w.every == Duration::from_secs(60)));

    let (_, threads) = send(&app, "GET", "/api/threads/g", None).await;
    assert_eq!(threads.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn sources_are_listed() {
    let (app, _) = app();
    let (_, body) = send(&app, "GET", "/api/sources", None).await;
    assert_eq!(body, serde_json::json!(["demo"]));
}
