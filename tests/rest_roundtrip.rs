//! REST adapter against the real API server on an ephemeral port

use axum::{http::StatusCode, routing::get, Json, Router};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use marksboard::api::{serve_on, ApiConfig, AppState};
use marksboard::dashboard::{Dashboard, RefreshStrategy, SubmitError};
use marksboard::store::{MemoryStore, RecordStore, RestConfig, RestStore, StoreError};

async fn spawn_api() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let state = AppState::new(Arc::new(MemoryStore::new()), ApiConfig::default());

    tokio::spawn(serve_on(listener, state, std::future::pending()));
    format!("http://{}/api", addr)
}

async fn spawn_router(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move { axum::serve(listener, router).await });
    format!("http://{}/api", addr)
}

fn rest_store(base_url: String) -> RestStore {
    RestStore::new(RestConfig {
        base_url,
        request_timeout_ms: 5_000,
    })
    .unwrap()
}

#[tokio::test]
async fn test_create_list_and_rank() {
    let store = rest_store(spawn_api().await);

    let created = store.create_record("Ava", 87.0).await.unwrap();
    assert_eq!(created.message.as_deref(), Some("Data stored successfully"));
    let record = created.record.unwrap();
    assert_eq!(record.name, "Ava");
    assert!(!record.id.is_empty());

    store.create_record("Bo", 95.5).await.unwrap();
    store.create_record("Cy", 40.0).await.unwrap();

    let all = store.list_records().await.unwrap();
    let names: Vec<_> = all.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["Ava", "Bo", "Cy"]);

    let top = store.top_performers(2).await.unwrap();
    let names: Vec<_> = top.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["Bo", "Ava"]);
}

#[tokio::test]
async fn test_server_validation_surfaces_as_rejected() {
    let store = rest_store(spawn_api().await);

    let err = store.create_record("Bo", 150.0).await.unwrap_err();
    match err {
        StoreError::Rejected { status, message } => {
            assert_eq!(status, Some(400));
            assert_eq!(message, "Marks must be a number between 0 and 100");
        }
        other => panic!("unexpected error: {other:?}"),
    }

    let err = store.create_record("   ", 50.0).await.unwrap_err();
    assert_eq!(err.to_string(), "Name and marks are required");
}

#[tokio::test]
async fn test_unsuccessful_list_reads_as_empty() {
    let router = Router::new().route(
        "/api/students",
        get(|| async { Json(json!({"success": false, "error": "db offline"})) }),
    );
    let store = rest_store(spawn_router(router).await);

    assert!(store.list_records().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_bare_error_status_reports_code() {
    let router = Router::new().route(
        "/api/students",
        get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
    );
    let store = rest_store(spawn_router(router).await);

    let err = store.list_records().await.unwrap_err();
    assert_eq!(err.to_string(), "Request failed with status code 500");
}

#[tokio::test]
async fn test_unsuccessful_create_without_error_text() {
    let router = Router::new().route(
        "/api/students",
        axum::routing::post(|| async { Json(json!({"success": false})) }),
    );
    let store = rest_store(spawn_router(router).await);

    let err = store.create_record("Ava", 87.0).await.unwrap_err();
    assert_eq!(err.to_string(), "Failed to submit data");
}

#[tokio::test]
async fn test_polling_dashboard_end_to_end() {
    let store: Arc<dyn RecordStore> = Arc::new(rest_store(spawn_api().await));
    let dashboard = Dashboard::new(store, Duration::from_secs(5));
    assert!(matches!(
        dashboard.chart().strategy(),
        RefreshStrategy::Polling { .. }
    ));

    let mut updates = dashboard.chart().watch();
    dashboard.mount();
    updates.changed().await.unwrap();
    assert!(dashboard.chart().state().records.is_empty());

    // Refreshed by the submit, well before the next 5 s tick
    dashboard.submit_input("Ava", "87").await.unwrap();
    let points = dashboard.chart().state().points();
    assert_eq!(points.len(), 1);
    assert_eq!(points[0].name, "Ava");
    assert_eq!(points[0].marks, 87.0);

    // Client-side validation never reaches the server
    let err = dashboard.submit_input("Bo", "150").await.unwrap_err();
    assert!(matches!(err, SubmitError::Validation(_)));
    assert_eq!(dashboard.chart().state().records.len(), 1);

    dashboard.unmount();
}
