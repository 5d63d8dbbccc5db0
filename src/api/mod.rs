//! Marksboard REST API
//!
//! The backend the REST store adapter talks to, built with Axum.
//!
//! # Endpoints
//!
//! ## Students
//! - `POST /api/students` - Store a record (`{name, marks}`)
//! - `GET /api/students` - All records, oldest first
//! - `GET /api/top-performers?limit=N` - Highest marks first (default 5)
//!
//! ## Health
//! - `GET /health/live` - Liveness probe
//! - `GET /health/ready` - Readiness probe
//! - `GET /health` - Full health status
//!
//! Every `/api` response is an envelope: `{success, data?, message?, error?}`.
//!
//! # Example
//!
//! ```rust,ignore
//! use marksboard::api::{serve, ApiConfig, AppState};
//! use marksboard::store::MemoryStore;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ApiConfig::default();
//!     let state = AppState::new(Arc::new(MemoryStore::new()), config.clone());
//!     serve(state, &config).await?;
//!     Ok(())
//! }
//! ```

pub mod dto;
pub mod error;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use state::{ApiConfig, AppState};

use axum::{
    extract::DefaultBodyLimit,
    http::Uri,
    routing::{get, post},
    Router,
};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::store::{DocumentConfig, DocumentStore, MemoryStore, RecordStore, StoreError, StoreKind, StoreResult};

/// Build the API router with all routes and middleware
pub fn build_router(state: AppState) -> Router {
    let max_body_size = state.config.max_body_size;

    let api_routes = Router::new()
        .route(
            "/students",
            post(routes::students::create_student).get(routes::students::list_students),
        )
        .route("/top-performers", get(routes::students::top_performers))
        .layer(DefaultBodyLimit::max(max_body_size));

    let health_routes = Router::new()
        .route("/live", get(routes::health::liveness))
        .route("/ready", get(routes::health::readiness))
        .route("/", get(routes::health::full_health));

    let shared_state = Arc::new(state);

    Router::new()
        .nest("/api", api_routes)
        .nest("/health", health_routes)
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        // The dashboard may be served from any origin
        .layer(CorsLayer::permissive())
        .with_state(shared_state)
}

async fn not_found(uri: Uri) -> ApiError {
    ApiError::NotFound(uri.path().to_string())
}

/// Open the store the server keeps records in
///
/// `rest` is refused: the server would be proxying to itself.
pub fn backing_store(kind: StoreKind, document: &DocumentConfig) -> StoreResult<Arc<dyn RecordStore>> {
    match kind {
        StoreKind::Memory => Ok(Arc::new(MemoryStore::new())),
        StoreKind::Document => Ok(Arc::new(DocumentStore::new(document.clone())?)),
        StoreKind::Rest => Err(StoreError::Config(
            "api.backing must be memory or document".to_string(),
        )),
    }
}

/// Start the API server and run until Ctrl-C or SIGTERM
pub async fn serve(state: AppState, config: &ApiConfig) -> ApiResult<()> {
    let addr = config.addr();
    let listener = TcpListener::bind(&addr).await?;

    tracing::info!(addr = %addr, backing = %state.store.kind(), "Marksboard API listening");

    serve_on(listener, state, shutdown_signal()).await?;

    tracing::info!("Marksboard API shut down gracefully");
    Ok(())
}

/// Serve on an already bound listener until `shutdown` resolves
pub async fn serve_on<F>(listener: TcpListener, state: AppState, shutdown: F) -> ApiResult<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let router = build_router(state);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| ApiError::Internal(format!("Server error: {}", e)))
}

/// Wait for shutdown signal
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testing::RecordingStore;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::util::ServiceExt;

    fn create_test_app() -> (Router, Arc<RecordingStore>) {
        let store = Arc::new(RecordingStore::pull());
        let state = AppState::new(store.clone(), ApiConfig::default());
        (build_router(state), store)
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_student(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/students")
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_health_live() {
        let (app, _store) = create_test_app();
        let response = app.oneshot(get("/health/live")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_health_ready_follows_store() {
        let (app, store) = create_test_app();
        let response = app.clone().oneshot(get("/health/ready")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        store.fail_lists(true);
        let response = app.oneshot(get("/health/ready")).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_health_full() {
        let (app, _store) = create_test_app();
        let response = app.oneshot(get("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["backing"], "rest");
    }

    #[tokio::test]
    async fn test_create_student() {
        let (app, store) = create_test_app();

        let response = app
            .oneshot(post_student(r#"{"name": "Ava", "marks": 87}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        let json = body_json(response).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["message"], "Data stored successfully");
        assert_eq!(json["data"]["name"], "Ava");
        assert_eq!(json["data"]["marks"], 87.0);
        assert!(json["data"]["timestamp"]["seconds"].is_i64());
        assert_eq!(store.create_count(), 1);
    }

    #[tokio::test]
    async fn test_create_student_validation_envelope() {
        let (app, store) = create_test_app();

        let response = app
            .oneshot(post_student(r#"{"name": "Bo", "marks": 150}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(
            json,
            serde_json::json!({
                "success": false,
                "error": "Marks must be a number between 0 and 100"
            })
        );
        assert_eq!(store.create_count(), 0);
    }

    #[tokio::test]
    async fn test_create_student_invalid_json() {
        let (app, _store) = create_test_app();

        let response = app.oneshot(post_student("not json")).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["success"], false);
        assert!(json["error"].as_str().unwrap().starts_with("Invalid request"));
    }

    #[tokio::test]
    async fn test_store_failure_is_503() {
        let (app, store) = create_test_app();
        store.fail_creates(true);

        let response = app
            .oneshot(post_student(r#"{"name": "Ava", "marks": 87}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body_json(response).await["success"], false);
    }

    #[tokio::test]
    async fn test_list_students_oldest_first() {
        let (app, store) = create_test_app();
        store.seed("first", 10.0).await;
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        store.seed("second", 20.0).await;

        let response = app.oneshot(get("/api/students")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["data"][0]["name"], "first");
        assert_eq!(json["data"][1]["name"], "second");
    }

    #[tokio::test]
    async fn test_top_performers_limit() {
        let (app, store) = create_test_app();
        for (name, marks) in [("a", 50.0), ("b", 95.0), ("c", 70.0)] {
            store.seed(name, marks).await;
        }

        let response = app
            .clone()
            .oneshot(get("/api/top-performers?limit=2"))
            .await
            .unwrap();
        let json = body_json(response).await;
        let names: Vec<_> = json["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["name"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["b", "c"]);

        let response = app
            .clone()
            .oneshot(get("/api/top-performers?limit=0"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app
            .oneshot(get("/api/top-performers?limit=abc"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["success"], false);
    }

    #[tokio::test]
    async fn test_unknown_route_is_enveloped_404() {
        let (app, _store) = create_test_app();
        let response = app.oneshot(get("/api/v1/metrics")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["success"], false);
    }

    #[test]
    fn test_rest_backing_refused() {
        assert!(matches!(
            backing_store(StoreKind::Rest, &DocumentConfig::default()),
            Err(StoreError::Config(_))
        ));
        assert!(backing_store(StoreKind::Memory, &DocumentConfig::default()).is_ok());
    }
}
