#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use conveyor_api::config::ServerConfig;
use conveyor_api::router::build_app_router;
use conveyor_api::state::AppState;
use conveyor_events::ResultBroadcaster;
use conveyor_worker::{QueueCoordinator, WorkerConfig};
use http_body_util::BodyExt;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tower::ServiceExt;

/// Build a test `ServerConfig` with safe defaults and fast task execution.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        heartbeat_interval_secs: 30,
        worker: WorkerConfig {
            processing_delay: Duration::from_millis(20),
            dispatch_delay: Duration::ZERO,
            worker_command: None,
        },
    }
}

/// A router plus the state behind it, so tests can observe the queue and
/// subscribe to results directly.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub cancel: CancellationToken,
}

/// Build the full application router with a running queue coordinator.
///
/// Uses the same middleware stack as `main.rs` via `build_app_router`.
pub fn build_test_app() -> TestApp {
    build_test_app_with(test_config())
}

/// Like [`build_test_app`] but with a task processing delay long enough to
/// observe tasks while they are in flight.
pub fn build_slow_test_app() -> TestApp {
    let mut config = test_config();
    config.worker.processing_delay = Duration::from_millis(500);
    build_test_app_with(config)
}

pub fn build_test_app_with(config: ServerConfig) -> TestApp {
    let broadcaster = Arc::new(ResultBroadcaster::new());
    let coordinator = QueueCoordinator::new(
        config.worker.executor(),
        Arc::clone(&broadcaster),
        &config.worker,
    );
    let cancel = CancellationToken::new();
    let (queue, _join) = coordinator.start(cancel.clone());

    let state = AppState {
        config: Arc::new(config.clone()),
        queue,
        broadcaster,
        sockets: TaskTracker::new(),
    };
    let router = build_app_router(state.clone(), &config);

    TestApp {
        router,
        state,
        cancel,
    }
}

pub async fn get(app: &Router, uri: &str) -> Response<Body> {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    app.clone().oneshot(request).await.unwrap()
}

pub async fn post_json(app: &Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    post_raw(app, uri, &body.to_string()).await
}

pub async fn post_raw(app: &Router, uri: &str, body: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.clone().oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
