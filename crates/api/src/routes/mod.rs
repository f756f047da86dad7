pub mod health;
pub mod queue;

use axum::routing::get;
use axum::Router;

use crate::state::AppState;
use crate::ws;

/// Build the `/api` route tree.
///
/// ```text
/// /ws                  WebSocket result subscription
///
/// /queue/task          submit a task (POST)
/// /queue/status        backlog size and in-flight task (GET)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/ws", get(ws::ws_handler))
        .nest("/queue", queue::router())
}
