//! Route definitions for task submission and queue status.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::queue;
use crate::state::AppState;

/// Routes mounted at `/queue`.
///
/// ```text
/// POST /task    -> submit_task
/// GET  /status  -> get_queue_status
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/task", post(queue::submit_task))
        .route("/status", get(queue::get_queue_status))
}
