//! Handlers for task submission and queue status.
//!
//! Submission only enqueues: the response acknowledges acceptance, and the
//! task's actual outcome arrives later over the WebSocket result stream.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use conveyor_core::task::SubmitTask;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /api/queue/task
///
/// Validate the submission and append it to the backlog. Returns
/// `{ "status": "pending", "taskId": ... }` without waiting for execution.
pub async fn submit_task(
    State(state): State<AppState>,
    body: Result<Json<SubmitTask>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(input) = body.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let (task_id, data) = input.into_parts()?;

    let ack = state.queue.submit(task_id, data)?;
    tracing::debug!(task_id = %ack.task_id, "Task submission acknowledged");

    Ok(Json(ack))
}

/// GET /api/queue/status
///
/// Returns the backlog length, the in-flight task id, and the number of
/// results published so far.
pub async fn get_queue_status(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let status = state.queue.status().await?;
    Ok(Json(DataResponse { data: status }))
}
