use std::sync::Arc;

use conveyor_events::ResultBroadcaster;
use conveyor_worker::QueueHandle;
use tokio_util::task::TaskTracker;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    /// Submission side of the queue coordinator.
    pub queue: QueueHandle,
    /// Result subscriber set (WebSocket clients).
    pub broadcaster: Arc<ResultBroadcaster>,
    /// Live WebSocket connection tasks, awaited during shutdown.
    pub sockets: TaskTracker,
}
