//! WebSocket message type constants for task lifecycle events.
//!
//! Used by the API crate when framing result events for connected
//! subscribers.

/// A task finished (successfully or not) and its result is being broadcast.
pub const MSG_TYPE_TASK_RESULT: &str = "task-result";
