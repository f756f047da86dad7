//! Task records, execution outcomes, and the submission contract.
//!
//! A [`Task`] is owned by the queue coordinator while backlogged and moved
//! into an execution unit on dispatch. The unit produces exactly one
//! [`TaskResult`], which the broadcaster stamps into a [`ResultEvent`].

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{TaskId, Timestamp};

/// Text carried by the result event of any failed task.
pub const FAILURE_MESSAGE: &str = "Error processing task";

// ---------------------------------------------------------------------------
// Task
// ---------------------------------------------------------------------------

/// A unit of work accepted into the backlog.
///
/// Serializable so it can cross a process boundary unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub task_id: TaskId,
    /// Opaque payload, passed through unexamined.
    pub data: serde_json::Value,
    pub submitted_at: Timestamp,
}

impl Task {
    /// Create a task stamped with the current time.
    pub fn new(task_id: impl Into<TaskId>, data: serde_json::Value) -> Self {
        Self {
            task_id: task_id.into(),
            data,
            submitted_at: chrono::Utc::now(),
        }
    }

    /// The derived text a successful execution reports for this task.
    pub fn describe(&self) -> String {
        format!("Processed task {} with data: {}", self.task_id, self.data)
    }
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Success value emitted by an execution unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskOutput {
    pub data: String,
    pub processed_at: Timestamp,
}

impl TaskOutput {
    pub fn new(data: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            processed_at: chrono::Utc::now(),
        }
    }
}

/// The single outcome of one execution.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskOutcome {
    Success(TaskOutput),
    /// Failure with an operator-facing reason. The reason is logged, never
    /// shown to subscribers.
    Failure(String),
}

/// Outcome correlated back to the originating task.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskResult {
    pub task_id: TaskId,
    pub outcome: TaskOutcome,
}

impl TaskResult {
    pub fn success(task_id: impl Into<TaskId>, output: TaskOutput) -> Self {
        Self {
            task_id: task_id.into(),
            outcome: TaskOutcome::Success(output),
        }
    }

    pub fn failure(task_id: impl Into<TaskId>, reason: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            outcome: TaskOutcome::Failure(reason.into()),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.outcome, TaskOutcome::Failure(_))
    }
}

// ---------------------------------------------------------------------------
// ResultEvent
// ---------------------------------------------------------------------------

/// The event pushed to every subscriber connected at publish time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultEvent {
    pub task_id: TaskId,
    pub result: String,
    pub completed_at: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<bool>,
}

impl ResultEvent {
    /// Build the subscriber-facing event for `result`, completed at `completed_at`.
    pub fn from_result(result: TaskResult, completed_at: Timestamp) -> Self {
        match result.outcome {
            TaskOutcome::Success(output) => Self {
                task_id: result.task_id,
                result: output.data,
                completed_at,
                error: None,
            },
            TaskOutcome::Failure(_) => Self {
                task_id: result.task_id,
                result: FAILURE_MESSAGE.to_string(),
                completed_at,
                error: Some(true),
            },
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.unwrap_or(false)
    }
}

// ---------------------------------------------------------------------------
// Submission contract
// ---------------------------------------------------------------------------

/// Body of a task submission. Both fields are optional on the wire so a
/// missing `taskId` surfaces as [`CoreError::InvalidRequest`] rather than a
/// deserialization failure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitTask {
    pub task_id: Option<String>,
    pub data: Option<serde_json::Value>,
}

impl SubmitTask {
    /// Validate the submission and split it into identity and payload.
    ///
    /// A missing payload becomes JSON `null`.
    pub fn into_parts(self) -> Result<(TaskId, serde_json::Value), CoreError> {
        match self.task_id {
            Some(id) if !id.is_empty() => Ok((id, self.data.unwrap_or_default())),
            _ => Err(CoreError::InvalidRequest("taskId is required".to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmitStatus {
    Pending,
}

/// Acknowledgement of acceptance. Not a promise of completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAck {
    pub status: SubmitStatus,
    pub task_id: TaskId,
}

impl SubmitAck {
    pub fn pending(task_id: impl Into<TaskId>) -> Self {
        Self {
            status: SubmitStatus::Pending,
            task_id: task_id.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
