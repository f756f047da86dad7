//! The executor contract shared by every execution unit.

use async_trait::async_trait;
use conveyor_core::task::{Task, TaskOutput};

/// Errors from a single execution. Every variant ends up as a failure
/// result; none of them stops the coordinator.
#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
    /// The task logic reported an explicit failure.
    #[error("Task failed: {0}")]
    Failed(String),

    /// The isolated context could not be created.
    #[error("Failed to start execution context: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Worker exited with code {code}: {stderr}")]
    NonZeroExit { code: i32, stderr: String },

    #[error("Malformed worker output: {0}")]
    MalformedOutput(String),

    #[error("Worker panicked: {0}")]
    Panicked(String),

    #[error("Worker was aborted")]
    Aborted,

    /// The unit terminated without emitting an outcome.
    #[error("Worker terminated without producing an outcome")]
    NoOutcome,
}

impl ExecutionError {
    /// Whether the unit terminated abnormally, as opposed to reporting a
    /// failure itself.
    pub fn is_abnormal(&self) -> bool {
        !matches!(self, ExecutionError::Failed(_))
    }
}

/// Performs the work of one task.
///
/// Implementations receive the task by value and must not share mutable
/// state with the coordinator; whatever they need comes in through the task
/// and leaves through the returned output.
#[async_trait]
pub trait Executor: Send + Sync + 'static {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    async fn execute(&self, task: Task) -> Result<TaskOutput, ExecutionError>;
}
