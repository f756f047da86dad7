//! Execution units: one task, one isolated context, one outcome.
//!
//! [`spawn`] moves the task into its own Tokio task and hands back a
//! [`UnitHandle`]. The only things crossing the boundary are the task going
//! in and a single outcome message coming out over a oneshot channel.
//! [`UnitHandle::join`] waits for the unit to fully terminate and always
//! yields exactly one [`TaskResult`]: a panic, an abort, or a unit that
//! exits without sending anything all become failures.

use std::any::Any;
use std::sync::Arc;

use conveyor_core::task::{Task, TaskOutput, TaskResult};
use conveyor_core::types::TaskId;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::executor::{ExecutionError, Executor};

type Outcome = Result<TaskOutput, ExecutionError>;

/// A running execution unit.
pub struct UnitHandle {
    task_id: TaskId,
    join: JoinHandle<()>,
    outcome: oneshot::Receiver<Outcome>,
}

/// Start `task` on `executor` in an isolated context.
pub fn spawn(executor: Arc<dyn Executor>, task: Task) -> UnitHandle {
    let task_id = task.task_id.clone();
    let (tx, rx) = oneshot::channel();

    let join = tokio::spawn(async move {
        let outcome = executor.execute(task).await;
        // The coordinator may have stopped listening; nothing to do then.
        let _ = tx.send(outcome);
    });

    UnitHandle {
        task_id,
        join,
        outcome: rx,
    }
}

impl UnitHandle {
    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    /// Wait for the unit to terminate and collect its single outcome.
    pub async fn join(self) -> TaskResult {
        let UnitHandle {
            task_id,
            join,
            outcome,
        } = self;

        if let Err(e) = join.await {
            let err = if e.is_panic() {
                ExecutionError::Panicked(panic_message(e.into_panic()))
            } else {
                ExecutionError::Aborted
            };
            return failed(task_id, err);
        }

        match outcome.await {
            Ok(Ok(output)) => {
                tracing::info!(task_id = %task_id, "Task completed");
                TaskResult::success(task_id, output)
            }
            Ok(Err(err)) => failed(task_id, err),
            Err(_) => failed(task_id, ExecutionError::NoOutcome),
        }
    }
}

fn failed(task_id: TaskId, err: ExecutionError) -> TaskResult {
    if err.is_abnormal() {
        tracing::error!(task_id = %task_id, error = %err, "Execution unit terminated abnormally");
    } else {
        tracing::warn!(task_id = %task_id, error = %err, "Task failed");
    }
    TaskResult::failure(task_id, err.to_string())
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use conveyor_core::task::TaskOutcome;

    use super::*;
    use crate::simulated::SimulatedExecutor;

    struct Panicking;

    #[async_trait]
    impl Executor for Panicking {
        fn name(&self) -> &'static str {
            "panicking"
        }

        async fn execute(&self, _task: Task) -> Result<TaskOutput, ExecutionError> {
            panic!("boom");
        }
    }

    struct Refusing;

    #[async_trait]
    impl Executor for Refusing {
        fn name(&self) -> &'static str {
            "refusing"
        }

        async fn execute(&self, task: Task) -> Result<TaskOutput, ExecutionError> {
            Err(ExecutionError::Failed(format!("refused {}", task.task_id)))
        }
    }

    fn task(id: &str) -> Task {
        Task::new(id, serde_json::Value::Null)
    }

    #[tokio::test]
    async fn success_is_correlated_to_task() {
        let executor = Arc::new(SimulatedExecutor::new(std::time::Duration::from_millis(1)));
        let unit = spawn(executor, task("t1"));
        assert_eq!(unit.task_id(), "t1");

        let result = unit.join().await;

        assert_eq!(result.task_id, "t1");
        assert!(!result.is_failure());
    }

    #[tokio::test]
    async fn panic_becomes_failure_result() {
        let result = spawn(Arc::new(Panicking), task("t2")).join().await;

        assert_eq!(result.task_id, "t2");
        match result.outcome {
            TaskOutcome::Failure(reason) => assert!(reason.contains("boom"), "{reason}"),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn explicit_error_becomes_failure_result() {
        let result = spawn(Arc::new(Refusing), task("t3")).join().await;

        assert_eq!(
            result.outcome,
            TaskOutcome::Failure("Task failed: refused t3".to_string())
        );
    }
}
