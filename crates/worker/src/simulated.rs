use std::time::Duration;

use async_trait::async_trait;
use conveyor_core::task::{Task, TaskOutput};

use crate::executor::{ExecutionError, Executor};

/// Default artificial processing time.
pub const DEFAULT_PROCESSING_DELAY: Duration = Duration::from_secs(2);

/// Wait `delay`, then describe the task. Shared by the in-process executor
/// and the `conveyor-worker` binary.
pub async fn process(task: &Task, delay: Duration) -> TaskOutput {
    tokio::time::sleep(delay).await;
    TaskOutput::new(task.describe())
}

/// Runs tasks in process with a fixed artificial delay.
#[derive(Debug, Clone)]
pub struct SimulatedExecutor {
    delay: Duration,
}

impl SimulatedExecutor {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for SimulatedExecutor {
    fn default() -> Self {
        Self::new(DEFAULT_PROCESSING_DELAY)
    }
}

#[async_trait]
impl Executor for SimulatedExecutor {
    fn name(&self) -> &'static str {
        "simulated"
    }

    async fn execute(&self, task: Task) -> Result<TaskOutput, ExecutionError> {
        Ok(process(&task, self.delay).await)
    }
}
