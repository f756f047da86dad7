use std::sync::Arc;
use std::time::Duration;

use crate::command::CommandExecutor;
use crate::executor::Executor;
use crate::simulated::{SimulatedExecutor, DEFAULT_PROCESSING_DELAY};

/// Default pause between a unit terminating and the next dispatch.
pub const DEFAULT_DISPATCH_DELAY: Duration = Duration::from_millis(100);

/// Execution configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Artificial processing time of a simulated unit.
    pub processing_delay: Duration,
    /// Pause before dispatching the next backlogged task.
    pub dispatch_delay: Duration,
    /// When set, units run as child processes of this command line.
    pub worker_command: Option<String>,
}

impl WorkerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                  | Default |
    /// |--------------------------|---------|
    /// | `TASK_PROCESSING_MS`     | `2000`  |
    /// | `TASK_DISPATCH_DELAY_MS` | `100`   |
    /// | `TASK_WORKER_COMMAND`    | unset   |
    pub fn from_env() -> Self {
        let processing_ms: u64 = std::env::var("TASK_PROCESSING_MS")
            .unwrap_or_else(|_| "2000".into())
            .parse()
            .expect("TASK_PROCESSING_MS must be a valid u64");

        let dispatch_ms: u64 = std::env::var("TASK_DISPATCH_DELAY_MS")
            .unwrap_or_else(|_| "100".into())
            .parse()
            .expect("TASK_DISPATCH_DELAY_MS must be a valid u64");

        let worker_command = std::env::var("TASK_WORKER_COMMAND")
            .ok()
            .filter(|s| !s.trim().is_empty());

        Self {
            processing_delay: Duration::from_millis(processing_ms),
            dispatch_delay: Duration::from_millis(dispatch_ms),
            worker_command,
        }
    }

    /// Build the executor this configuration selects.
    pub fn executor(&self) -> Arc<dyn Executor> {
        match self
            .worker_command
            .as_deref()
            .and_then(CommandExecutor::from_command_line)
        {
            Some(command) => {
                tracing::info!(program = command.program(), "Using subprocess execution units");
                Arc::new(command)
            }
            None => Arc::new(SimulatedExecutor::new(self.processing_delay)),
        }
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            processing_delay: DEFAULT_PROCESSING_DELAY,
            dispatch_delay: DEFAULT_DISPATCH_DELAY,
            worker_command: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_uses_simulated_executor() {
        let config = WorkerConfig::default();
        assert_eq!(config.executor().name(), "simulated");
        assert_eq!(config.dispatch_delay, Duration::from_millis(100));
    }

    #[test]
    fn worker_command_selects_command_executor() {
        let config = WorkerConfig {
            worker_command: Some("conveyor-worker".to_string()),
            ..WorkerConfig::default()
        };
        assert_eq!(config.executor().name(), "command");
    }
}
