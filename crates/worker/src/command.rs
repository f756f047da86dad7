//! Subprocess execution units.
//!
//! [`CommandExecutor`] runs each task in its own child process: the task is
//! written to the child's stdin as JSON, and the last non-empty stdout line
//! is parsed as the [`TaskOutput`]. A crash, non-zero exit, or silent exit
//! in the child becomes an [`ExecutionError`]; nothing the child does can
//! touch the parent's memory.

use std::process::Stdio;

use async_trait::async_trait;
use conveyor_core::task::{Task, TaskOutput};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::executor::{ExecutionError, Executor};

/// Runs a configured program once per task.
#[derive(Debug, Clone)]
pub struct CommandExecutor {
    program: String,
    args: Vec<String>,
    envs: Vec<(String, String)>,
}

impl CommandExecutor {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            envs: Vec::new(),
        }
    }

    /// Parse a whitespace-separated command line. Returns `None` if empty.
    ///
    /// There is no quoting or escaping: a program path or argument that
    /// contains spaces cannot be expressed this way. Use [`new`] and
    /// [`arg`] instead.
    ///
    /// [`new`]: CommandExecutor::new
    /// [`arg`]: CommandExecutor::arg
    pub fn from_command_line(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self {
            program,
            args: parts.collect(),
            envs: Vec::new(),
        })
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Set an environment variable for every child.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

#[async_trait]
impl Executor for CommandExecutor {
    fn name(&self) -> &'static str {
        "command"
    }

    async fn execute(&self, task: Task) -> Result<TaskOutput, ExecutionError> {
        let input = serde_json::to_vec(&task).map_err(|e| ExecutionError::Failed(e.to_string()))?;

        // `kill_on_drop(true)` ensures the child dies with the unit.
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .envs(self.envs.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(ExecutionError::Spawn)?;

        if let Some(mut stdin) = child.stdin.take() {
            // Best-effort write; if the child closes stdin early, ignore the error.
            let _ = stdin.write_all(&input).await;
            drop(stdin);
        }

        let output = child.wait_with_output().await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(ExecutionError::NonZeroExit {
                code: output.status.code().unwrap_or(-1),
                stderr,
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let line = stdout
            .lines()
            .rev()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .ok_or(ExecutionError::NoOutcome)?;

        serde_json::from_str(line).map_err(|e| ExecutionError::MalformedOutput(e.to_string()))
    }
}
