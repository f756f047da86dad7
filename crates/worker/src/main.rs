//! Subprocess execution unit.
//!
//! Reads one JSON task from stdin, performs the simulated work, and prints
//! one JSON output line to stdout. Logs go to stderr so stdout stays a
//! clean result channel. Point `TASK_WORKER_COMMAND` at this binary to run
//! every task in its own process.

use anyhow::Context;
use conveyor_core::task::Task;
use conveyor_worker::{simulated, WorkerConfig};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "conveyor_worker=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = WorkerConfig::from_env();

    let mut input = Vec::new();
    tokio::io::stdin()
        .read_to_end(&mut input)
        .await
        .context("Failed to read task from stdin")?;
    let task: Task = serde_json::from_slice(&input).context("Invalid task JSON on stdin")?;
    tracing::info!(task_id = %task.task_id, "Worker processing task");

    let output = simulated::process(&task, config.processing_delay).await;

    let mut line = serde_json::to_vec(&output).context("Failed to encode output")?;
    line.push(b'\n');
    let mut stdout = tokio::io::stdout();
    stdout.write_all(&line).await?;
    stdout.flush().await?;

    tracing::info!(task_id = %task.task_id, "Worker finished task");
    Ok(())
}
