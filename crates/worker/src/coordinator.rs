//! Single-flight FIFO queue coordinator.
//!
//! [`QueueCoordinator`] is an actor: a single Tokio task owns the backlog
//! and the in-flight slot, and everything else talks to it through a
//! [`QueueHandle`]. Submissions are appended to the tail; the head is
//! dispatched only when no unit is in flight, so task *k+1* never starts
//! before task *k*'s unit has terminated. Each result is published to the
//! [`ResultBroadcaster`] before the next dispatch.
//!
//! ```text
//! QueueHandle::submit ──► backlog ──► unit::spawn ──► join ──► broadcaster.publish
//!                           ▲                                     │
//!                           └──────────── dispatch next ◄─────────┘
//! ```

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use conveyor_core::task::{SubmitAck, Task, TaskResult};
use conveyor_core::types::TaskId;
use conveyor_events::ResultBroadcaster;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::config::WorkerConfig;
use crate::executor::Executor;
use crate::unit;

/// Errors returned through a [`QueueHandle`].
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("Queue coordinator has stopped")]
    Stopped,
}

/// Point-in-time view of the coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueStatus {
    /// Tasks waiting behind the in-flight one.
    pub backlog: usize,
    pub in_flight: Option<TaskId>,
    /// Results published since startup.
    pub processed: u64,
}

enum Command {
    Submit(Task),
    Status(oneshot::Sender<QueueStatus>),
}

/// Cheaply cloneable handle to a running coordinator.
#[derive(Clone)]
pub struct QueueHandle {
    tx: mpsc::UnboundedSender<Command>,
}

impl QueueHandle {
    /// Append a task to the backlog. Never waits for execution.
    pub fn submit(
        &self,
        task_id: impl Into<TaskId>,
        data: serde_json::Value,
    ) -> Result<SubmitAck, QueueError> {
        let task = Task::new(task_id, data);
        let ack = SubmitAck::pending(task.task_id.clone());
        self.tx
            .send(Command::Submit(task))
            .map_err(|_| QueueError::Stopped)?;
        Ok(ack)
    }

    /// Ask the coordinator for its current state.
    pub async fn status(&self) -> Result<QueueStatus, QueueError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::Status(reply))
            .map_err(|_| QueueError::Stopped)?;
        rx.await.map_err(|_| QueueError::Stopped)
    }
}

/// The in-flight unit, pinned so it can be polled across loop iterations.
struct InFlight {
    task_id: TaskId,
    result: Pin<Box<dyn Future<Output = TaskResult> + Send>>,
}

/// Owns the backlog and drives one execution unit at a time.
pub struct QueueCoordinator {
    executor: Arc<dyn Executor>,
    broadcaster: Arc<ResultBroadcaster>,
    dispatch_delay: Duration,
    backlog: VecDeque<Task>,
    in_flight: Option<InFlight>,
    /// Earliest moment the next dispatch may happen.
    cooldown_until: Option<Instant>,
    processed: u64,
}

impl QueueCoordinator {
    pub fn new(
        executor: Arc<dyn Executor>,
        broadcaster: Arc<ResultBroadcaster>,
        config: &WorkerConfig,
    ) -> Self {
        Self {
            executor,
            broadcaster,
            dispatch_delay: config.dispatch_delay,
            backlog: VecDeque::new(),
            in_flight: None,
            cooldown_until: None,
            processed: 0,
        }
    }

    /// Spawn the coordinator loop.
    ///
    /// The loop exits when `cancel` fires (after the in-flight unit, if any,
    /// has finished and its result was published) or when every
    /// [`QueueHandle`] is dropped and the backlog has drained.
    pub fn start(self, cancel: CancellationToken) -> (QueueHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(self.run(rx, cancel));
        (QueueHandle { tx }, handle)
    }

    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Command>, cancel: CancellationToken) {
        tracing::info!(executor = self.executor.name(), "Queue coordinator started");

        let mut draining = false;
        let mut accepting = true;

        loop {
            if !draining {
                self.dispatch_next();
            }

            if self.in_flight.is_none() && (draining || (!accepting && self.backlog.is_empty())) {
                break;
            }

            let cooldown = self.cooldown_until;

            tokio::select! {
                () = cancel.cancelled(), if !draining => {
                    tracing::info!(
                        in_flight = self.in_flight.is_some(),
                        "Queue coordinator shutting down",
                    );
                    // Later submissions fail with `QueueError::Stopped`.
                    rx.close();
                    draining = true;
                }
                cmd = rx.recv(), if accepting => match cmd {
                    Some(Command::Submit(task)) => self.enqueue(task, draining),
                    Some(Command::Status(reply)) => {
                        let _ = reply.send(self.status());
                    }
                    None => accepting = false,
                },
                result = next_result(&mut self.in_flight) => {
                    self.in_flight = None;
                    self.complete(result).await;
                }
                () = sleep_until(cooldown), if cooldown.is_some() && self.in_flight.is_none() => {
                    self.cooldown_until = None;
                }
            }
        }

        if !self.backlog.is_empty() {
            tracing::warn!(abandoned = self.backlog.len(), "Backlog dropped at shutdown");
        }
        tracing::info!(processed = self.processed, "Queue coordinator stopped");
    }

    fn enqueue(&mut self, task: Task, draining: bool) {
        if draining {
            // Sent before intake closed; it was already acknowledged.
            tracing::warn!(task_id = %task.task_id, "Task refused during shutdown");
            return;
        }
        tracing::info!(
            task_id = %task.task_id,
            backlog_len = self.backlog.len() + 1,
            "Task accepted",
        );
        self.backlog.push_back(task);
    }

    /// Hand the head of the backlog to a fresh unit if nothing is in flight.
    fn dispatch_next(&mut self) {
        if self.in_flight.is_some() || self.cooldown_until.is_some() {
            return;
        }
        let Some(task) = self.backlog.pop_front() else {
            return;
        };

        tracing::info!(
            task_id = %task.task_id,
            backlog_len = self.backlog.len(),
            "Task dispatched",
        );
        let unit = unit::spawn(Arc::clone(&self.executor), task);
        self.in_flight = Some(InFlight {
            task_id: unit.task_id().to_string(),
            result: Box::pin(unit.join()),
        });
    }

    async fn complete(&mut self, result: TaskResult) {
        self.processed += 1;
        self.broadcaster.publish(result).await;

        if !self.dispatch_delay.is_zero() && !self.backlog.is_empty() {
            self.cooldown_until = Some(Instant::now() + self.dispatch_delay);
        }
    }

    fn status(&self) -> QueueStatus {
        QueueStatus {
            backlog: self.backlog.len(),
            in_flight: self.in_flight.as_ref().map(|f| f.task_id.clone()),
            processed: self.processed,
        }
    }
}

/// Resolve the in-flight unit's result, or never if nothing is in flight.
async fn next_result(in_flight: &mut Option<InFlight>) -> TaskResult {
    match in_flight {
        Some(f) => f.result.as_mut().await,
        None => std::future::pending().await,
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use assert_matches::assert_matches;

    use super::*;
    use crate::simulated::SimulatedExecutor;

    fn coordinator(delay_ms: u64) -> (QueueCoordinator, Arc<ResultBroadcaster>) {
        let broadcaster = Arc::new(ResultBroadcaster::new());
        let config = WorkerConfig {
            processing_delay: Duration::from_millis(delay_ms),
            dispatch_delay: Duration::ZERO,
            worker_command: None,
        };
        let coordinator =
            QueueCoordinator::new(config.executor(), Arc::clone(&broadcaster), &config);
        (coordinator, broadcaster)
    }

    #[tokio::test]
    async fn status_reports_backlog_and_in_flight() {
        let (coordinator, _broadcaster) = coordinator(200);
        let (queue, _join) = coordinator.start(CancellationToken::new());

        queue.submit("a", serde_json::Value::Null).unwrap();
        queue.submit("b", serde_json::Value::Null).unwrap();
        queue.submit("c", serde_json::Value::Null).unwrap();

        let status = queue.status().await.unwrap();
        assert_eq!(status.in_flight.as_deref(), Some("a"));
        assert_eq!(status.backlog, 2);
        assert_eq!(status.processed, 0);
    }

    #[tokio::test]
    async fn dropping_all_handles_drains_backlog_then_stops() {
        let (coordinator, broadcaster) = coordinator(1);
        let mut sub = broadcaster.subscribe().await;
        let (queue, join) = coordinator.start(CancellationToken::new());

        for id in ["t1", "t2", "t3"] {
            queue.submit(id, serde_json::Value::Null).unwrap();
        }
        drop(queue);
        join.await.unwrap();

        for id in ["t1", "t2", "t3"] {
            assert_eq!(sub.recv().await.unwrap().task_id, id);
        }
    }

    #[tokio::test]
    async fn cancel_finishes_in_flight_and_abandons_backlog() {
        let (coordinator, broadcaster) = coordinator(100);
        let mut sub = broadcaster.subscribe().await;
        let cancel = CancellationToken::new();
        let (queue, join) = coordinator.start(cancel.clone());

        queue.submit("running", serde_json::Value::Null).unwrap();
        queue.submit("waiting", serde_json::Value::Null).unwrap();
        // Make sure the first task is in flight before cancelling.
        assert_eq!(queue.status().await.unwrap().in_flight.as_deref(), Some("running"));

        cancel.cancel();
        join.await.unwrap();

        assert_eq!(sub.recv().await.unwrap().task_id, "running");
        assert!(sub.try_recv().is_none());
        assert_matches!(queue.status().await, Err(QueueError::Stopped));
        assert_matches!(
            queue.submit("late", serde_json::Value::Null),
            Err(QueueError::Stopped)
        );
    }

    #[tokio::test]
    async fn submit_during_drain_is_refused() {
        let (coordinator, broadcaster) = coordinator(300);
        let mut sub = broadcaster.subscribe().await;
        let cancel = CancellationToken::new();
        let (queue, join) = coordinator.start(cancel.clone());

        queue.submit("running", serde_json::Value::Null).unwrap();
        assert_eq!(queue.status().await.unwrap().in_flight.as_deref(), Some("running"));

        cancel.cancel();
        // Let the coordinator observe the cancellation; "running" is still in flight.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!join.is_finished());

        assert_matches!(
            queue.submit("late", serde_json::Value::Null),
            Err(QueueError::Stopped)
        );

        join.await.unwrap();
        assert_eq!(sub.recv().await.unwrap().task_id, "running");
        assert!(sub.try_recv().is_none());
    }

    #[tokio::test]
    async fn dispatch_delay_spaces_out_units() {
        let broadcaster = Arc::new(ResultBroadcaster::new());
        let mut sub = broadcaster.subscribe().await;
        let config = WorkerConfig {
            processing_delay: Duration::from_millis(1),
            dispatch_delay: Duration::from_millis(50),
            worker_command: None,
        };
        let coordinator = QueueCoordinator::new(
            Arc::new(SimulatedExecutor::new(config.processing_delay)),
            Arc::clone(&broadcaster),
            &config,
        );
        let (queue, _join) = coordinator.start(CancellationToken::new());

        queue.submit("first", serde_json::Value::Null).unwrap();
        queue.submit("second", serde_json::Value::Null).unwrap();

        let first = sub.recv().await.unwrap();
        let second = sub.recv().await.unwrap();
        let gap = second.completed_at - first.completed_at;
        assert!(gap >= chrono::Duration::milliseconds(50), "gap was {gap}");
    }
}
