//! In-process fan-out of task results to live subscribers.
//!
//! [`ResultBroadcaster`] holds the current subscriber set. Each subscriber
//! owns the receiving half of an unbounded channel, so publishing never
//! waits on a slow consumer. Designed to be shared via
//! `Arc<ResultBroadcaster>` between the queue coordinator (publisher) and
//! connection handlers (subscribers).

use std::collections::HashMap;

use conveyor_core::task::{ResultEvent, TaskResult};
use conveyor_core::types::Timestamp;
use tokio::sync::{mpsc, RwLock};

/// Channel sender half for pushing result events to one subscriber.
pub type ResultSender = mpsc::UnboundedSender<ResultEvent>;

/// A send to one subscriber failed because its receiver is gone.
///
/// Isolated per subscriber: it is logged and the subscriber is pruned, the
/// publisher never sees it.
#[derive(Debug, thiserror::Error)]
#[error("Delivery to subscriber {subscriber_id} failed: receiver dropped")]
pub struct DeliveryFailure {
    pub subscriber_id: String,
}

/// Metadata for a single subscriber.
struct Subscriber {
    sender: ResultSender,
    /// When this subscriber registered.
    connected_at: Timestamp,
}

/// Receiving end handed to a subscriber on registration.
#[derive(Debug)]
pub struct Subscription {
    pub id: String,
    pub receiver: mpsc::UnboundedReceiver<ResultEvent>,
}

impl Subscription {
    /// Wait for the next result event. Returns `None` once the subscriber
    /// has been removed and all buffered events were drained.
    pub async fn recv(&mut self) -> Option<ResultEvent> {
        self.receiver.recv().await
    }

    /// Take an already buffered event without waiting.
    pub fn try_recv(&mut self) -> Option<ResultEvent> {
        self.receiver.try_recv().ok()
    }
}

/// The subscriber set plus best-effort delivery.
///
/// A result reaches every subscriber registered when [`publish`] takes its
/// snapshot, and no subscriber that registers afterwards. Membership may
/// change concurrently with a publish.
///
/// [`publish`]: ResultBroadcaster::publish
pub struct ResultBroadcaster {
    subscribers: RwLock<HashMap<String, Subscriber>>,
}

impl ResultBroadcaster {
    /// Create a broadcaster with no subscribers.
    pub fn new() -> Self {
        Self {
            subscribers: RwLock::new(HashMap::new()),
        }
    }

    /// Register a new subscriber under a generated id.
    pub async fn subscribe(&self) -> Subscription {
        let id = uuid::Uuid::new_v4().to_string();
        let receiver = self.subscribe_as(id.clone()).await;
        Subscription { id, receiver }
    }

    /// Register a subscriber under a caller-chosen id, replacing any
    /// existing subscriber with the same id.
    pub async fn subscribe_as(&self, id: String) -> mpsc::UnboundedReceiver<ResultEvent> {
        let (sender, receiver) = mpsc::unbounded_channel();
        let subscriber = Subscriber {
            sender,
            connected_at: chrono::Utc::now(),
        };
        if let Some(previous) = self.subscribers.write().await.insert(id.clone(), subscriber) {
            tracing::debug!(
                subscriber_id = %id,
                previous_connected_at = %previous.connected_at,
                "Replaced existing subscriber",
            );
        }
        receiver
    }

    /// Remove a subscriber. Returns whether it was registered.
    ///
    /// Dropping the stored sender closes the subscriber's channel once its
    /// buffered events are drained.
    pub async fn unsubscribe(&self, id: &str) -> bool {
        self.subscribers.write().await.remove(id).is_some()
    }

    /// Stamp `result` with the current time and deliver it.
    ///
    /// Returns the number of subscribers it was delivered to.
    pub async fn publish(&self, result: TaskResult) -> usize {
        let event = ResultEvent::from_result(result, chrono::Utc::now());
        self.publish_event(event).await
    }

    /// Deliver an already stamped event to every current subscriber.
    pub async fn publish_event(&self, event: ResultEvent) -> usize {
        // Snapshot so the lock is not held while sending.
        let snapshot: Vec<(String, ResultSender)> = self
            .subscribers
            .read()
            .await
            .iter()
            .map(|(id, sub)| (id.clone(), sub.sender.clone()))
            .collect();

        let mut delivered = 0;
        let mut failed = Vec::new();
        for (id, sender) in snapshot {
            match deliver(&id, &sender, event.clone()) {
                Ok(()) => delivered += 1,
                Err(e) => {
                    tracing::warn!(task_id = %event.task_id, error = %e, "Result delivery failed");
                    failed.push(id);
                }
            }
        }

        if !failed.is_empty() {
            self.prune(&failed).await;
        }

        tracing::debug!(task_id = %event.task_id, delivered, "Result broadcast");
        delivered
    }

    /// Return the current number of subscribers.
    pub async fn subscriber_count(&self) -> usize {
        self.subscribers.read().await.len()
    }

    /// Drop every subscriber, ending their channels after buffered events.
    ///
    /// Used during graceful shutdown.
    pub async fn close_all(&self) {
        let mut subs = self.subscribers.write().await;
        let count = subs.len();
        subs.clear();
        tracing::info!(count, "Closed all result subscribers");
    }

    /// Remove subscribers whose channels are closed. A subscriber that
    /// re-registered under the same id in the meantime is kept.
    async fn prune(&self, ids: &[String]) {
        let mut subs = self.subscribers.write().await;
        for id in ids {
            if subs.get(id).is_some_and(|s| s.sender.is_closed()) {
                subs.remove(id);
            }
        }
    }
}

impl Default for ResultBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

fn deliver(id: &str, sender: &ResultSender, event: ResultEvent) -> Result<(), DeliveryFailure> {
    sender.send(event).map_err(|_| DeliveryFailure {
        subscriber_id: id.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
