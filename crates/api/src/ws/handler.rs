use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use conveyor_events::ResultBroadcaster;
use futures::{SinkExt, StreamExt};

use crate::state::AppState;
use crate::ws::frame::result_frame;

/// HTTP handler that upgrades the connection to WebSocket.
///
/// After the upgrade the connection is registered as a result subscriber
/// and managed by two tasks (sender + receiver).
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    let heartbeat = Duration::from_secs(state.config.heartbeat_interval_secs.max(1));
    let sockets = state.sockets.clone();
    ws.on_upgrade(move |socket| {
        sockets.track_future(handle_socket(socket, state.broadcaster, heartbeat))
    })
}

/// Manage a single WebSocket connection after upgrade.
///
/// Splits the socket into a sink (outbound) and stream (inbound), then:
///   1. Subscribes to the broadcaster.
///   2. Spawns a sender task that forwards result events and heartbeat pings.
///   3. Drains inbound messages on the current task until the client leaves.
///   4. Unsubscribes on disconnect.
async fn handle_socket(socket: WebSocket, broadcaster: Arc<ResultBroadcaster>, heartbeat: Duration) {
    let conn_id = uuid::Uuid::new_v4().to_string();
    let mut rx = broadcaster.subscribe_as(conn_id.clone()).await;
    tracing::info!(conn_id = %conn_id, "Subscriber connected");

    let (mut sink, mut stream) = socket.split();

    let sender_conn_id = conn_id.clone();
    let send_task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(heartbeat);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                event = rx.recv() => {
                    let Some(event) = event else {
                        // Broadcaster closed this subscriber (shutdown).
                        let _ = sink.send(Message::Close(None)).await;
                        break;
                    };
                    let msg = match result_frame(&event) {
                        Ok(msg) => msg,
                        Err(e) => {
                            tracing::warn!(conn_id = %sender_conn_id, error = %e, "Failed to encode result");
                            continue;
                        }
                    };
                    if sink.send(msg).await.is_err() {
                        tracing::debug!(conn_id = %sender_conn_id, "WebSocket sink closed");
                        break;
                    }
                }
                _ = ticker.tick() => {
                    if sink.send(Message::Ping(Bytes::new())).await.is_err() {
                        tracing::debug!(conn_id = %sender_conn_id, "WebSocket sink closed");
                        break;
                    }
                }
            }
        }
    });

    while let Some(result) = stream.next().await {
        match result {
            Ok(Message::Close(_)) => break,
            Ok(Message::Pong(_)) => {
                tracing::trace!(conn_id = %conn_id, "Pong received");
            }
            // Subscribers have nothing to say; inbound frames are ignored.
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(conn_id = %conn_id, error = %e, "WebSocket receive error");
                break;
            }
        }
    }

    broadcaster.unsubscribe(&conn_id).await;
    send_task.abort();
    tracing::info!(conn_id = %conn_id, "Subscriber disconnected");
}
