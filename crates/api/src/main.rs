use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use conveyor_api::config::ServerConfig;
use conveyor_api::router::build_app_router;
use conveyor_api::state::AppState;
use conveyor_events::ResultBroadcaster;
use conveyor_worker::QueueCoordinator;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Upper bound on waiting for WebSocket clients to complete the close handshake.
const SOCKET_CLOSE_GRACE: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "conveyor_api=debug,conveyor_worker=debug,conveyor_events=debug,tower_http=debug"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Result broadcaster ---
    let broadcaster = Arc::new(ResultBroadcaster::new());

    // --- Queue coordinator ---
    let queue_cancel = CancellationToken::new();
    let coordinator = QueueCoordinator::new(
        config.worker.executor(),
        Arc::clone(&broadcaster),
        &config.worker,
    );
    let (queue, queue_handle) = coordinator.start(queue_cancel.clone());

    // --- App state ---
    let sockets = TaskTracker::new();
    let state = AppState {
        config: Arc::new(config.clone()),
        queue,
        broadcaster: Arc::clone(&broadcaster),
        sockets: sockets.clone(),
    };

    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    // Let the in-flight task finish and publish before subscribers go away.
    queue_cancel.cancel();
    let drain = Duration::from_secs(config.shutdown_timeout_secs);
    if tokio::time::timeout(drain, queue_handle).await.is_err() {
        tracing::warn!(
            timeout_secs = config.shutdown_timeout_secs,
            "Queue coordinator did not stop in time"
        );
    }

    let subscribers = broadcaster.subscriber_count().await;
    tracing::info!(subscribers, "Closing remaining subscribers");
    broadcaster.close_all().await;

    // Give each socket task the chance to flush its Close frame.
    sockets.close();
    if tokio::time::timeout(SOCKET_CLOSE_GRACE, sockets.wait())
        .await
        .is_err()
    {
        tracing::warn!(remaining = sockets.len(), "WebSocket connections did not close in time");
    }

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the server
/// shuts down cleanly whether stopped interactively or by a process
/// manager.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
