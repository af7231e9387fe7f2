//! WebSocket accept loop

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use crate::connection::handle_connection;
use crate::error::ServerError;
use crate::state::ServerState;

/// How long shutdown waits for open sessions to wind down
const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Accept clients until `shutdown` is cancelled, then drain open sessions.
///
/// # Errors
///
/// Returns an error if the listener's local address cannot be read.
pub async fn run(
    listener: TcpListener,
    state: Arc<ServerState>,
    shutdown: CancellationToken,
) -> Result<(), ServerError> {
    let local_addr = listener.local_addr()?;
    info!("listening on ws://{}", local_addr);
    let tracker = TaskTracker::new();

    loop {
        tokio::select! {
            result = listener.accept() => match result {
                Ok((stream, addr)) => {
                    let _ = stream.set_nodelay(true);
                    let state = Arc::clone(&state);
                    let shutdown = shutdown.clone();
                    tracker.spawn(async move {
                        if let Err(e) = handle_connection(stream, addr, state, shutdown).await {
                            debug!("connection from {} closed: {}", addr, e);
                        }
                    });
                }
                Err(e) => error!("failed to accept connection: {}", e),
            },
            _ = shutdown.cancelled() => {
                info!("shutdown signal received, draining {} connections", tracker.len());
                break;
            }
        }
    }

    tracker.close();
    if tokio::time::timeout(DRAIN_TIMEOUT, tracker.wait()).await.is_err() {
        warn!("drain timeout reached with {} connections still active", tracker.len());
    }
    info!("server shut down");
    Ok(())
}
