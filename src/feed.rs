//! Live feed listener — a background task wrapping the adapter's stream.
//!
//! The listener owns reconnection: when the adapter's stream drops it waits a
//! fixed delay and dials again, up to the configured attempt budget, counting
//! each dial against the shared rate limiter so streaming reconnects and REST
//! calls draw from the same quota. When the budget runs out it emits
//! [`FeedEvent::ReconnectFailed`] and halts; the caller restarts explicitly.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::adapter::{BrokerAdapter, FeedEvent, FeedRequest};
use crate::config::WebsocketConfig;
use crate::limit::RateLimiter;

/// Consumer callback, invoked for every [`FeedEvent`].
pub type FeedCallback = Arc<dyn Fn(FeedEvent) + Send + Sync>;

const DISCONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Handle to a running feed listener.
///
/// Dropping the handle aborts the background task; [`FeedHandle::disconnect`]
/// is the graceful, idempotent way to stop it.
pub struct FeedHandle {
    shutdown_tx: Option<mpsc::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl FeedHandle {
    /// Stop the listener. Safe to call any number of times; calls after the
    /// first (or after the listener has already halted) are no-ops.
    pub async fn disconnect(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            // The task may already be gone; a closed channel is fine.
            let _ = tx.send(()).await;
        }
        if let Some(mut task) = self.task.take() {
            if tokio::time::timeout(DISCONNECT_TIMEOUT, &mut task).await.is_err() {
                tracing::warn!("feed task did not stop within timeout, aborting");
                task.abort();
            }
        }
    }

    /// Whether the background task is still running.
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Drop for FeedHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Spawn the listener task for `request`, delivering events to `callback`.
pub fn spawn_feed(
    adapter: Arc<dyn BrokerAdapter>,
    limiter: Option<Arc<RateLimiter>>,
    websocket: WebsocketConfig,
    request: FeedRequest,
    callback: FeedCallback,
) -> FeedHandle {
    let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
    let task = tokio::spawn(run_feed(adapter, limiter, websocket, request, callback, shutdown_rx));
    FeedHandle {
        shutdown_tx: Some(shutdown_tx),
        task: Some(task),
    }
}

async fn run_feed(
    adapter: Arc<dyn BrokerAdapter>,
    limiter: Option<Arc<RateLimiter>>,
    websocket: WebsocketConfig,
    request: FeedRequest,
    callback: FeedCallback,
    mut shutdown_rx: mpsc::Receiver<()>,
) {
    // Counts consecutive failed dials; a successful connection resets it.
    let mut attempts = 0u32;

    loop {
        if let Some(limiter) = &limiter {
            limiter.admit().await;
        }

        match adapter.open_feed(&request).await {
            Ok(mut events) => {
                attempts = 0;
                tracing::info!(kind = ?request.kind, "feed connected");
                callback(FeedEvent::Connected);

                loop {
                    tokio::select! {
                        _ = shutdown_rx.recv() => {
                            tracing::info!("feed listener stopping");
                            return;
                        }
                        event = events.recv() => match event {
                            Some(event) => callback(event),
                            None => {
                                tracing::warn!("feed stream ended");
                                break;
                            }
                        },
                    }
                }

                callback(FeedEvent::Closed {
                    reason: "stream ended".to_string(),
                });
                // A clean close with reconnection disabled is not a failure;
                // the caller was told via Closed and restarts explicitly.
                if !websocket.auto_reconnect {
                    return;
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "feed connection failed");
            }
        }

        attempts += 1;
        if !websocket.auto_reconnect || attempts > websocket.max_reconnect_attempts {
            let message = format!(
                "gave up reconnecting after {attempts} attempt(s); call subscribe again to resume"
            );
            tracing::error!("{message}");
            callback(FeedEvent::ReconnectFailed { message });
            return;
        }

        tracing::info!(
            attempt = attempts,
            max = websocket.max_reconnect_attempts,
            delay_ms = websocket.reconnect_delay_ms,
            "reconnecting feed"
        );
        tokio::select! {
            _ = shutdown_rx.recv() => return,
            _ = tokio::time::sleep(Duration::from_millis(websocket.reconnect_delay_ms)) => {}
        }
    }
}
