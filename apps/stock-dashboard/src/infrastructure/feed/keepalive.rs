//! Keep-Alive Manager
//!
//! Asks the connection loop to send a `"ping"` text frame at a fixed
//! interval while the feed is open. The backend never answers, so there is
//! no pong timeout; a dead connection is detected by the read side.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Text frame sent on every tick.
pub const KEEPALIVE_MESSAGE: &str = "ping";

/// Configuration for keep-alive behavior.
#[derive(Debug, Clone)]
pub struct KeepAliveConfig {
    /// Interval between keep-alive frames.
    pub interval: Duration,
}

impl Default for KeepAliveConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
        }
    }
}

impl KeepAliveConfig {
    /// Create a configuration with a custom interval.
    #[must_use]
    pub const fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

/// Request emitted by the manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeepAliveEvent {
    /// Send [`KEEPALIVE_MESSAGE`] now.
    SendPing,
}

/// Periodic keep-alive driver for one open connection.
#[derive(Debug)]
pub struct KeepAliveManager {
    config: KeepAliveConfig,
    event_tx: mpsc::Sender<KeepAliveEvent>,
    cancel: CancellationToken,
}

impl KeepAliveManager {
    /// Create a new keep-alive manager.
    #[must_use]
    pub const fn new(
        config: KeepAliveConfig,
        event_tx: mpsc::Sender<KeepAliveEvent>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            config,
            event_tx,
            cancel,
        }
    }

    /// Run until cancelled or the receiver is dropped. The first ping goes
    /// out one full interval after start.
    pub async fn run(self) {
        let period = self.config.interval.max(Duration::from_millis(1));
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                () = self.cancel.cancelled() => {
                    tracing::debug!("Keep-alive manager cancelled");
                    break;
                }
                _ = interval.tick() => {
                    if self.event_tx.send(KeepAliveEvent::SendPing).await.is_err() {
                        tracing::debug!("Event channel closed, stopping keep-alive");
                        break;
                    }
                }
            }
        }
    }
}
