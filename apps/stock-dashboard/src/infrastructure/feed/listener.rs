//! Live Feed Listener
//!
//! Holds the push connection to the backend's `/ws` endpoint, turns inbound
//! envelopes into notifications and reconnects with exponential backoff.
//!
//! # Lifecycle
//!
//! ```text
//! Disconnected -> Connecting -> Open -> Closed -> Connecting (after backoff)
//!                                            \-> Terminal (attempts exhausted)
//! ```
//!
//! A successful handshake resets the attempt counter. Cancelling the token
//! stops the backoff sleep, the keep-alive task and the socket together.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

use super::codec::{FeedCodec, FeedMessage};
use super::keepalive::{KEEPALIVE_MESSAGE, KeepAliveConfig, KeepAliveEvent, KeepAliveManager};
use super::reconnect::{ReconnectConfig, ReconnectPolicy};
use crate::domain::notifications::{NotificationCenter, NotificationEvent, NotificationKind};
use crate::infrastructure::metrics::{
    FeedMessageKind, record_feed_message, record_feed_reconnect, record_notifications,
    set_feed_connected,
};

// =============================================================================
// Error Type
// =============================================================================

/// Errors that can occur in the feed listener.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Connection closed by the server or the network.
    #[error("connection closed")]
    ConnectionClosed,

    /// Maximum reconnection attempts exceeded.
    #[error("maximum reconnection attempts ({0}) exceeded")]
    MaxReconnectAttemptsExceeded(u32),

    /// The listener task panicked or was aborted.
    #[error("listener task failed: {0}")]
    Task(String),
}

// =============================================================================
// State and Events
// =============================================================================

/// Connection state, published on a watch channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedState {
    /// Not started, or stopped by the owner.
    Disconnected,
    /// Handshake in progress.
    Connecting {
        /// Failed attempts since the last open connection.
        attempt: u32,
    },
    /// Handshake succeeded.
    Open,
    /// Connection lost; a reconnect may be scheduled.
    Closed,
    /// Reconnect attempts exhausted. The listener has stopped.
    Terminal,
}

/// Events emitted by the listener.
#[derive(Debug, Clone)]
pub enum FeedEvent {
    /// Connection opened.
    Connected,
    /// Connection lost.
    Disconnected {
        /// Why the connection ended.
        reason: String,
    },
    /// Reconnect scheduled.
    Reconnecting {
        /// Attempt number, starting at 1.
        attempt: u32,
        /// Delay before the attempt.
        delay: Duration,
    },
    /// Notifications raised by one frame, in arrival order.
    Notifications(Vec<NotificationEvent>),
    /// No further reconnects will be made.
    GaveUp {
        /// Attempts made.
        attempts: u32,
    },
}

// =============================================================================
// Configuration
// =============================================================================

const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Feed URL for an API base URL: `http` becomes `ws`, `https` becomes
/// `wss`, and `/ws` is appended.
#[must_use]
pub fn feed_url_from_api(api_url: &str) -> String {
    let base = api_url.trim_end_matches('/');
    let base = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        base.to_string()
    };
    format!("{base}/ws")
}

/// Configuration for the feed listener.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// WebSocket URL.
    pub url: String,
    /// Reconnection configuration.
    pub reconnect: ReconnectConfig,
    /// Keep-alive configuration.
    pub keepalive: KeepAliveConfig,
    /// Buffered [`FeedEvent`]s before new ones are dropped.
    pub event_capacity: usize,
}

impl FeedConfig {
    /// Create a configuration for `url` with default timings.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            reconnect: ReconnectConfig::default(),
            keepalive: KeepAliveConfig::default(),
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }

    /// Configuration for the feed served next to `api_url`.
    #[must_use]
    pub fn from_api_url(api_url: &str) -> Self {
        Self::new(feed_url_from_api(api_url))
    }

    /// Override the reconnection policy.
    #[must_use]
    pub fn with_reconnect(mut self, reconnect: ReconnectConfig) -> Self {
        self.reconnect = reconnect;
        self
    }

    /// Override the keep-alive interval.
    #[must_use]
    pub const fn with_keepalive(mut self, keepalive: KeepAliveConfig) -> Self {
        self.keepalive = keepalive;
        self
    }
}

// =============================================================================
// Handle
// =============================================================================

/// Owner's handle on a spawned listener.
#[derive(Debug)]
pub struct FeedHandle {
    state: watch::Receiver<FeedState>,
    cancel: CancellationToken,
    task: JoinHandle<Result<(), FeedError>>,
}

impl FeedHandle {
    /// Current connection state.
    #[must_use]
    pub fn state(&self) -> FeedState {
        *self.state.borrow()
    }

    /// A receiver for state changes.
    #[must_use]
    pub fn subscribe_state(&self) -> watch::Receiver<FeedState> {
        self.state.clone()
    }

    /// Whether the listener task has ended.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop the listener and wait for it to finish.
    ///
    /// # Errors
    ///
    /// Returns the listener's terminal error, if it had already given up.
    pub async fn shutdown(self) -> Result<(), FeedError> {
        self.cancel.cancel();
        self.task
            .await
            .map_err(|e| FeedError::Task(e.to_string()))?
    }
}

// =============================================================================
// Listener
// =============================================================================

/// Live feed WebSocket client.
pub struct FeedListener {
    config: FeedConfig,
    codec: FeedCodec,
    center: Arc<NotificationCenter>,
    event_tx: mpsc::Sender<FeedEvent>,
    state_tx: watch::Sender<FeedState>,
    cancel: CancellationToken,
}

impl FeedListener {
    /// Create a listener publishing into `center`.
    #[must_use]
    pub fn new(
        config: FeedConfig,
        center: Arc<NotificationCenter>,
        event_tx: mpsc::Sender<FeedEvent>,
        cancel: CancellationToken,
    ) -> Self {
        let (state_tx, _) = watch::channel(FeedState::Disconnected);
        Self {
            config,
            codec: FeedCodec::new(),
            center,
            event_tx,
            state_tx,
            cancel,
        }
    }

    /// Spawn a listener on the current runtime.
    #[must_use]
    pub fn spawn(
        config: FeedConfig,
        center: Arc<NotificationCenter>,
        cancel: CancellationToken,
    ) -> (FeedHandle, mpsc::Receiver<FeedEvent>) {
        let (event_tx, event_rx) = mpsc::channel(config.event_capacity.max(1));
        let listener = Self::new(config, center, event_tx, cancel.clone());
        let state = listener.state_tx.subscribe();
        let task = tokio::spawn(listener.run());
        (FeedHandle { state, cancel, task }, event_rx)
    }

    /// A receiver for state changes.
    #[must_use]
    pub fn subscribe_state(&self) -> watch::Receiver<FeedState> {
        self.state_tx.subscribe()
    }

    /// Run the connection loop until cancelled or attempts are exhausted.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::MaxReconnectAttemptsExceeded`] after the last
    /// permitted attempt fails.
    pub async fn run(self) -> Result<(), FeedError> {
        let mut policy = ReconnectPolicy::new(self.config.reconnect.clone());

        loop {
            if self.cancel.is_cancelled() {
                self.set_state(FeedState::Disconnected);
                return Ok(());
            }

            self.set_state(FeedState::Connecting {
                attempt: policy.attempt_count(),
            });

            match self.connect_and_run(&mut policy).await {
                Ok(()) => {
                    tracing::info!("Live feed stopped");
                    set_feed_connected(false);
                    self.set_state(FeedState::Disconnected);
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Live feed connection error");
                    set_feed_connected(false);
                    self.set_state(FeedState::Closed);
                    self.emit(FeedEvent::Disconnected {
                        reason: e.to_string(),
                    });

                    let Some(delay) = policy.next_delay() else {
                        let attempts = policy.attempt_count();
                        tracing::error!(attempts, "Live feed reconnect attempts exhausted");
                        self.set_state(FeedState::Terminal);
                        self.emit(FeedEvent::GaveUp { attempts });
                        return Err(FeedError::MaxReconnectAttemptsExceeded(attempts));
                    };

                    let attempt = policy.attempt_count();
                    record_feed_reconnect();
                    tracing::info!(
                        attempt,
                        delay_ms = delay.as_millis(),
                        "Reconnecting to live feed"
                    );
                    self.emit(FeedEvent::Reconnecting { attempt, delay });

                    tokio::select! {
                        () = self.cancel.cancelled() => {
                            tracing::info!("Live feed cancelled during reconnect delay");
                            self.set_state(FeedState::Disconnected);
                            return Ok(());
                        }
                        () = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }
    }

    /// Connect and pump frames until error or cancellation.
    async fn connect_and_run(&self, policy: &mut ReconnectPolicy) -> Result<(), FeedError> {
        tracing::info!(url = %self.config.url, "Connecting to live feed");

        let (ws_stream, _response) = tokio::select! {
            () = self.cancel.cancelled() => return Ok(()),
            result = tokio_tungstenite::connect_async(self.config.url.as_str()) => result?,
        };

        policy.reset();
        set_feed_connected(true);
        self.set_state(FeedState::Open);
        self.emit(FeedEvent::Connected);
        tracing::info!("Live feed connected");

        let (mut write, mut read) = ws_stream.split();

        let (keepalive_tx, mut keepalive_rx) = mpsc::channel::<KeepAliveEvent>(4);
        let keepalive_cancel = self.cancel.child_token();
        let keepalive = tokio::spawn(
            KeepAliveManager::new(
                self.config.keepalive.clone(),
                keepalive_tx,
                keepalive_cancel.clone(),
            )
            .run(),
        );

        let result = loop {
            tokio::select! {
                () = self.cancel.cancelled() => break Ok(()),
                Some(KeepAliveEvent::SendPing) = keepalive_rx.recv() => {
                    tracing::trace!("Sending keep-alive");
                    if let Err(e) = write.send(Message::Text(KEEPALIVE_MESSAGE.to_string().into())).await {
                        break Err(e.into());
                    }
                }
                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => self.handle_text(text.as_str()),
                        Some(Ok(Message::Ping(data))) => {
                            if let Err(e) = write.send(Message::Pong(data)).await {
                                break Err(e.into());
                            }
                        }
                        Some(Ok(Message::Close(frame))) => {
                            tracing::info!(?frame, "Server sent close frame");
                            break Err(FeedError::ConnectionClosed);
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => break Err(e.into()),
                        None => {
                            tracing::info!("WebSocket stream ended");
                            break Err(FeedError::ConnectionClosed);
                        }
                    }
                }
            }
        };

        keepalive_cancel.cancel();
        let _ = keepalive.await;

        if result.is_ok() {
            let _ = write.send(Message::Close(None)).await;
        }
        result
    }

    /// Decode one text frame and publish its notifications.
    fn handle_text(&self, text: &str) {
        match self.codec.decode(text) {
            Ok(FeedMessage::Stocks { kind, items }) => {
                let metric_kind = match kind {
                    NotificationKind::CrossingStock => FeedMessageKind::CrossingStocks,
                    NotificationKind::Breakout => FeedMessageKind::Breakout,
                };
                record_feed_message(metric_kind);

                let now = self.center.now();
                let events: Vec<NotificationEvent> = items
                    .iter()
                    .filter_map(|item| NotificationEvent::from_item(kind, item, now))
                    .collect();
                if events.is_empty() {
                    tracing::debug!(?kind, "Feed frame carried no usable items");
                    return;
                }

                record_notifications(metric_kind, u64::try_from(events.len()).unwrap_or(u64::MAX));
                self.center.publish(events.iter().cloned());
                self.emit(FeedEvent::Notifications(events));
            }
            Ok(FeedMessage::Ignored { message_type }) => {
                record_feed_message(FeedMessageKind::Ignored);
                tracing::debug!(message_type = %message_type, "Ignoring feed message");
            }
            Err(e) => {
                record_feed_message(FeedMessageKind::Malformed);
                tracing::warn!(error = %e, len = text.len(), "Dropping malformed feed frame");
            }
        }
    }

    fn set_state(&self, state: FeedState) {
        let previous = self.state_tx.send_replace(state);
        if previous != state {
            tracing::debug!(?previous, ?state, "Feed state changed");
        }
    }

    fn emit(&self, event: FeedEvent) {
        if let Err(mpsc::error::TrySendError::Full(event)) = self.event_tx.try_send(event) {
            tracing::debug!(?event, "Feed event receiver lagging, dropping event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn listener() -> (FeedListener, Arc<NotificationCenter>, mpsc::Receiver<FeedEvent>) {
        let center = Arc::new(NotificationCenter::default());
        let (tx, rx) = mpsc::channel(8);
        let listener = FeedListener::new(
            FeedConfig::new("ws://127.0.0.1:1/ws"),
            center.clone(),
            tx,
            CancellationToken::new(),
        );
        (listener, center, rx)
    }

    #[test]
    fn feed_url_follows_api_scheme() {
        assert_eq!(feed_url_from_api("http://localhost:8000"), "ws://localhost:8000/ws");
        assert_eq!(feed_url_from_api("https://api.example.com/"), "wss://api.example.com/ws");
        assert_eq!(feed_url_from_api("ws://already"), "ws://already/ws");
    }

    #[test]
    fn config_defaults() {
        let config = FeedConfig::from_api_url("http://localhost:8000");
        assert_eq!(config.url, "ws://localhost:8000/ws");
        assert_eq!(config.reconnect.max_attempts, 5);
        assert_eq!(config.keepalive.interval, Duration::from_secs(30));
    }

    #[test]
    fn crossing_frame_publishes_one_notification_per_item() {
        let (listener, center, mut rx) = listener();
        let frame = json!({
            "type": "new_crossing_stocks",
            "data": [
                {"symbol": "aapl", "price": 190.5, "change_percent": 1.2},
                {"symbol": "MSFT", "price": 410.0}
            ]
        });

        listener.handle_text(&frame.to_string());

        let titles: Vec<_> = center.snapshot().into_iter().map(|n| n.title).collect();
        assert_eq!(
            titles,
            vec![
                "MSFT Crossed Above Previous Day High!",
                "AAPL Crossed Above Previous Day High!"
            ]
        );
        match rx.try_recv().unwrap() {
            FeedEvent::Notifications(events) => assert_eq!(events.len(), 2),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn breakout_frame_uses_breakout_title() {
        let (listener, center, _rx) = listener();
        listener.handle_text(
            r#"{"type":"crossed_above_prev_day_high","data":[{"symbol":"NVDA","price":"120.5","previous_day_high":"118"}]}"#,
        );
        let latest = center.snapshot().remove(0);
        assert_eq!(latest.title, "NVDA - Breakout Alert!");
        assert_eq!(latest.kind, NotificationKind::Breakout);
    }

    #[test]
    fn malformed_and_unknown_frames_are_dropped() {
        let (listener, center, mut rx) = listener();
        listener.handle_text("not json");
        listener.handle_text(r#"{"type":"heartbeat","data":[]}"#);
        listener.handle_text(r#"{"type":"new_crossing_stocks","data":[{"name":"no symbol"}]}"#);

        assert!(center.is_empty());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn list_keeps_ten_newest() {
        let (listener, center, _rx) = listener();
        let items: Vec<_> = (0..12).map(|i| json!({"symbol": format!("S{i}")})).collect();
        listener.handle_text(&json!({"type": "new_crossing_stocks", "data": items}).to_string());

        let snapshot = center.snapshot();
        assert_eq!(snapshot.len(), 10);
        assert!(snapshot[0].title.starts_with("S11 "));
        assert!(snapshot[9].title.starts_with("S2 "));
    }

    #[tokio::test]
    async fn gives_up_after_attempts_exhausted() {
        let center = Arc::new(NotificationCenter::default());
        let config = FeedConfig::new("ws://127.0.0.1:1/ws").with_reconnect(ReconnectConfig::new(
            Duration::from_millis(1),
            Duration::from_millis(5),
            2.0,
            0.0,
            2,
        ));
        let (handle, mut events) = FeedListener::spawn(config, center, CancellationToken::new());

        let mut reconnects = 0;
        let mut gave_up = None;
        while let Some(event) = events.recv().await {
            match event {
                FeedEvent::Reconnecting { .. } => reconnects += 1,
                FeedEvent::GaveUp { attempts } => {
                    gave_up = Some(attempts);
                    break;
                }
                _ => {}
            }
        }

        assert_eq!(reconnects, 2);
        assert_eq!(gave_up, Some(2));
        let result = handle.shutdown().await;
        assert!(matches!(result, Err(FeedError::MaxReconnectAttemptsExceeded(2))));
    }
}
