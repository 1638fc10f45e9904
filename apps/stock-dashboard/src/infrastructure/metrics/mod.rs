//! Prometheus Metrics Module
//!
//! Counters and gauges for the dashboard client core.
//!
//! # Metrics Categories
//!
//! - **Cache**: response cache hits and misses per dataset
//! - **Feed**: live feed messages, connection state and reconnects
//! - **Notifications**: notifications raised per kind
//! - **API**: request outcomes and latency
//!
//! Recording functions are no-ops until [`init_metrics`] installs a recorder.

use std::net::SocketAddr;
use std::sync::OnceLock;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

// =============================================================================
// Global Metrics Handle
// =============================================================================

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Metrics initialization failure.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    /// Exporter could not be built.
    #[error("failed to build Prometheus exporter: {0}")]
    Build(#[from] BuildError),

    /// Another global recorder is already installed.
    #[error("a metrics recorder is already installed")]
    AlreadyInstalled,
}

/// Install the Prometheus recorder.
///
/// With `listen` set, an HTTP exporter serving `/metrics` is spawned on the
/// current tokio runtime. Calling again returns the existing handle.
///
/// # Errors
///
/// Fails when the exporter cannot be built or another recorder is installed.
pub fn init_metrics(listen: Option<SocketAddr>) -> Result<PrometheusHandle, MetricsError> {
    if let Some(handle) = PROMETHEUS_HANDLE.get() {
        return Ok(handle.clone());
    }

    let builder = PrometheusBuilder::new();
    let handle = match listen {
        Some(addr) => {
            let (recorder, exporter) = builder.with_http_listener(addr).build()?;
            let handle = recorder.handle();
            metrics::set_global_recorder(recorder).map_err(|_| MetricsError::AlreadyInstalled)?;
            tokio::spawn(async move {
                if let Err(e) = exporter.await {
                    tracing::error!(error = ?e, "Metrics exporter stopped");
                }
            });
            tracing::info!(%addr, "Metrics exporter listening");
            handle
        }
        None => builder.install_recorder()?,
    };

    register_metrics();
    Ok(PROMETHEUS_HANDLE.get_or_init(|| handle).clone())
}

/// Get the Prometheus handle for rendering metrics.
///
/// Returns `None` if metrics have not been initialized.
#[must_use]
pub fn get_metrics_handle() -> Option<PrometheusHandle> {
    PROMETHEUS_HANDLE.get().cloned()
}

// =============================================================================
// Metric Registration
// =============================================================================

fn register_metrics() {
    describe_counter!(
        "dashboard_cache_lookups_total",
        "Response cache lookups by dataset and result"
    );

    describe_counter!(
        "dashboard_feed_messages_total",
        "Live feed frames received by kind"
    );
    describe_gauge!(
        "dashboard_feed_connected",
        "Whether the live feed connection is open"
    );
    describe_counter!(
        "dashboard_feed_reconnects_total",
        "Live feed reconnection attempts"
    );

    describe_counter!(
        "dashboard_notifications_total",
        "Notifications raised by kind"
    );

    describe_counter!(
        "dashboard_api_requests_total",
        "REST requests by method and outcome"
    );
    describe_histogram!(
        "dashboard_api_request_seconds",
        "REST request latency including retries"
    );
}

// =============================================================================
// Metric Recording Functions
// =============================================================================

/// Result of a cache lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheResult {
    /// Served from memory.
    Hit,
    /// Served from a persisted snapshot.
    Snapshot,
    /// Fetched from the network.
    Miss,
}

impl CacheResult {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Hit => "hit",
            Self::Snapshot => "snapshot",
            Self::Miss => "miss",
        }
    }
}

/// Kind of live feed frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedMessageKind {
    /// Stocks newly crossing the previous day's high.
    CrossingStocks,
    /// Breakout alerts.
    Breakout,
    /// Valid envelope of a type we ignore.
    Ignored,
    /// Undecodable frame.
    Malformed,
}

impl FeedMessageKind {
    const fn as_str(self) -> &'static str {
        match self {
            Self::CrossingStocks => "crossing_stocks",
            Self::Breakout => "breakout",
            Self::Ignored => "ignored",
            Self::Malformed => "malformed",
        }
    }
}

/// Record a response cache lookup.
pub fn record_cache_lookup(dataset: &str, result: CacheResult) {
    counter!(
        "dashboard_cache_lookups_total",
        "dataset" => dataset.to_string(),
        "result" => result.as_str()
    )
    .increment(1);
}

/// Record a live feed frame.
pub fn record_feed_message(kind: FeedMessageKind) {
    counter!("dashboard_feed_messages_total", "kind" => kind.as_str()).increment(1);
}

/// Update the feed connection gauge.
pub fn set_feed_connected(connected: bool) {
    gauge!("dashboard_feed_connected").set(if connected { 1.0 } else { 0.0 });
}

/// Record a reconnection attempt.
pub fn record_feed_reconnect() {
    counter!("dashboard_feed_reconnects_total").increment(1);
}

/// Record raised notifications.
pub fn record_notifications(kind: FeedMessageKind, count: u64) {
    counter!("dashboard_notifications_total", "kind" => kind.as_str()).increment(count);
}

/// Record a finished REST request.
pub fn record_api_request(method: &str, success: bool, latency: Duration) {
    let outcome = if success { "success" } else { "error" };
    counter!(
        "dashboard_api_requests_total",
        "method" => method.to_string(),
        "outcome" => outcome
    )
    .increment(1);
    histogram!("dashboard_api_request_seconds", "method" => method.to_string())
        .record(latency.as_secs_f64());
}
