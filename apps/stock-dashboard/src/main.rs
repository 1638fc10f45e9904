//! Stock Dashboard Runner
//!
//! Headless runner for the dashboard client core: listens to the live
//! notification feed, keeps the mover lists warm and logs what a UI would
//! display.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin stock-dashboard
//! ```
//!
//! # Environment Variables
//!
//! - `DASHBOARD_API_URL`: Backend base URL (default: <http://localhost:8000>)
//! - `DASHBOARD_STORE_PATH`: JSON file for preferences and snapshots (default: in memory)
//! - `DASHBOARD_CACHE_EXPIRY_MINUTES`: Response cache lifetime (default: 5)
//! - `DASHBOARD_MOVERS_REFRESH_SECS`: Mover refresh period, 0 disables (default: 60)
//! - `DASHBOARD_MOVERS_LIMIT`: Rows per mover list (default: 10)
//! - `DASHBOARD_HTTP_TIMEOUT_SECS`: REST timeout (default: 30)
//! - `DASHBOARD_HTTP_MAX_ATTEMPTS`: Attempts per idempotent request (default: 3)
//! - `DASHBOARD_FEED_ENABLED`: Connect to the live feed (default: true)
//! - `DASHBOARD_FEED_KEEPALIVE_SECS`: Keep-alive interval (default: 30)
//! - `DASHBOARD_FEED_RECONNECT_DELAY_INITIAL_MS`: First backoff delay (default: 1000)
//! - `DASHBOARD_FEED_RECONNECT_DELAY_MAX_SECS`: Backoff cap (default: 30)
//! - `DASHBOARD_FEED_RECONNECT_DELAY_MULTIPLIER`: Backoff growth (default: 2.0)
//! - `DASHBOARD_FEED_MAX_RECONNECT_ATTEMPTS`: 0 = unlimited (default: 5)
//! - `DASHBOARD_FEED_NOTIFICATION_DISPLAY_SECS`: Notification lifetime (default: 10)
//! - `DASHBOARD_METRICS_PORT`: Prometheus port, 0 disables (default: 0)
//! - `OTEL_ENABLED`, `OTEL_EXPORTER_OTLP_ENDPOINT`, `OTEL_SERVICE_NAME`: span export
//! - `RUST_LOG`: Log level (default: info)

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use stock_dashboard::application::ports::{KeyValueStore, MemoryStore};
use stock_dashboard::application::services::{
    MoversBoard, MoversService, NotificationSweeper, Preferences, SessionService, shared_cache,
};
use stock_dashboard::domain::cache::CacheStore;
use stock_dashboard::domain::freshness::FreshnessTracker;
use stock_dashboard::domain::notifications::NotificationCenter;
use stock_dashboard::infrastructure::api::DashboardApiClient;
use stock_dashboard::infrastructure::config::DashboardConfig;
use stock_dashboard::infrastructure::feed::{FeedEvent, FeedListener};
use stock_dashboard::infrastructure::metrics::init_metrics;
use stock_dashboard::infrastructure::storage::FileStore;
use stock_dashboard::infrastructure::telemetry;
use tokio::signal;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Graceful shutdown timeout.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// How often expired notifications are swept.
const SWEEP_INTERVAL: Duration = Duration::from_secs(1);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("failed to install rustls crypto provider"))?;

    load_dotenv();

    let _telemetry_guard = telemetry::init()?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting stock dashboard");

    let config = DashboardConfig::from_env()?;
    log_config(&config);

    if let Some(addr) = config.metrics_addr() {
        init_metrics(Some(addr))?;
    }

    let store: Arc<dyn KeyValueStore> = match &config.store_path {
        Some(path) => Arc::new(
            FileStore::open(path)
                .with_context(|| format!("opening store {}", path.display()))?,
        ),
        None => Arc::new(MemoryStore::new()),
    };

    let api = Arc::new(DashboardApiClient::new(&config.api_client_config())?);

    let session = SessionService::new(api.clone(), store.clone());
    match session.restore() {
        Ok(true) => tracing::info!("Restored saved session"),
        Ok(false) => tracing::info!("No saved session"),
        Err(e) => tracing::warn!(error = %e, "Failed to restore session"),
    }

    let cache = shared_cache(CacheStore::new().with_default_expiry(config.cache.expiry_minutes));
    let movers = MoversService::new(api.clone(), cache)
        .with_expiry(config.cache.expiry_minutes)
        .with_snapshots(Preferences::new(store.clone()));

    let center = Arc::new(NotificationCenter::new(config.feed.notification_display));
    let shutdown_token = CancellationToken::new();
    let mut tasks: Vec<JoinHandle<()>> = Vec::new();

    tasks.push(tokio::spawn(
        NotificationSweeper::new(center.clone(), SWEEP_INTERVAL, shutdown_token.child_token())
            .run(),
    ));

    let feed = if config.feed.enabled {
        let (handle, events) = FeedListener::spawn(
            config.feed_config(),
            center.clone(),
            shutdown_token.child_token(),
        );
        tasks.push(tokio::spawn(handle_feed_events(events)));
        Some(handle)
    } else {
        tracing::info!("Live feed disabled");
        None
    };

    if !config.cache.movers_refresh.is_zero() {
        tasks.push(tokio::spawn(refresh_movers(
            movers,
            config.cache.movers_limit,
            config.cache.movers_refresh,
            shutdown_token.child_token(),
        )));
    }

    tracing::info!("Stock dashboard ready");

    await_shutdown(shutdown_token).await;

    if let Some(feed) = feed
        && let Err(e) = feed.shutdown().await
    {
        tracing::warn!(error = %e, "Live feed ended with error");
    }

    let drain = futures::future::join_all(tasks);
    if tokio::time::timeout(SHUTDOWN_TIMEOUT, drain).await.is_err() {
        tracing::warn!(
            timeout_secs = SHUTDOWN_TIMEOUT.as_secs(),
            "Background tasks did not stop in time"
        );
    }

    tracing::info!(
        pending_notifications = center.len(),
        "Stock dashboard stopped"
    );
    Ok(())
}

/// Log events from the live feed.
async fn handle_feed_events(mut rx: mpsc::Receiver<FeedEvent>) {
    while let Some(event) = rx.recv().await {
        match event {
            FeedEvent::Connected => tracing::info!("Live feed connected"),
            FeedEvent::Disconnected { reason } => {
                tracing::warn!(reason = %reason, "Live feed disconnected");
            }
            FeedEvent::Reconnecting { attempt, delay } => {
                tracing::info!(attempt, delay_ms = delay.as_millis(), "Live feed reconnecting");
            }
            FeedEvent::Notifications(events) => {
                for event in events {
                    tracing::info!(
                        kind = ?event.kind,
                        title = %event.title,
                        body = %event.body,
                        "Stock notification"
                    );
                }
            }
            FeedEvent::GaveUp { attempts } => {
                tracing::error!(attempts, "Live feed gave up reconnecting");
            }
        }
    }
}

/// Keep the mover lists warm.
async fn refresh_movers(
    movers: MoversService,
    limit: u32,
    period: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let mut fresh_gainers = FreshnessTracker::new();

    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let board = movers.board(limit, false).await;
                log_board(&board);
                if let Ok(gainers) = &board.gainers {
                    let new = fresh_gainers.observe(gainers.data.iter().map(|r| r.symbol.as_str()));
                    if !new.is_empty() {
                        tracing::info!(symbols = ?new, "New top gainers");
                    }
                    fresh_gainers.cleanup_expired();
                }
            }
        }
    }
}

fn log_board(board: &MoversBoard) {
    for (list, result) in [
        ("gainers", &board.gainers),
        ("losers", &board.losers),
        ("most_active", &board.most_active),
    ] {
        match result {
            Ok(fetched) => tracing::info!(
                list,
                count = fetched.data.len(),
                source = ?fetched.source,
                top = fetched.data.first().map(|r| r.symbol.as_str()),
                "Movers"
            ),
            Err(e) => tracing::warn!(list, error = %e, "Failed to load movers"),
        }
    }
}

/// Load .env file from current directory or any ancestor directory.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Log the parsed configuration.
fn log_config(config: &DashboardConfig) {
    tracing::info!(
        api_url = %config.api.base_url,
        feed_enabled = config.feed.enabled,
        cache_expiry_minutes = config.cache.expiry_minutes,
        metrics_port = config.metrics_port,
        store = config.store_path.as_ref().map(|p| p.display().to_string()),
        "Configuration loaded"
    );
    tracing::debug!(
        feed_url = %config.feed_config().url,
        max_reconnect_attempts = config.feed.max_reconnect_attempts,
        "Live feed endpoint"
    );
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
async fn await_shutdown(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }

    shutdown_token.cancel();
}
