#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::match_same_arms,
        clippy::needless_pass_by_value,
        clippy::needless_collect,
        clippy::option_if_let_else,
        clippy::default_trait_access,
        clippy::items_after_statements,
        clippy::or_fun_call
    )
)]

//! Stock Dashboard - Client Core
//!
//! The caching and live-update layer of a stock market dashboard: a TTL
//! response cache, a reconnecting notification feed and the screener query
//! builder, plus the REST client and local preferences around them.
//!
//! # Layers (inside → outside)
//!
//! - **Domain**: Cache, notifications, screener filters, stock records
//!   - `cache`: TTL store keyed by request
//!   - `notifications`: bounded newest-first notification list
//!   - `screener`: filter state to query parameters
//!   - `stock`: response normalization and display formatting
//!   - `freshness`: first-seen flags for symbols entering a list
//!
//! - **Application**: Use cases and port definitions
//!   - `ports`: Market data, alerts, auth and key-value storage
//!   - `services`: Cached movers and screeners, session, preferences
//!
//! - **Infrastructure**: Adapters and external integrations
//!   - `api`: REST client with retry and backoff
//!   - `feed`: WebSocket listener with keep-alive and reconnect
//!   - `storage`: JSON file store
//!   - `config`: Environment configuration
//!   - `metrics`, `telemetry`: Prometheus counters and tracing setup
//!
//! # Data Flow
//!
//! ```text
//!  REST API ──► api ──► services ──► CacheStore ──► caller
//!                           │
//!                           └──► Preferences (snapshots) ──► FileStore
//!
//!  /ws feed ──► feed::FeedListener ──► NotificationCenter (max 10)
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Core types and rules with no I/O.
pub mod domain;

/// Application layer - Use cases and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::cache::{CacheEntry, CacheStore};
pub use domain::notifications::{NotificationCenter, NotificationEvent, NotificationKind};
pub use domain::screener::{FilterState, QueryParams, ScreenerKind, ScreenerRequest, build_query_params};
pub use domain::stock::{MoverKind, StockRecord};

// Services
pub use application::services::{MoversService, ScreenerService, SessionService};

// Infrastructure config
pub use infrastructure::config::{ConfigError, DashboardConfig};

// Adapters
pub use infrastructure::api::DashboardApiClient;
pub use infrastructure::feed::{FeedConfig, FeedEvent, FeedHandle, FeedListener, FeedState};
pub use infrastructure::storage::FileStore;

// Metrics
pub use infrastructure::metrics::init_metrics;

// Telemetry
pub use infrastructure::telemetry::{TelemetryConfig, TelemetryGuard, init as init_telemetry};
