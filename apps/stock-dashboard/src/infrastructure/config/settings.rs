//! Dashboard Configuration Settings
//!
//! Configuration types for the dashboard runner, loaded from environment
//! variables. Unset variables take their defaults; set but unparsable
//! values are rejected.

use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use crate::application::services::DEFAULT_MOVERS_LIMIT;
use crate::domain::cache::DEFAULT_EXPIRY_MINUTES;
use crate::domain::notifications::DEFAULT_DISPLAY_SECS;
use crate::infrastructure::api::{ApiClientConfig, DEFAULT_API_URL, RetryConfig};
use crate::infrastructure::feed::{FeedConfig, KeepAliveConfig, ReconnectConfig};

/// Backend API settings.
#[derive(Debug, Clone)]
pub struct ApiSettings {
    /// Base URL, e.g. `http://localhost:8000`.
    pub base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Attempts per idempotent request.
    pub max_attempts: u32,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            timeout: Duration::from_secs(30),
            max_attempts: RetryConfig::default().max_attempts,
        }
    }
}

/// Live feed settings.
#[derive(Debug, Clone)]
pub struct FeedSettings {
    /// Whether the runner connects to the feed at all.
    pub enabled: bool,
    /// Keep-alive interval.
    pub keepalive_interval: Duration,
    /// Initial reconnection delay.
    pub reconnect_delay_initial: Duration,
    /// Maximum reconnection delay.
    pub reconnect_delay_max: Duration,
    /// Reconnection delay multiplier for exponential backoff.
    pub reconnect_delay_multiplier: f64,
    /// Maximum reconnection attempts before giving up (0 = unlimited).
    pub max_reconnect_attempts: u32,
    /// How long a notification stays on display.
    pub notification_display: Duration,
}

impl Default for FeedSettings {
    fn default() -> Self {
        let reconnect = ReconnectConfig::default();
        Self {
            enabled: true,
            keepalive_interval: KeepAliveConfig::default().interval,
            reconnect_delay_initial: reconnect.initial_delay,
            reconnect_delay_max: reconnect.max_delay,
            reconnect_delay_multiplier: reconnect.multiplier,
            max_reconnect_attempts: reconnect.max_attempts,
            notification_display: Duration::from_secs(DEFAULT_DISPLAY_SECS),
        }
    }
}

/// Cache and refresh settings.
#[derive(Debug, Clone)]
pub struct CacheSettings {
    /// Response cache lifetime in minutes.
    pub expiry_minutes: u32,
    /// Movers refresh period in the runner (zero disables it).
    pub movers_refresh: Duration,
    /// Rows per mover list.
    pub movers_limit: u32,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            expiry_minutes: DEFAULT_EXPIRY_MINUTES,
            movers_refresh: Duration::from_secs(60),
            movers_limit: DEFAULT_MOVERS_LIMIT,
        }
    }
}

/// Complete dashboard configuration.
#[derive(Debug, Clone, Default)]
pub struct DashboardConfig {
    /// Backend API settings.
    pub api: ApiSettings,
    /// Live feed settings.
    pub feed: FeedSettings,
    /// Cache settings.
    pub cache: CacheSettings,
    /// JSON file backing preferences and snapshots (`None` = in memory).
    pub store_path: Option<PathBuf>,
    /// Prometheus metrics port (0 = disabled).
    pub metrics_port: u16,
}

impl DashboardConfig {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set to an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set to an invalid value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env(&lookup);
        let defaults = Self::default();

        let base_url = env
            .string("DASHBOARD_API_URL")
            .unwrap_or(defaults.api.base_url);
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ConfigError::InvalidValue {
                key: "DASHBOARD_API_URL".to_string(),
                value: base_url,
            });
        }

        let api = ApiSettings {
            base_url,
            timeout: env.duration_secs("DASHBOARD_HTTP_TIMEOUT_SECS", defaults.api.timeout)?,
            max_attempts: env.parse("DASHBOARD_HTTP_MAX_ATTEMPTS", defaults.api.max_attempts)?,
        };

        let feed = FeedSettings {
            enabled: env.parse("DASHBOARD_FEED_ENABLED", defaults.feed.enabled)?,
            keepalive_interval: env.duration_secs(
                "DASHBOARD_FEED_KEEPALIVE_SECS",
                defaults.feed.keepalive_interval,
            )?,
            reconnect_delay_initial: env.duration_millis(
                "DASHBOARD_FEED_RECONNECT_DELAY_INITIAL_MS",
                defaults.feed.reconnect_delay_initial,
            )?,
            reconnect_delay_max: env.duration_secs(
                "DASHBOARD_FEED_RECONNECT_DELAY_MAX_SECS",
                defaults.feed.reconnect_delay_max,
            )?,
            reconnect_delay_multiplier: env.parse(
                "DASHBOARD_FEED_RECONNECT_DELAY_MULTIPLIER",
                defaults.feed.reconnect_delay_multiplier,
            )?,
            max_reconnect_attempts: env.parse(
                "DASHBOARD_FEED_MAX_RECONNECT_ATTEMPTS",
                defaults.feed.max_reconnect_attempts,
            )?,
            notification_display: env.duration_secs(
                "DASHBOARD_FEED_NOTIFICATION_DISPLAY_SECS",
                defaults.feed.notification_display,
            )?,
        };

        let cache = CacheSettings {
            expiry_minutes: env.parse(
                "DASHBOARD_CACHE_EXPIRY_MINUTES",
                defaults.cache.expiry_minutes,
            )?,
            movers_refresh: env.duration_secs(
                "DASHBOARD_MOVERS_REFRESH_SECS",
                defaults.cache.movers_refresh,
            )?,
            movers_limit: env.parse("DASHBOARD_MOVERS_LIMIT", defaults.cache.movers_limit)?,
        };

        Ok(Self {
            api,
            feed,
            cache,
            store_path: env.string("DASHBOARD_STORE_PATH").map(PathBuf::from),
            metrics_port: env.parse("DASHBOARD_METRICS_PORT", defaults.metrics_port)?,
        })
    }

    /// REST client configuration.
    #[must_use]
    pub fn api_client_config(&self) -> ApiClientConfig {
        let retry = RetryConfig {
            max_attempts: self.api.max_attempts.max(1),
            ..RetryConfig::default()
        };
        ApiClientConfig::new(self.api.base_url.clone())
            .with_timeout(self.api.timeout)
            .with_retry(retry)
    }

    /// Feed listener configuration.
    #[must_use]
    pub fn feed_config(&self) -> FeedConfig {
        FeedConfig::from_api_url(&self.api.base_url)
            .with_reconnect(ReconnectConfig::new(
                self.feed.reconnect_delay_initial,
                self.feed.reconnect_delay_max,
                self.feed.reconnect_delay_multiplier,
                0.0,
                self.feed.max_reconnect_attempts,
            ))
            .with_keepalive(KeepAliveConfig::new(self.feed.keepalive_interval))
    }

    /// Metrics listen address, if enabled.
    #[must_use]
    pub fn metrics_addr(&self) -> Option<SocketAddr> {
        (self.metrics_port != 0).then(|| SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.metrics_port)))
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Environment variable has a value that does not parse.
    #[error("environment variable {key} has invalid value {value:?}")]
    InvalidValue {
        /// Variable name.
        key: String,
        /// Offending value.
        value: String,
    },
}

struct Env<'a, F: Fn(&str) -> Option<String>>(&'a F);

impl<F: Fn(&str) -> Option<String>> Env<'_, F> {
    fn string(&self, key: &str) -> Option<String> {
        (self.0)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn optional<T: std::str::FromStr>(&self, key: &str) -> Result<Option<T>, ConfigError> {
        match self.string(key) {
            None => Ok(None),
            Some(value) => value.parse().map(Some).map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                value,
            }),
        }
    }

    fn parse<T: std::str::FromStr>(&self, key: &str, default: T) -> Result<T, ConfigError> {
        Ok(self.optional(key)?.unwrap_or(default))
    }

    fn duration_secs(&self, key: &str, default: Duration) -> Result<Duration, ConfigError> {
        Ok(self.optional(key)?.map_or(default, Duration::from_secs))
    }

    fn duration_millis(&self, key: &str, default: Duration) -> Result<Duration, ConfigError> {
        Ok(self.optional(key)?.map_or(default, Duration::from_millis))
    }
}
