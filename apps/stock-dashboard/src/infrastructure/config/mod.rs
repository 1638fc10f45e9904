//! Configuration Module
//!
//! Configuration loading for the dashboard runner.

mod settings;

pub use settings::{ApiSettings, CacheSettings, ConfigError, DashboardConfig, FeedSettings};
