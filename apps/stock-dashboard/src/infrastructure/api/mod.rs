//! Dashboard Backend REST Adapter
//!
//! Implementation of the market data, alerts and auth ports with:
//! - Retry logic with exponential backoff
//! - Bearer token installation after login
//! - `{"detail": ...}` error bodies mapped onto [`ApiError`](crate::application::ports::ApiError)

mod api_types;
mod client;
mod config;
mod error;
mod http_client;

pub use client::DashboardApiClient;
pub use config::{ApiClientConfig, DEFAULT_API_URL, RetryConfig};
pub use error::HttpError;
pub use http_client::{Body, DashboardHttpClient};
