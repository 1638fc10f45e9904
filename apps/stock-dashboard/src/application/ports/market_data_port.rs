//! Market Data Port (Driven Port)
//!
//! Read-only stock data. List endpoints return the raw response items so
//! callers can cache them verbatim and normalize them once at read time.

use async_trait::async_trait;
use serde_json::Value;

use super::ApiError;
use crate::domain::screener::ScreenerRequest;
use crate::domain::stock::{MoverKind, PriceBar};

/// Port for stock data queries.
#[async_trait]
pub trait MarketDataPort: Send + Sync {
    /// Frequently viewed symbols.
    async fn popular_stocks(&self) -> Result<Vec<Value>, ApiError>;

    /// Symbol/name search.
    async fn search(&self, query: &str) -> Result<Vec<Value>, ApiError>;

    /// Company profile and key statistics.
    async fn stock_info(&self, symbol: &str) -> Result<Value, ApiError>;

    /// Latest price snapshot.
    async fn stock_price(&self, symbol: &str) -> Result<Value, ApiError>;

    /// Price history for `period` (e.g. `1mo`, `1y`).
    async fn history(&self, symbol: &str, period: &str) -> Result<Vec<PriceBar>, ApiError>;

    /// A ranked mover list.
    async fn movers(&self, kind: MoverKind, limit: u32) -> Result<Vec<Value>, ApiError>;

    /// Run a screener.
    async fn screener(&self, request: &ScreenerRequest) -> Result<Vec<Value>, ApiError>;
}
