//! Response envelopes of the dashboard backend.

use serde::Deserialize;
use serde_json::Value;

use crate::domain::alerts::{Alert, AlertTypeInfo, TriggeredAlert};
use crate::domain::stock::PriceBar;

/// Error body: `{"detail": ...}` where detail is a string or a list of
/// validation errors.
#[derive(Debug, Deserialize)]
pub struct ErrorResponse {
    /// Error detail.
    pub detail: Value,
}

impl ErrorResponse {
    /// Detail as display text.
    #[must_use]
    pub fn message(&self) -> String {
        match &self.detail {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// `GET /api/stocks/popular`.
#[derive(Debug, Deserialize)]
pub struct PopularResponse {
    /// Items.
    #[serde(default)]
    pub popular_stocks: Vec<Value>,
}

/// `GET /api/stocks/search`.
#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    /// Items.
    #[serde(default)]
    pub results: Vec<Value>,
}

/// `GET /api/stocks/history/{symbol}`.
#[derive(Debug, Deserialize)]
pub struct HistoryResponse {
    /// Bars, oldest first.
    #[serde(default)]
    pub history: Vec<PriceBar>,
}

/// Movers and screener lists: either a bare array or `{"stocks": [...]}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum StockListResponse {
    /// Bare array.
    Bare(Vec<Value>),
    /// Wrapped array.
    Wrapped {
        /// Items.
        #[serde(default)]
        stocks: Vec<Value>,
    },
}

impl StockListResponse {
    /// The items.
    #[must_use]
    pub fn into_items(self) -> Vec<Value> {
        match self {
            Self::Bare(items) | Self::Wrapped { stocks: items } => items,
        }
    }
}

/// `GET /api/alerts/user/{email}`.
#[derive(Debug, Deserialize)]
pub struct AlertsResponse {
    /// Alerts.
    #[serde(default)]
    pub alerts: Vec<Alert>,
}

/// `GET /api/alerts/triggered`.
#[derive(Debug, Deserialize)]
pub struct TriggeredAlertsResponse {
    /// Fired alerts.
    #[serde(default)]
    pub triggered_alerts: Vec<TriggeredAlert>,
}

/// `GET /api/alerts/types`.
#[derive(Debug, Deserialize)]
pub struct AlertTypesResponse {
    /// Types.
    #[serde(default)]
    pub alert_types: Vec<AlertTypeInfo>,
}
