//! Price Alerts
//!
//! Wire types for the alert endpoints.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::clock::flexible_datetime;

/// Condition an alert watches.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    /// Price rises above the threshold.
    PriceAbove,
    /// Price falls below the threshold.
    PriceBelow,
    /// Volume rises above the threshold.
    VolumeAbove,
    /// Absolute percent change exceeds the threshold.
    PercentChange,
    /// A type this client does not know about.
    #[serde(other)]
    Other,
}

impl AlertType {
    /// Wire value.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::PriceAbove => "price_above",
            Self::PriceBelow => "price_below",
            Self::VolumeAbove => "volume_above",
            Self::PercentChange => "percent_change",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for AlertType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An alert owned by a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    /// Alert id.
    pub id: i64,
    /// Watched symbol.
    pub stock_symbol: String,
    /// Company name.
    #[serde(default)]
    pub stock_name: Option<String>,
    /// Condition.
    pub alert_type: AlertType,
    /// Trigger threshold.
    pub threshold_value: Decimal,
    /// Latest observed value for the condition.
    #[serde(default)]
    pub current_value: Option<Decimal>,
    /// Whether the alert is armed.
    #[serde(default = "default_active")]
    pub is_active: bool,
    /// Last trigger time.
    #[serde(default, deserialize_with = "flexible_datetime")]
    pub last_triggered: Option<DateTime<Utc>>,
    /// Creation time.
    #[serde(default, deserialize_with = "flexible_datetime")]
    pub created_at: Option<DateTime<Utc>>,
}

const fn default_active() -> bool {
    true
}

/// A recently fired alert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggeredAlert {
    /// Alert id.
    pub id: i64,
    /// Symbol.
    pub stock_symbol: String,
    /// Company name.
    #[serde(default)]
    pub stock_name: Option<String>,
    /// Condition.
    pub alert_type: AlertType,
    /// Threshold that was crossed.
    pub threshold_value: Decimal,
    /// Value at trigger time.
    #[serde(default)]
    pub current_value: Option<Decimal>,
    /// Owner.
    #[serde(default)]
    pub user_email: Option<String>,
    /// Trigger time.
    #[serde(default, deserialize_with = "flexible_datetime")]
    pub triggered_at: Option<DateTime<Utc>>,
}

/// Body for creating an alert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewAlert {
    /// Symbol to watch.
    pub stock_symbol: String,
    /// Owner email.
    pub user_email: String,
    /// Condition.
    pub alert_type: AlertType,
    /// Trigger threshold.
    #[serde(with = "rust_decimal::serde::float")]
    pub threshold_value: Decimal,
}

/// Partial update of an alert. Unset fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AlertUpdate {
    /// Arm or disarm.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    /// New threshold.
    #[serde(
        skip_serializing_if = "Option::is_none",
        with = "rust_decimal::serde::float_option"
    )]
    pub threshold_value: Option<Decimal>,
}

impl AlertUpdate {
    /// Whether the update changes nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.is_active.is_none() && self.threshold_value.is_none()
    }
}

/// Outcome reported by create/update/delete.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AlertMutation {
    /// Whether the backend applied the change.
    #[serde(default = "default_active")]
    pub success: bool,
    /// Human-readable outcome.
    #[serde(default)]
    pub message: Option<String>,
    /// Id of a newly created alert.
    #[serde(default)]
    pub alert_id: Option<i64>,
}

/// Description of an alert type offered by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertTypeInfo {
    /// Condition.
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    /// Display text.
    pub description: String,
}
