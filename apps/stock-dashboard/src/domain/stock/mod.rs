//! Stock Records
//!
//! The backend is loose about field names and types: a price may arrive as
//! `price`, `current_price` or `close`, numbers may be strings with thousands
//! separators, and missing values are sometimes the literal `"N/A"`.
//! [`StockRecord::from_value`] is the one place that shape is resolved; the
//! rest of the crate only sees the canonical record.

use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// =============================================================================
// Movers
// =============================================================================

/// Ranked mover lists shown on the home view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoverKind {
    /// Largest percentage gain.
    Gainers,
    /// Largest percentage loss.
    Losers,
    /// Highest volume.
    MostActive,
}

impl MoverKind {
    /// All mover lists.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Gainers, Self::Losers, Self::MostActive]
    }

    /// API path segment under `/api/stocks/`.
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Gainers => "top-gainers",
            Self::Losers => "top-losers",
            Self::MostActive => "most-active",
        }
    }

    /// Cache key for this list.
    #[must_use]
    pub const fn cache_key(self) -> &'static str {
        match self {
            Self::Gainers => "gainers",
            Self::Losers => "losers",
            Self::MostActive => "most_active",
        }
    }

    /// Local snapshot dataset name.
    #[must_use]
    pub const fn dataset(self) -> &'static str {
        match self {
            Self::Gainers => "topGainers",
            Self::Losers => "topLosers",
            Self::MostActive => "mostActive",
        }
    }
}

// =============================================================================
// Canonical Record
// =============================================================================

/// Reasons a response item cannot become a [`StockRecord`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    /// Item is not a JSON object.
    #[error("stock item is not an object")]
    NotAnObject,
    /// Item has no usable symbol.
    #[error("stock item has no symbol")]
    MissingSymbol,
}

/// Canonical stock row used by every view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockRecord {
    /// Ticker symbol, upper-cased.
    pub symbol: String,
    /// Company name.
    pub name: Option<String>,
    /// Last price.
    pub price: Option<Decimal>,
    /// Percent change on the day.
    pub change_percent: Option<Decimal>,
    /// Session volume.
    pub volume: Option<u64>,
    /// Sector.
    pub sector: Option<String>,
    /// Industry.
    pub industry: Option<String>,
    /// Listing exchange.
    pub exchange: Option<String>,
    /// Session open.
    pub open_price: Option<Decimal>,
    /// Previous session high.
    pub previous_day_high: Option<Decimal>,
    /// Percent above previous session high.
    pub percent_above_prev_high: Option<Decimal>,
}

const PRICE_KEYS: &[&str] = &["price", "current_price", "close"];
const CHANGE_KEYS: &[&str] = &["change_percent", "percent_change"];
const OPEN_KEYS: &[&str] = &["open_price", "open"];
const PREV_HIGH_KEYS: &[&str] = &["previous_day_high", "prev_day_high"];

impl StockRecord {
    /// Normalize one response item.
    ///
    /// # Errors
    ///
    /// Fails when the item is not an object or carries no symbol.
    pub fn from_value(value: &Value) -> Result<Self, RecordError> {
        let obj = value.as_object().ok_or(RecordError::NotAnObject)?;

        let symbol = text_field(obj, &["symbol", "ticker"])
            .map(|s| s.to_uppercase())
            .ok_or(RecordError::MissingSymbol)?;

        Ok(Self {
            symbol,
            name: text_field(obj, &["name", "company_name"]),
            price: decimal_field(obj, PRICE_KEYS),
            change_percent: decimal_field(obj, CHANGE_KEYS),
            volume: volume_field(obj, &["volume"]),
            sector: text_field(obj, &["sector"]),
            industry: text_field(obj, &["industry"]),
            exchange: text_field(obj, &["exchange"]),
            open_price: decimal_field(obj, OPEN_KEYS),
            previous_day_high: decimal_field(obj, PREV_HIGH_KEYS),
            percent_above_prev_high: decimal_field(obj, &["percent_above_prev_high"]),
        })
    }

    /// Minimal record with just a symbol.
    #[must_use]
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into().to_uppercase(),
            name: None,
            price: None,
            change_percent: None,
            volume: None,
            sector: None,
            industry: None,
            exchange: None,
            open_price: None,
            previous_day_high: None,
            percent_above_prev_high: None,
        }
    }

    /// Display name, falling back to the symbol.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.symbol)
    }
}

/// Normalize a list of response items, dropping the ones without a symbol.
#[must_use]
pub fn normalize_all(values: &[Value]) -> Vec<StockRecord> {
    values
        .iter()
        .filter_map(|v| match StockRecord::from_value(v) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!(error = %e, "Skipping malformed stock item");
                None
            }
        })
        .collect()
}

// =============================================================================
// Field Extraction
// =============================================================================

fn text_field(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| match obj.get(*k) {
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            (!trimmed.is_empty() && !is_not_available(trimmed)).then(|| trimmed.to_string())
        }
        _ => None,
    })
}

fn decimal_field(obj: &Map<String, Value>, keys: &[&str]) -> Option<Decimal> {
    keys.iter().find_map(|k| obj.get(*k).and_then(parse_decimal))
}

fn volume_field(obj: &Map<String, Value>, keys: &[&str]) -> Option<u64> {
    keys.iter()
        .find_map(|k| obj.get(*k).and_then(parse_volume))
}

fn is_not_available(s: &str) -> bool {
    s.eq_ignore_ascii_case("n/a") || s.eq_ignore_ascii_case("nan")
}

/// Parse a JSON number or numeric string into a decimal.
///
/// Accepts `$` prefixes, `%` suffixes and thousands separators.
#[must_use]
pub fn parse_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => parse_decimal_str(&n.to_string()),
        Value::String(s) => parse_decimal_str(s),
        _ => None,
    }
}

fn parse_decimal_str(raw: &str) -> Option<Decimal> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || is_not_available(trimmed) {
        return None;
    }

    let cleaned: String = trimmed
        .trim_start_matches('$')
        .trim_end_matches('%')
        .chars()
        .filter(|c| *c != ',')
        .collect();

    Decimal::from_str(&cleaned)
        .or_else(|_| Decimal::from_scientific(&cleaned))
        .ok()
}

/// Parse a volume that may be a number, a comma-grouped string or an
/// abbreviated string such as `1.5M`.
#[must_use]
pub fn parse_volume(value: &Value) -> Option<u64> {
    let decimal = match value {
        Value::Number(n) => parse_decimal_str(&n.to_string())?,
        Value::String(s) => {
            let s = s.trim();
            let (digits, scale) = match s.chars().last().map(|c| c.to_ascii_uppercase()) {
                Some('K') => (&s[..s.len() - 1], Decimal::from(1_000)),
                Some('M') => (&s[..s.len() - 1], Decimal::from(1_000_000)),
                Some('B') => (&s[..s.len() - 1], Decimal::from(1_000_000_000)),
                _ => (s, Decimal::ONE),
            };
            parse_decimal_str(digits)?.checked_mul(scale)?
        }
        _ => return None,
    };

    if decimal.is_sign_negative() {
        return None;
    }
    decimal.trunc().to_u64()
}

// =============================================================================
// Display Formatting
// =============================================================================

/// Placeholder for missing values.
pub const NOT_AVAILABLE: &str = "N/A";

/// Format a price as `$12.35`.
#[must_use]
pub fn format_price(value: Option<Decimal>) -> String {
    value.map_or_else(
        || NOT_AVAILABLE.to_string(),
        |v| format!("${:.2}", round_half_up(v, 2)),
    )
}

/// Format a percentage as `1.23%`.
#[must_use]
pub fn format_percentage(value: Option<Decimal>) -> String {
    value.map_or_else(
        || NOT_AVAILABLE.to_string(),
        |v| format!("{:.2}%", round_half_up(v, 2)),
    )
}

/// Format a volume as `1.5M`, `2.3K`, or the raw count below one thousand.
#[must_use]
pub fn format_volume(value: Option<u64>) -> String {
    let Some(v) = value else {
        return NOT_AVAILABLE.to_string();
    };

    if v >= 1_000_000 {
        let scaled = Decimal::from(v) / Decimal::from(1_000_000);
        format!("{:.1}M", round_half_up(scaled, 1))
    } else if v >= 1_000 {
        let scaled = Decimal::from(v) / Decimal::from(1_000);
        format!("{:.1}K", round_half_up(scaled, 1))
    } else {
        v.to_string()
    }
}

fn round_half_up(value: Decimal, dp: u32) -> Decimal {
    value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
}

// =============================================================================
// Price History
// =============================================================================

/// One bar of price history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBar {
    /// Bar date or timestamp as sent by the backend.
    #[serde(alias = "Date", alias = "timestamp")]
    pub date: String,
    /// Open.
    #[serde(alias = "Open")]
    pub open: Decimal,
    /// High.
    #[serde(alias = "High")]
    pub high: Decimal,
    /// Low.
    #[serde(alias = "Low")]
    pub low: Decimal,
    /// Close.
    #[serde(alias = "Close")]
    pub close: Decimal,
    /// Volume.
    #[serde(alias = "Volume", default)]
    pub volume: u64,
}
