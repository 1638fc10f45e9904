//! Screener Queries
//!
//! Turns filter selections into the flat parameter set sent to a screener
//! endpoint. [`build_query_params`] is pure: same inputs, same parameters,
//! no I/O.
//!
//! # Filter discriminators
//!
//! - Price: `range` sends both bounds, `above` only `min_price`, `below` only
//!   `max_price`.
//! - Change: `any` sends the change range, `up` sends `[change_min,
//!   change_max]`, `down` mirrors it to `[-change_max, -change_min]`.
//! - Volume bounds are sent when non-zero; sector, industry and exchange when
//!   non-empty.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::cache::request_key;

/// Default number of results requested.
pub const DEFAULT_LIMIT: u32 = 15;

/// Default number of consecutive candles.
pub const DEFAULT_NUM_CANDLES: u32 = 3;

// =============================================================================
// Filter State
// =============================================================================

/// How the price filter is applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceFilterType {
    /// Between `price_range` bounds.
    #[default]
    Range,
    /// At or above `price_above`.
    Above,
    /// At or below `price_below`.
    Below,
}

/// How the percent-change filter is applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeFilterType {
    /// Within `change_range`, either direction.
    #[default]
    Any,
    /// Upward move between `change_min` and `change_max`.
    Up,
    /// Downward move between `change_min` and `change_max` in magnitude.
    Down,
}

/// Filter selections for an advanced screener search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterState {
    /// Price discriminator.
    pub price_filter: PriceFilterType,
    /// Bounds for [`PriceFilterType::Range`].
    pub price_range: (Decimal, Decimal),
    /// Floor for [`PriceFilterType::Above`].
    pub price_above: Decimal,
    /// Ceiling for [`PriceFilterType::Below`].
    pub price_below: Decimal,
    /// Change discriminator.
    pub change_filter: ChangeFilterType,
    /// Bounds for [`ChangeFilterType::Any`].
    pub change_range: (Decimal, Decimal),
    /// Smallest move magnitude for up/down.
    pub change_min: Decimal,
    /// Largest move magnitude for up/down.
    pub change_max: Decimal,
    /// Volume bounds; zero means unbounded on that side.
    pub volume_range: (u64, u64),
    /// Sector name, empty for any.
    pub sector: String,
    /// Industry name, empty for any.
    pub industry: String,
    /// Exchange code, empty for any.
    pub exchange: String,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            price_filter: PriceFilterType::Range,
            price_range: (Decimal::ZERO, Decimal::from(5000)),
            price_above: Decimal::from(5),
            price_below: Decimal::from(100),
            change_filter: ChangeFilterType::Any,
            change_range: (Decimal::from(-500), Decimal::from(500)),
            change_min: Decimal::ONE,
            change_max: Decimal::TEN,
            volume_range: (100_000, 10_000_000),
            sector: String::new(),
            industry: String::new(),
            exchange: String::new(),
        }
    }
}

// =============================================================================
// Query Parameters
// =============================================================================

/// Ordered query parameters.
///
/// Keys are kept sorted so equal parameter sets produce equal cache keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams(BTreeMap<String, String>);

impl QueryParams {
    /// Empty parameter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key`, replacing any previous value.
    pub fn insert(&mut self, key: &str, value: impl fmt::Display) {
        self.0.insert(key.to_string(), value.to_string());
    }

    /// Value for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Whether `key` is set.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Copy every entry of `other` over this set.
    pub fn extend(&mut self, other: Self) {
        self.0.extend(other.0);
    }

    /// Number of parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no parameters are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Key/value pairs in key order, suitable for `reqwest::RequestBuilder::query`.
    #[must_use]
    pub fn pairs(&self) -> Vec<(&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect()
    }

    /// `k=v&k=v` rendering in key order. Values are not percent-encoded;
    /// use it for cache keys and logs, not for building URLs.
    #[must_use]
    pub fn to_query_string(&self) -> String {
        self.0
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&")
    }
}

/// Build the advanced-filter parameters for one search.
#[must_use]
pub fn build_query_params(state: &FilterState) -> QueryParams {
    let mut params = QueryParams::new();

    match state.price_filter {
        PriceFilterType::Range => {
            params.insert("min_price", state.price_range.0.normalize());
            params.insert("max_price", state.price_range.1.normalize());
        }
        PriceFilterType::Above => params.insert("min_price", state.price_above.normalize()),
        PriceFilterType::Below => params.insert("max_price", state.price_below.normalize()),
    }

    let (min_change, max_change) = match state.change_filter {
        ChangeFilterType::Any => state.change_range,
        ChangeFilterType::Up => (state.change_min, state.change_max),
        ChangeFilterType::Down => (-state.change_max, -state.change_min),
    };
    params.insert("min_change_percent", min_change.normalize());
    params.insert("max_change_percent", max_change.normalize());

    let (min_volume, max_volume) = state.volume_range;
    if min_volume > 0 {
        params.insert("min_volume", min_volume);
    }
    if max_volume > 0 {
        params.insert("max_volume", max_volume);
    }

    for (key, value) in [
        ("sector", &state.sector),
        ("industry", &state.industry),
        ("exchange", &state.exchange),
    ] {
        let value = value.trim();
        if !value.is_empty() {
            params.insert(key, value);
        }
    }

    params
}

// =============================================================================
// Screener Requests
// =============================================================================

/// Available screeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScreenerKind {
    /// N consecutive green candles.
    ConsecutivePositive,
    /// N consecutive red candles.
    ConsecutiveNegative,
    /// Crossing above the previous day's high.
    CrossingPrevDayHigh,
    /// Crossing below the previous day's low.
    CrossingPrevDayLow,
    /// Opened below the previous day's high.
    OpenBelowPrevHigh,
}

impl ScreenerKind {
    /// Path segment under `/api/stocks/screener/`.
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::ConsecutivePositive => "consecutive-positive",
            Self::ConsecutiveNegative => "consecutive-negative",
            Self::CrossingPrevDayHigh => "crossing-prev-day-high",
            Self::CrossingPrevDayLow => "crossing-prev-day-low",
            Self::OpenBelowPrevHigh => "open-below-prev-high",
        }
    }

    /// Whether the screener takes a candle timeframe and count.
    #[must_use]
    pub const fn uses_candles(self) -> bool {
        matches!(self, Self::ConsecutivePositive | Self::ConsecutiveNegative)
    }
}

impl fmt::Display for ScreenerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Unknown screener or timeframe name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {what}: {value}")]
pub struct ParseScreenerError {
    what: &'static str,
    value: String,
}

impl FromStr for ScreenerKind {
    type Err = ParseScreenerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [
            Self::ConsecutivePositive,
            Self::ConsecutiveNegative,
            Self::CrossingPrevDayHigh,
            Self::CrossingPrevDayLow,
            Self::OpenBelowPrevHigh,
        ]
        .into_iter()
        .find(|k| k.path() == s)
        .ok_or_else(|| ParseScreenerError {
            what: "screener",
            value: s.to_string(),
        })
    }
}

/// Candle timeframe for the consecutive-candle screeners.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    /// One minute.
    #[serde(rename = "1m")]
    OneMinute,
    /// Five minutes.
    #[default]
    #[serde(rename = "5m")]
    FiveMinutes,
    /// Fifteen minutes.
    #[serde(rename = "15m")]
    FifteenMinutes,
    /// Thirty minutes.
    #[serde(rename = "30m")]
    ThirtyMinutes,
    /// One hour.
    #[serde(rename = "1h")]
    OneHour,
    /// Four hours.
    #[serde(rename = "4h")]
    FourHours,
    /// One day.
    #[serde(rename = "1d")]
    OneDay,
}

impl Timeframe {
    /// Wire value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OneMinute => "1m",
            Self::FiveMinutes => "5m",
            Self::FifteenMinutes => "15m",
            Self::ThirtyMinutes => "30m",
            Self::OneHour => "1h",
            Self::FourHours => "4h",
            Self::OneDay => "1d",
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = ParseScreenerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [
            Self::OneMinute,
            Self::FiveMinutes,
            Self::FifteenMinutes,
            Self::ThirtyMinutes,
            Self::OneHour,
            Self::FourHours,
            Self::OneDay,
        ]
        .into_iter()
        .find(|t| t.as_str() == s)
        .ok_or_else(|| ParseScreenerError {
            what: "timeframe",
            value: s.to_string(),
        })
    }
}

/// Fixed bounds of the open-below-previous-high screener.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenBelowBounds {
    /// Minimum price.
    pub min_price: Decimal,
    /// Maximum price.
    pub max_price: Decimal,
    /// Minimum volume.
    pub min_volume: u64,
}

impl Default for OpenBelowBounds {
    fn default() -> Self {
        Self {
            min_price: Decimal::new(25, 2),
            max_price: Decimal::TEN,
            min_volume: 250_000,
        }
    }
}

/// One screener search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenerRequest {
    /// Which screener.
    pub kind: ScreenerKind,
    /// Maximum number of results.
    pub limit: u32,
    /// Candle timeframe, used by candle screeners.
    pub timeframe: Timeframe,
    /// Consecutive candle count, used by candle screeners.
    pub num_candles: u32,
    /// Bounds used by the open-below-previous-high screener.
    pub open_below: OpenBelowBounds,
    /// Advanced filters; `None` when advanced filtering is off.
    pub filters: Option<FilterState>,
}

impl ScreenerRequest {
    /// Request for `kind` with default settings and no advanced filters.
    #[must_use]
    pub fn new(kind: ScreenerKind) -> Self {
        Self {
            kind,
            limit: DEFAULT_LIMIT,
            timeframe: Timeframe::default(),
            num_candles: DEFAULT_NUM_CANDLES,
            open_below: OpenBelowBounds::default(),
            filters: None,
        }
    }

    /// Set the result limit.
    #[must_use]
    pub const fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    /// Set the candle timeframe and count.
    #[must_use]
    pub const fn with_candles(mut self, timeframe: Timeframe, num_candles: u32) -> Self {
        self.timeframe = timeframe;
        self.num_candles = num_candles;
        self
    }

    /// Enable advanced filtering with `filters`.
    #[must_use]
    pub fn with_filters(mut self, filters: FilterState) -> Self {
        self.filters = Some(filters);
        self
    }

    /// Endpoint path relative to the API base.
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!("/api/stocks/screener/{}", self.kind.path())
    }

    /// Full parameter set for this request.
    ///
    /// Advanced filters are applied last and override base parameters. The
    /// open-below price bounds are dropped when filters are present, so an
    /// `above` or `below` price filter is never paired with a stale bound.
    #[must_use]
    pub fn to_query(&self) -> QueryParams {
        let mut params = QueryParams::new();
        params.insert("limit", self.limit);

        if self.kind.uses_candles() {
            params.insert("timeframe", self.timeframe);
            params.insert("num_candles", self.num_candles);
        }

        if self.kind == ScreenerKind::OpenBelowPrevHigh {
            if self.filters.is_none() {
                params.insert("min_price", self.open_below.min_price.normalize());
                params.insert("max_price", self.open_below.max_price.normalize());
            }
            params.insert("min_volume", self.open_below.min_volume);
        }

        if let Some(filters) = &self.filters {
            params.extend(build_query_params(filters));
        }

        params
    }

    /// Cache key for this request.
    #[must_use]
    pub fn cache_key(&self) -> String {
        request_key(
            &format!("screener/{}", self.kind.path()),
            &self.to_query().to_query_string(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use test_case::test_case;

    #[test]
    fn price_above_sets_only_lower_bound() {
        let state = FilterState {
            price_filter: PriceFilterType::Above,
            price_above: dec!(10),
            ..FilterState::default()
        };
        let params = build_query_params(&state);

        assert_eq!(params.get("min_price"), Some("10"));
        assert!(!params.contains("max_price"));
    }

    #[test]
    fn price_below_sets_only_upper_bound() {
        let state = FilterState {
            price_filter: PriceFilterType::Below,
            price_below: dec!(42.50),
            ..FilterState::default()
        };
        let params = build_query_params(&state);

        assert_eq!(params.get("max_price"), Some("42.5"));
        assert!(!params.contains("min_price"));
    }

    #[test]
    fn price_range_sets_both_bounds() {
        let params = build_query_params(&FilterState::default());
        assert_eq!(params.get("min_price"), Some("0"));
        assert_eq!(params.get("max_price"), Some("5000"));
    }

    #[test]
    fn change_down_mirrors_bounds() {
        let state = FilterState {
            change_filter: ChangeFilterType::Down,
            change_min: dec!(2),
            change_max: dec!(8),
            ..FilterState::default()
        };
        let params = build_query_params(&state);

        assert_eq!(params.get("min_change_percent"), Some("-8"));
        assert_eq!(params.get("max_change_percent"), Some("-2"));
    }

    #[test_case(ChangeFilterType::Any, "-500", "500" ; "any uses range")]
    #[test_case(ChangeFilterType::Up, "1", "10" ; "up uses magnitudes")]
    #[test_case(ChangeFilterType::Down, "-10", "-1" ; "down negates")]
    fn change_defaults(filter: ChangeFilterType, min: &str, max: &str) {
        let state = FilterState {
            change_filter: filter,
            ..FilterState::default()
        };
        let params = build_query_params(&state);
        assert_eq!(params.get("min_change_percent"), Some(min));
        assert_eq!(params.get("max_change_percent"), Some(max));
    }

    #[test]
    fn empty_categoricals_and_zero_volume_are_omitted() {
        let state = FilterState {
            volume_range: (0, 0),
            sector: "  ".to_string(),
            ..FilterState::default()
        };
        let params = build_query_params(&state);

        for key in ["min_volume", "max_volume", "sector", "industry", "exchange"] {
            assert!(!params.contains(key), "{key} should be omitted");
        }
    }

    #[test]
    fn categoricals_included_when_set() {
        let state = FilterState {
            sector: "Technology".to_string(),
            exchange: "NASDAQ".to_string(),
            ..FilterState::default()
        };
        let params = build_query_params(&state);

        assert_eq!(params.get("sector"), Some("Technology"));
        assert_eq!(params.get("exchange"), Some("NASDAQ"));
        assert!(!params.contains("industry"));
        assert_eq!(params.get("min_volume"), Some("100000"));
        assert_eq!(params.get("max_volume"), Some("10000000"));
    }

    #[test]
    fn candle_screener_base_params() {
        let request = ScreenerRequest::new(ScreenerKind::ConsecutivePositive)
            .with_candles(Timeframe::FifteenMinutes, 4);
        let params = request.to_query();

        assert_eq!(params.get("timeframe"), Some("15m"));
        assert_eq!(params.get("num_candles"), Some("4"));
        assert_eq!(params.get("limit"), Some("15"));
        assert_eq!(params.len(), 3);
        assert_eq!(request.endpoint(), "/api/stocks/screener/consecutive-positive");
    }

    #[test]
    fn crossing_screener_sends_only_limit_without_filters() {
        let params = ScreenerRequest::new(ScreenerKind::CrossingPrevDayHigh)
            .with_limit(25)
            .to_query();
        assert_eq!(params.pairs(), vec![("limit", "25")]);
    }

    #[test]
    fn open_below_bounds() {
        let params = ScreenerRequest::new(ScreenerKind::OpenBelowPrevHigh).to_query();
        assert_eq!(params.get("min_price"), Some("0.25"));
        assert_eq!(params.get("max_price"), Some("10"));
        assert_eq!(params.get("min_volume"), Some("250000"));
    }

    #[test]
    fn filters_override_base_params() {
        let filters = FilterState {
            price_filter: PriceFilterType::Above,
            price_above: dec!(3),
            volume_range: (500_000, 0),
            ..FilterState::default()
        };
        let params = ScreenerRequest::new(ScreenerKind::OpenBelowPrevHigh)
            .with_filters(filters)
            .to_query();

        assert_eq!(params.get("min_price"), Some("3"));
        assert!(!params.contains("max_price"));
        assert_eq!(params.get("min_volume"), Some("500000"));
    }

    #[test]
    fn below_filter_drops_open_below_floor() {
        let filters = FilterState {
            price_filter: PriceFilterType::Below,
            price_below: dec!(8),
            ..FilterState::default()
        };
        let params = ScreenerRequest::new(ScreenerKind::OpenBelowPrevHigh)
            .with_filters(filters)
            .to_query();

        assert_eq!(params.get("max_price"), Some("8"));
        assert!(!params.contains("min_price"));
    }


    #[test]
    fn cache_key_is_stable() {
        let a = ScreenerRequest::new(ScreenerKind::ConsecutiveNegative);
        let b = ScreenerRequest::new(ScreenerKind::ConsecutiveNegative);
        assert_eq!(a.cache_key(), b.cache_key());
        assert_eq!(
            a.cache_key(),
            "screener/consecutive-negative?limit=15&num_candles=3&timeframe=5m"
        );

        let c = b.with_limit(20);
        assert_ne!(a.cache_key(), c.cache_key());
    }

    #[test]
    fn parse_names() {
        assert_eq!(
            "crossing-prev-day-low".parse::<ScreenerKind>(),
            Ok(ScreenerKind::CrossingPrevDayLow)
        );
        assert_eq!("1h".parse::<Timeframe>(), Ok(Timeframe::OneHour));
        assert!("2h".parse::<Timeframe>().is_err());
        assert!("nope".parse::<ScreenerKind>().is_err());
    }
}
