//! Response Cache
//!
//! In-memory time-to-live cache for API responses, keyed by the request
//! that produced them (e.g. `gainers` or
//! `screener/consecutive-positive?num_candles=3&timeframe=5m`).
//!
//! # Expiry
//!
//! An entry written at `t` with a TTL of `m` minutes is valid while
//! `now - t < m`. Reads never return an expired entry: [`CacheStore::get_cached_data`]
//! removes it on the way out, so the store heals itself without a sweeper.
//! There is no size bound or eviction policy beyond the TTL.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;

use super::clock::{Clock, SystemClock};

/// TTL applied when a write does not specify one.
pub const DEFAULT_EXPIRY_MINUTES: u32 = 5;

/// A cached response.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    /// Cache key.
    pub key: String,
    /// Opaque response payload.
    pub data: Value,
    /// When the entry was written.
    pub timestamp: DateTime<Utc>,
    /// Lifetime in minutes.
    pub expiry_minutes: u32,
}

impl CacheEntry {
    /// Lifetime of this entry.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        Duration::minutes(i64::from(self.expiry_minutes))
    }

    /// Whether the entry is still valid at `now`.
    #[must_use]
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.timestamp) < self.ttl()
    }

    /// Age of the entry at `now`.
    #[must_use]
    pub fn age_at(&self, now: DateTime<Utc>) -> Duration {
        now.signed_duration_since(self.timestamp)
    }
}

/// Time-to-live cache of API responses.
///
/// Every operation is total: missing keys are misses, clearing a missing key
/// does nothing.
#[derive(Debug)]
pub struct CacheStore {
    entries: HashMap<String, CacheEntry>,
    clock: Arc<dyn Clock>,
    default_expiry_minutes: u32,
}

impl Default for CacheStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheStore {
    /// Create an empty store on the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create an empty store reading time from `clock`.
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: HashMap::new(),
            clock,
            default_expiry_minutes: DEFAULT_EXPIRY_MINUTES,
        }
    }

    /// Override the TTL used by [`Self::set_cached_data_for_key`].
    ///
    /// Zero keeps the built-in default.
    #[must_use]
    pub const fn with_default_expiry(mut self, minutes: u32) -> Self {
        if minutes > 0 {
            self.default_expiry_minutes = minutes;
        }
        self
    }

    /// TTL applied to writes without an explicit expiry.
    #[must_use]
    pub const fn default_expiry_minutes(&self) -> u32 {
        self.default_expiry_minutes
    }

    /// Whether a valid entry exists for `key`.
    ///
    /// Unlike [`Self::get_cached_data`] this never mutates the store.
    #[must_use]
    pub fn has_cache(&self, key: &str) -> bool {
        let now = self.clock.now();
        self.entries.get(key).is_some_and(|e| e.is_valid_at(now))
    }

    /// Get the entry for `key` if it is still valid.
    ///
    /// An expired entry is removed and reported as a miss.
    pub fn get_cached_data(&mut self, key: &str) -> Option<&CacheEntry> {
        let now = self.clock.now();
        let valid = self.entries.get(key)?.is_valid_at(now);

        if !valid {
            self.entries.remove(key);
            tracing::debug!(key, "Evicted expired cache entry");
            return None;
        }

        self.entries.get(key)
    }

    /// Store `data` under `key` with the default TTL.
    pub fn set_cached_data_for_key(&mut self, key: impl Into<String>, data: Value) {
        let minutes = self.default_expiry_minutes;
        self.set_cached_data_with_expiry(key, data, minutes);
    }

    /// Store `data` under `key`, replacing any previous entry.
    ///
    /// A zero `expiry_minutes` falls back to the store default.
    pub fn set_cached_data_with_expiry(
        &mut self,
        key: impl Into<String>,
        data: Value,
        expiry_minutes: u32,
    ) {
        let key = key.into();
        let expiry_minutes = if expiry_minutes == 0 {
            self.default_expiry_minutes
        } else {
            expiry_minutes
        };

        let entry = CacheEntry {
            key: key.clone(),
            data,
            timestamp: self.clock.now(),
            expiry_minutes,
        };
        self.entries.insert(key, entry);
    }

    /// Remove every entry, expired or not.
    pub fn clear_cache(&mut self) {
        self.entries.clear();
    }

    /// Remove the entry for `key`, if any.
    ///
    /// Returns whether an entry was removed.
    pub fn clear_cache_for_key(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Number of stored entries, including ones not yet detected as expired.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Stored keys, sorted.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.keys().cloned().collect();
        keys.sort_unstable();
        keys
    }
}

/// Build a cache key from an endpoint path and its encoded query string.
#[must_use]
pub fn request_key(path: &str, query: &str) -> String {
    if query.is_empty() {
        path.to_string()
    } else {
        format!("{path}?{query}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::clock::ManualClock;
    use serde_json::json;

    fn store_at_t0() -> (CacheStore, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let store = CacheStore::with_clock(clock.clone());
        (store, clock)
    }

    #[test]
    fn gainers_scenario() {
        let (mut store, clock) = store_at_t0();
        let data = json!([{ "symbol": "AAPL" }]);
        store.set_cached_data_with_expiry("gainers", data.clone(), 5);

        clock.advance(Duration::minutes(4));
        let entry = store.get_cached_data("gainers").unwrap();
        assert_eq!(entry.data, data);
        assert_eq!(store.len(), 1);

        clock.advance(Duration::minutes(2));
        assert!(store.get_cached_data("gainers").is_none());
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn expiry_boundary_is_a_miss() {
        let (mut store, clock) = store_at_t0();
        store.set_cached_data_with_expiry("k", json!(1), 3);

        clock.advance(Duration::minutes(3) - Duration::milliseconds(1));
        assert!(store.has_cache("k"));
        assert!(store.get_cached_data("k").is_some());

        clock.advance(Duration::milliseconds(1));
        assert!(!store.has_cache("k"));
        assert!(store.get_cached_data("k").is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn has_cache_does_not_evict() {
        let (mut store, clock) = store_at_t0();
        store.set_cached_data_for_key("k", json!("v"));
        clock.advance(Duration::minutes(10));

        assert!(!store.has_cache("k"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn default_expiry_applies() {
        let (mut store, clock) = store_at_t0();
        store.set_cached_data_for_key("k", json!("v"));
        assert_eq!(
            store.get_cached_data("k").unwrap().expiry_minutes,
            DEFAULT_EXPIRY_MINUTES
        );

        clock.advance(Duration::minutes(i64::from(DEFAULT_EXPIRY_MINUTES)));
        assert!(store.get_cached_data("k").is_none());
    }

    #[test]
    fn zero_expiry_uses_default() {
        let mut store = CacheStore::new().with_default_expiry(7);
        store.set_cached_data_with_expiry("k", json!(null), 0);
        assert_eq!(store.get_cached_data("k").unwrap().expiry_minutes, 7);
    }

    #[test]
    fn rewrite_replaces_entry_and_timestamp() {
        let (mut store, clock) = store_at_t0();
        store.set_cached_data_with_expiry("k", json!("old"), 5);
        clock.advance(Duration::minutes(4));
        store.set_cached_data_with_expiry("k", json!("new"), 5);
        clock.advance(Duration::minutes(4));

        let entry = store.get_cached_data("k").unwrap();
        assert_eq!(entry.data, json!("new"));
        assert_eq!(entry.age_at(clock.now()), Duration::minutes(4));
    }

    #[test]
    fn clear_missing_key_is_noop() {
        let (mut store, _clock) = store_at_t0();
        store.set_cached_data_for_key("a", json!(1));

        assert!(!store.clear_cache_for_key("missing"));
        assert_eq!(store.len(), 1);

        assert!(store.clear_cache_for_key("a"));
        assert!(store.is_empty());
    }

    #[test]
    fn clear_cache_drops_valid_and_expired() {
        let (mut store, clock) = store_at_t0();
        store.set_cached_data_with_expiry("short", json!(1), 1);
        store.set_cached_data_with_expiry("long", json!(2), 60);
        clock.advance(Duration::minutes(2));

        store.clear_cache();
        assert!(store.is_empty());
        assert!(!store.has_cache("long"));
    }

    #[test]
    fn keys_are_sorted() {
        let (mut store, _clock) = store_at_t0();
        store.set_cached_data_for_key("losers", json!([]));
        store.set_cached_data_for_key("gainers", json!([]));
        assert_eq!(store.keys(), vec!["gainers", "losers"]);
    }

    #[test]
    fn request_key_formats() {
        assert_eq!(request_key("gainers", ""), "gainers");
        assert_eq!(
            request_key("screener/consecutive-positive", "limit=15"),
            "screener/consecutive-positive?limit=15"
        );
    }
}
