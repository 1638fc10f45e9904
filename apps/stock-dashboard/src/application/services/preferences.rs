//! Local Preferences
//!
//! Favorites, recent searches, the chart fallback flag and per-dataset
//! snapshots, persisted through a [`KeyValueStore`] under fixed keys.
//!
//! Values are JSON. A value that fails to parse is treated as absent; a
//! corrupt snapshot is also removed so the next read starts clean.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::application::ports::{KeyValueStore, StorageError};
use crate::domain::clock::{Clock, SystemClock};

/// Bearer token key.
pub const AUTH_TOKEN_KEY: &str = "auth_token";
/// Favorite symbols key.
pub const FAVORITES_KEY: &str = "favoriteStocks";
/// Recent searches key.
pub const RECENT_SEARCHES_KEY: &str = "recentStockSearches";
/// Chart fallback flag key.
pub const CHART_FALLBACK_KEY: &str = "useChartFallback";

/// Maximum number of recent searches kept.
pub const MAX_RECENT_SEARCHES: usize = 5;

/// How long a dataset snapshot stays usable.
pub const SNAPSHOT_VALIDITY_SECS: i64 = 5 * 60;

/// Storage key for a dataset snapshot.
#[must_use]
pub fn snapshot_key(dataset: &str) -> String {
    format!("homePage_{dataset}")
}

/// A stored dataset with the time it was written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Write time in epoch milliseconds.
    pub timestamp: i64,
    /// Stored payload.
    pub data: Value,
}

impl Snapshot {
    /// Write time.
    #[must_use]
    pub fn written_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.timestamp)
    }
}

/// Preference access over a key-value store.
#[derive(Clone)]
pub struct Preferences {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for Preferences {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Preferences").finish_non_exhaustive()
    }
}

impl Preferences {
    /// Preferences on the system clock.
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    /// Preferences reading time from `clock`.
    #[must_use]
    pub fn with_clock(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError> {
        let Some(raw) = self.store.get(key)? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                tracing::warn!(key, error = %e, "Ignoring unparsable preference");
                Ok(None)
            }
        }
    }

    fn write_json<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let raw = serde_json::to_string(value)?;
        self.store.set(key, &raw)
    }

    // =========================================================================
    // Favorites
    // =========================================================================

    /// Favorite symbols in the order they were added.
    ///
    /// # Errors
    ///
    /// Fails when the store cannot be read.
    pub fn favorites(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.read_json(FAVORITES_KEY)?.unwrap_or_default())
    }

    /// Whether `symbol` is a favorite.
    ///
    /// # Errors
    ///
    /// Fails when the store cannot be read.
    pub fn is_favorite(&self, symbol: &str) -> Result<bool, StorageError> {
        Ok(self.favorites()?.iter().any(|s| s == symbol))
    }

    /// Add or remove `symbol`. Returns whether it is a favorite afterwards.
    ///
    /// # Errors
    ///
    /// Fails when the store cannot be read or written.
    pub fn toggle_favorite(&self, symbol: &str) -> Result<bool, StorageError> {
        let mut favorites = self.favorites()?;
        let now_favorite = if let Some(pos) = favorites.iter().position(|s| s == symbol) {
            favorites.remove(pos);
            false
        } else {
            favorites.push(symbol.to_string());
            true
        };
        self.write_json(FAVORITES_KEY, &favorites)?;
        Ok(now_favorite)
    }

    // =========================================================================
    // Recent Searches
    // =========================================================================

    /// Recent searches, newest first.
    ///
    /// # Errors
    ///
    /// Fails when the store cannot be read.
    pub fn recent_searches(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.read_json(RECENT_SEARCHES_KEY)?.unwrap_or_default())
    }

    /// Record a search. A term already in the list keeps its position; a
    /// new term goes to the front and the list is capped.
    ///
    /// # Errors
    ///
    /// Fails when the store cannot be read or written.
    pub fn record_search(&self, term: &str) -> Result<Vec<String>, StorageError> {
        let term = term.trim();
        let mut recent = self.recent_searches()?;
        if term.is_empty() || recent.iter().any(|s| s == term) {
            return Ok(recent);
        }

        recent.insert(0, term.to_string());
        recent.truncate(MAX_RECENT_SEARCHES);
        self.write_json(RECENT_SEARCHES_KEY, &recent)?;
        Ok(recent)
    }

    // =========================================================================
    // Chart Fallback
    // =========================================================================

    /// Whether charts should use the simpler fallback rendering.
    ///
    /// # Errors
    ///
    /// Fails when the store cannot be read.
    pub fn use_chart_fallback(&self) -> Result<bool, StorageError> {
        Ok(self.store.get(CHART_FALLBACK_KEY)?.as_deref() == Some("true"))
    }

    /// Persist the chart fallback flag.
    ///
    /// # Errors
    ///
    /// Fails when the store cannot be written.
    pub fn set_chart_fallback(&self, enabled: bool) -> Result<(), StorageError> {
        if enabled {
            self.store.set(CHART_FALLBACK_KEY, "true")
        } else {
            self.store.remove(CHART_FALLBACK_KEY)
        }
    }

    // =========================================================================
    // Dataset Snapshots
    // =========================================================================

    /// Store `data` as the latest snapshot of `dataset`.
    ///
    /// # Errors
    ///
    /// Fails when the store cannot be written.
    pub fn save_snapshot(&self, dataset: &str, data: &Value) -> Result<Snapshot, StorageError> {
        let snapshot = Snapshot {
            timestamp: self.clock.now().timestamp_millis(),
            data: data.clone(),
        };
        self.write_json(&snapshot_key(dataset), &snapshot)?;
        Ok(snapshot)
    }

    /// Latest snapshot of `dataset` if younger than the validity window.
    ///
    /// A snapshot that cannot be parsed is removed.
    ///
    /// # Errors
    ///
    /// Fails when the store cannot be read, or a corrupt entry cannot be removed.
    pub fn load_snapshot(&self, dataset: &str) -> Result<Option<Snapshot>, StorageError> {
        let key = snapshot_key(dataset);
        let Some(raw) = self.store.get(&key)? else {
            return Ok(None);
        };

        let snapshot: Snapshot = match serde_json::from_str(&raw) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!(dataset, error = %e, "Removing corrupt snapshot");
                self.store.remove(&key)?;
                return Ok(None);
            }
        };

        let age = self.clock.now().timestamp_millis() - snapshot.timestamp;
        if age < Duration::seconds(SNAPSHOT_VALIDITY_SECS).num_milliseconds() {
            Ok(Some(snapshot))
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::MemoryStore;
    use crate::domain::clock::ManualClock;
    use serde_json::json;

    fn prefs() -> (Preferences, Arc<MemoryStore>, Arc<ManualClock>) {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let prefs = Preferences::with_clock(store.clone(), clock.clone());
        (prefs, store, clock)
    }

    #[test]
    fn toggle_favorite_adds_then_removes() {
        let (p, store, _) = prefs();
        assert!(p.toggle_favorite("AAPL").unwrap());
        assert!(p.toggle_favorite("MSFT").unwrap());
        assert_eq!(p.favorites().unwrap(), vec!["AAPL", "MSFT"]);
        assert_eq!(
            store.get(FAVORITES_KEY).unwrap().as_deref(),
            Some(r#"["AAPL","MSFT"]"#)
        );

        assert!(!p.toggle_favorite("AAPL").unwrap());
        assert!(!p.is_favorite("AAPL").unwrap());
        assert!(p.is_favorite("MSFT").unwrap());
    }

    #[test]
    fn recent_searches_capped_and_deduplicated() {
        let (p, _, _) = prefs();
        for term in ["A", "B", "C", "D", "E", "F"] {
            p.record_search(term).unwrap();
        }
        assert_eq!(p.recent_searches().unwrap(), vec!["F", "E", "D", "C", "B"]);

        let after = p.record_search("D").unwrap();
        assert_eq!(after, vec!["F", "E", "D", "C", "B"]);

        p.record_search("   ").unwrap();
        assert_eq!(p.recent_searches().unwrap().len(), MAX_RECENT_SEARCHES);
    }

    #[test]
    fn unparsable_favorites_read_as_empty() {
        let (p, store, _) = prefs();
        store.set(FAVORITES_KEY, "not json").unwrap();
        assert!(p.favorites().unwrap().is_empty());
    }

    #[test]
    fn chart_fallback_flag() {
        let (p, store, _) = prefs();
        assert!(!p.use_chart_fallback().unwrap());
        p.set_chart_fallback(true).unwrap();
        assert!(p.use_chart_fallback().unwrap());
        assert_eq!(store.get(CHART_FALLBACK_KEY).unwrap().as_deref(), Some("true"));
        p.set_chart_fallback(false).unwrap();
        assert!(!p.use_chart_fallback().unwrap());
    }

    #[test]
    fn snapshot_valid_for_five_minutes() {
        let (p, _, clock) = prefs();
        let data = json!([{ "symbol": "AAPL" }]);
        p.save_snapshot("topGainers", &data).unwrap();

        clock.advance(Duration::minutes(4));
        assert_eq!(p.load_snapshot("topGainers").unwrap().unwrap().data, data);

        clock.advance(Duration::minutes(1));
        assert!(p.load_snapshot("topGainers").unwrap().is_none());
    }

    #[test]
    fn corrupt_snapshot_is_removed() {
        let (p, store, _) = prefs();
        store.set(&snapshot_key("mostActive"), "{broken").unwrap();

        assert!(p.load_snapshot("mostActive").unwrap().is_none());
        assert!(store.get("homePage_mostActive").unwrap().is_none());
    }
}
