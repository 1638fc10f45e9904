//! Cache-then-network plumbing shared by the data services.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde_json::Value;

use crate::domain::cache::CacheStore;

/// Response cache shared between services.
///
/// The lock is never held across an `.await`.
pub type SharedCache = Arc<Mutex<CacheStore>>;

/// Wrap a store for sharing.
#[must_use]
pub fn shared_cache(store: CacheStore) -> SharedCache {
    Arc::new(Mutex::new(store))
}

/// Where a result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    /// In-memory response cache.
    Memory,
    /// Persisted dataset snapshot.
    Snapshot,
    /// Backend request.
    Network,
}

/// A result with its provenance.
#[derive(Debug, Clone, PartialEq)]
pub struct Fetched<T> {
    /// The data.
    pub data: T,
    /// Where it came from.
    pub source: DataSource,
    /// When it was fetched from the backend.
    pub fetched_at: DateTime<Utc>,
}

impl<T> Fetched<T> {
    /// Transform the data, keeping provenance.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Fetched<U> {
        Fetched {
            data: f(self.data),
            source: self.source,
            fetched_at: self.fetched_at,
        }
    }

    /// Whether the data came from the backend just now.
    #[must_use]
    pub const fn is_fresh(&self) -> bool {
        matches!(self.source, DataSource::Network)
    }
}

/// Valid cached items under `key`.
pub(crate) fn cached_items(cache: &SharedCache, key: &str) -> Option<Fetched<Vec<Value>>> {
    let mut store = cache.lock();
    let entry = store.get_cached_data(key)?;
    Some(Fetched {
        data: as_items(&entry.data),
        source: DataSource::Memory,
        fetched_at: entry.timestamp,
    })
}

/// Store `items` under `key` with `expiry_minutes` (0 for the store default).
pub(crate) fn store_items(cache: &SharedCache, key: &str, items: &[Value], expiry_minutes: u32) {
    cache
        .lock()
        .set_cached_data_with_expiry(key, Value::Array(items.to_vec()), expiry_minutes);
}

/// Items of a JSON array, or nothing for any other value.
pub(crate) fn as_items(value: &Value) -> Vec<Value> {
    value.as_array().cloned().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn store_then_read_items() {
        let cache = shared_cache(CacheStore::new());
        store_items(&cache, "k", &[json!({"symbol": "A"})], 0);

        let hit = cached_items(&cache, "k").unwrap();
        assert_eq!(hit.source, DataSource::Memory);
        assert_eq!(hit.data.len(), 1);
        assert!(!hit.is_fresh());
        assert!(cached_items(&cache, "missing").is_none());
    }

    #[test]
    fn non_array_reads_as_empty() {
        assert!(as_items(&json!({"stocks": []})).is_empty());
    }

    #[test]
    fn map_keeps_provenance() {
        let f = Fetched {
            data: 2,
            source: DataSource::Snapshot,
            fetched_at: Utc::now(),
        };
        let g = f.clone().map(|n| n * 2);
        assert_eq!(g.data, 4);
        assert_eq!(g.source, f.source);
        assert_eq!(g.fetched_at, f.fetched_at);
    }
}
