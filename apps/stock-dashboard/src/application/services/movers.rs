//! Movers Service
//!
//! Ranked gainer/loser/most-active lists. Lookups go memory cache, then the
//! persisted snapshot, then the backend; a backend result refreshes both.

use std::sync::Arc;

use chrono::Utc;

use super::cached::{DataSource, Fetched, SharedCache, cached_items, store_items};
use super::preferences::Preferences;
use crate::application::ports::{ApiError, MarketDataPort};
use crate::domain::cache::request_key;
use crate::domain::stock::{MoverKind, StockRecord, normalize_all};
use crate::infrastructure::metrics::{CacheResult, record_cache_lookup};

/// Default number of rows per mover list.
pub const DEFAULT_MOVERS_LIMIT: u32 = 10;

/// All three mover lists. Each list fails independently.
#[derive(Debug)]
pub struct MoversBoard {
    /// Top gainers.
    pub gainers: Result<Fetched<Vec<StockRecord>>, ApiError>,
    /// Top losers.
    pub losers: Result<Fetched<Vec<StockRecord>>, ApiError>,
    /// Most active.
    pub most_active: Result<Fetched<Vec<StockRecord>>, ApiError>,
}

/// Cached access to mover lists.
#[derive(Clone)]
pub struct MoversService {
    market: Arc<dyn MarketDataPort>,
    cache: SharedCache,
    preferences: Option<Preferences>,
    expiry_minutes: u32,
}

impl std::fmt::Debug for MoversService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MoversService")
            .field("expiry_minutes", &self.expiry_minutes)
            .field("snapshots", &self.preferences.is_some())
            .finish_non_exhaustive()
    }
}

impl MoversService {
    /// Service using the cache's default TTL and no snapshots.
    #[must_use]
    pub fn new(market: Arc<dyn MarketDataPort>, cache: SharedCache) -> Self {
        Self {
            market,
            cache,
            preferences: None,
            expiry_minutes: 0,
        }
    }

    /// Cache results for `minutes` (0 for the cache default).
    #[must_use]
    pub const fn with_expiry(mut self, minutes: u32) -> Self {
        self.expiry_minutes = minutes;
        self
    }

    /// Persist and reuse dataset snapshots.
    #[must_use]
    pub fn with_snapshots(mut self, preferences: Preferences) -> Self {
        self.preferences = Some(preferences);
        self
    }

    /// Cache key for a mover list.
    #[must_use]
    pub fn cache_key(kind: MoverKind, limit: u32) -> String {
        request_key(kind.cache_key(), &format!("limit={limit}"))
    }

    /// Snapshot dataset for a mover list, e.g. `topGainers_10`.
    #[must_use]
    pub fn snapshot_dataset(kind: MoverKind, limit: u32) -> String {
        format!("{}_{limit}", kind.dataset())
    }

    /// One mover list. `force_refresh` skips both caches.
    ///
    /// # Errors
    ///
    /// Returns the backend error when a network fetch is needed and fails.
    pub async fn movers(
        &self,
        kind: MoverKind,
        limit: u32,
        force_refresh: bool,
    ) -> Result<Fetched<Vec<StockRecord>>, ApiError> {
        let key = Self::cache_key(kind, limit);

        if !force_refresh {
            if let Some(hit) = cached_items(&self.cache, &key) {
                record_cache_lookup(kind.cache_key(), CacheResult::Hit);
                return Ok(hit.map(|items| normalize_all(&items)));
            }
            if let Some(hit) = self.snapshot(kind, limit, &key) {
                record_cache_lookup(kind.cache_key(), CacheResult::Snapshot);
                return Ok(hit.map(|items| normalize_all(&items)));
            }
        }

        record_cache_lookup(kind.cache_key(), CacheResult::Miss);
        let items = self.market.movers(kind, limit).await?;
        tracing::debug!(list = kind.cache_key(), count = items.len(), "Fetched movers");

        store_items(&self.cache, &key, &items, self.expiry_minutes);
        if let Some(prefs) = &self.preferences {
            let dataset = Self::snapshot_dataset(kind, limit);
            if let Err(e) = prefs.save_snapshot(&dataset, &serde_json::Value::Array(items.clone())) {
                tracing::warn!(dataset = %dataset, error = %e, "Failed to save snapshot");
            }
        }

        Ok(Fetched {
            data: normalize_all(&items),
            source: DataSource::Network,
            fetched_at: Utc::now(),
        })
    }

    fn snapshot(
        &self,
        kind: MoverKind,
        limit: u32,
        key: &str,
    ) -> Option<Fetched<Vec<serde_json::Value>>> {
        let prefs = self.preferences.as_ref()?;
        let dataset = Self::snapshot_dataset(kind, limit);
        let snapshot = match prefs.load_snapshot(&dataset) {
            Ok(snapshot) => snapshot?,
            Err(e) => {
                tracing::warn!(dataset = %dataset, error = %e, "Failed to read snapshot");
                return None;
            }
        };

        let items = super::cached::as_items(&snapshot.data);
        store_items(&self.cache, key, &items, self.expiry_minutes);
        Some(Fetched {
            data: items,
            source: DataSource::Snapshot,
            fetched_at: snapshot.written_at().unwrap_or_else(Utc::now),
        })
    }

    /// All three lists, fetched concurrently.
    pub async fn board(&self, limit: u32, force_refresh: bool) -> MoversBoard {
        let (gainers, losers, most_active) = tokio::join!(
            self.movers(MoverKind::Gainers, limit, force_refresh),
            self.movers(MoverKind::Losers, limit, force_refresh),
            self.movers(MoverKind::MostActive, limit, force_refresh),
        );
        MoversBoard {
            gainers,
            losers,
            most_active,
        }
    }

    /// Drop every cached mover list for `limit`.
    pub fn invalidate(&self, limit: u32) {
        let mut cache = self.cache.lock();
        for kind in MoverKind::all() {
            cache.clear_cache_for_key(&Self::cache_key(*kind, limit));
        }
    }
}
