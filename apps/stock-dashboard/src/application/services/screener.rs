//! Screener Service
//!
//! Runs screener searches through the response cache, keyed by the
//! screener path and its full parameter set.

use std::sync::Arc;

use chrono::Utc;

use super::cached::{DataSource, Fetched, SharedCache, cached_items, store_items};
use super::preferences::Preferences;
use crate::application::ports::{ApiError, MarketDataPort};
use crate::domain::screener::ScreenerRequest;
use crate::domain::stock::{StockRecord, normalize_all};
use crate::infrastructure::metrics::{CacheResult, record_cache_lookup};

/// Cached screener searches and symbol lookup.
#[derive(Clone)]
pub struct ScreenerService {
    market: Arc<dyn MarketDataPort>,
    cache: SharedCache,
    preferences: Option<Preferences>,
    expiry_minutes: u32,
}

impl std::fmt::Debug for ScreenerService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScreenerService")
            .field("expiry_minutes", &self.expiry_minutes)
            .finish_non_exhaustive()
    }
}

impl ScreenerService {
    /// Service using the cache's default TTL.
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

    /// Record symbol lookups as recent searches.
    #[must_use]
    pub fn with_preferences(mut self, preferences: Preferences) -> Self {
        self.preferences = Some(preferences);
        self
    }

    /// Run `request`. `force_refresh` skips the cache.
    ///
    /// # Errors
    ///
    /// Returns the backend error when a network fetch is needed and fails.
    pub async fn search(
        &self,
        request: &ScreenerRequest,
        force_refresh: bool,
    ) -> Result<Fetched<Vec<StockRecord>>, ApiError> {
        let key = request.cache_key();
        let dataset = request.kind.path();

        if !force_refresh && let Some(hit) = cached_items(&self.cache, &key) {
            record_cache_lookup(dataset, CacheResult::Hit);
            return Ok(hit.map(|items| normalize_all(&items)));
        }

        record_cache_lookup(dataset, CacheResult::Miss);
        let items = self.market.screener(request).await?;
        tracing::debug!(screener = dataset, key = %key, count = items.len(), "Screener search");
        store_items(&self.cache, &key, &items, self.expiry_minutes);

        Ok(Fetched {
            data: normalize_all(&items),
            source: DataSource::Network,
            fetched_at: Utc::now(),
        })
    }

    /// Look up one symbol and remember it as a recent search.
    ///
    /// # Errors
    ///
    /// Returns the backend error, or [`ApiError::InvalidResponse`] when the
    /// response is not a stock.
    pub async fn lookup_symbol(&self, symbol: &str) -> Result<StockRecord, ApiError> {
        let symbol = symbol.trim().to_uppercase();
        if let Some(prefs) = &self.preferences
            && let Err(e) = prefs.record_search(&symbol)
        {
            tracing::warn!(error = %e, "Failed to record recent search");
        }

        let info = self.market.stock_info(&symbol).await?;
        StockRecord::from_value(&info).map_err(|e| ApiError::InvalidResponse {
            message: e.to_string(),
        })
    }

    /// Drop the cached result of `request`.
    pub fn invalidate(&self, request: &ScreenerRequest) -> bool {
        self.cache.lock().clear_cache_for_key(&request.cache_key())
    }
}
