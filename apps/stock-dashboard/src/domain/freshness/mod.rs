//! Freshness Tracking
//!
//! Flags symbols that newly appear in a refreshed result set. A symbol is
//! recorded the first time it shows up in a result that the previous result
//! did not contain, and stays "new" for [`NEW_FLAG_DURATION_SECS`].
//!
//! The tracker is an ordinary value owned by whoever polls the screener;
//! each poller gets its own first-seen history.

use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use super::clock::{Clock, SystemClock};
use super::stock::StockRecord;

/// How long a symbol keeps its "new" flag.
pub const NEW_FLAG_DURATION_SECS: i64 = 120;

/// A record paired with its freshness flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FreshRecord {
    /// The stock.
    pub record: StockRecord,
    /// Whether it appeared within the flag window.
    pub is_new: bool,
}

/// First-seen bookkeeping for one refreshing result list.
#[derive(Debug)]
pub struct FreshnessTracker {
    first_seen: HashMap<String, DateTime<Utc>>,
    previous: HashSet<String>,
    flag_duration: Duration,
    clock: Arc<dyn Clock>,
}

impl Default for FreshnessTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl FreshnessTracker {
    /// Tracker on the system clock with the default flag window.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Tracker reading time from `clock`.
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            first_seen: HashMap::new(),
            previous: HashSet::new(),
            flag_duration: Duration::seconds(NEW_FLAG_DURATION_SECS),
            clock,
        }
    }

    /// Override the flag window.
    #[must_use]
    pub const fn with_flag_duration(mut self, duration: Duration) -> Self {
        self.flag_duration = duration;
        self
    }

    /// Record a refreshed result set and return the symbols first seen now.
    ///
    /// A symbol is first seen when it was absent from the previous set and
    /// has no live first-seen record.
    pub fn observe<'a>(&mut self, symbols: impl IntoIterator<Item = &'a str>) -> Vec<String> {
        let now = self.clock.now();
        let current: HashSet<String> = symbols.into_iter().map(str::to_string).collect();

        let mut fresh: Vec<String> = current
            .iter()
            .filter(|s| !self.previous.contains(*s) && !self.first_seen.contains_key(*s))
            .cloned()
            .collect();
        fresh.sort_unstable();

        for symbol in &fresh {
            tracing::debug!(symbol = %symbol, "New symbol detected");
            self.first_seen.insert(symbol.clone(), now);
        }

        self.previous = current;
        fresh
    }

    /// Whether `symbol` is inside its flag window.
    #[must_use]
    pub fn is_new(&self, symbol: &str) -> bool {
        let now = self.clock.now();
        self.first_seen
            .get(symbol)
            .is_some_and(|seen| now.signed_duration_since(*seen) < self.flag_duration)
    }

    /// First-seen time of `symbol`, if recorded.
    #[must_use]
    pub fn first_seen(&self, symbol: &str) -> Option<DateTime<Utc>> {
        self.first_seen.get(symbol).copied()
    }

    /// Forget sightings older than the flag window. Returns how many were dropped.
    pub fn cleanup_expired(&mut self) -> usize {
        let now = self.clock.now();
        let window = self.flag_duration;
        let before = self.first_seen.len();
        self.first_seen
            .retain(|_, seen| now.signed_duration_since(*seen) < window);
        before - self.first_seen.len()
    }

    /// Order records by first-seen time, most recent first. Records never
    /// seen keep their relative order at the end.
    pub fn sort_newest_first(&self, records: &mut [StockRecord]) {
        records.sort_by_key(|r| Reverse(self.first_seen.get(&r.symbol).copied()));
    }

    /// Observe `records`, sort them newest first and attach flags.
    pub fn refresh(&mut self, mut records: Vec<StockRecord>) -> Vec<FreshRecord> {
        self.observe(records.iter().map(|r| r.symbol.as_str()));
        self.sort_newest_first(&mut records);
        records
            .into_iter()
            .map(|record| FreshRecord {
                is_new: self.is_new(&record.symbol),
                record,
            })
            .collect()
    }

    /// Number of tracked sightings.
    #[must_use]
    pub fn tracked(&self) -> usize {
        self.first_seen.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::clock::ManualClock;

    fn tracker() -> (FreshnessTracker, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        (FreshnessTracker::with_clock(clock.clone()), clock)
    }

    #[test]
    fn new_symbols_flagged_for_two_minutes() {
        let (mut t, clock) = tracker();
        assert_eq!(t.observe(["AAPL"]), vec!["AAPL"]);

        clock.advance(Duration::seconds(30));
        assert_eq!(t.observe(["AAPL", "MSFT"]), vec!["MSFT"]);
        assert!(t.is_new("AAPL"));

        clock.advance(Duration::seconds(90));
        assert!(!t.is_new("AAPL"));
        assert!(t.is_new("MSFT"));
        assert!(!t.is_new("TSLA"));
    }

    #[test]
    fn symbol_present_last_time_is_not_new_again() {
        let (mut t, clock) = tracker();
        t.observe(["AAPL"]);
        clock.advance(Duration::minutes(5));
        assert_eq!(t.cleanup_expired(), 1);

        assert!(t.observe(["AAPL"]).is_empty());
        assert!(!t.is_new("AAPL"));
    }

    #[test]
    fn symbol_returning_after_absence_is_new_again() {
        let (mut t, clock) = tracker();
        t.observe(["AAPL"]);
        clock.advance(Duration::minutes(3));
        t.cleanup_expired();
        t.observe(["MSFT"]);

        assert_eq!(t.observe(["AAPL", "MSFT"]), vec!["AAPL"]);
        assert!(t.is_new("AAPL"));
    }

    #[test]
    fn cleanup_keeps_live_sightings() {
        let (mut t, clock) = tracker();
        t.observe(["A"]);
        clock.advance(Duration::seconds(100));
        t.observe(["A", "B"]);
        clock.advance(Duration::seconds(30));

        assert_eq!(t.cleanup_expired(), 1);
        assert_eq!(t.tracked(), 1);
        assert!(t.first_seen("B").is_some());
    }

    #[test]
    fn refresh_sorts_newest_first() {
        let (mut t, clock) = tracker();
        t.observe(["OLD"]);
        clock.advance(Duration::seconds(10));

        let out = t.refresh(vec![StockRecord::new("OLD"), StockRecord::new("NEW")]);
        let symbols: Vec<_> = out.iter().map(|f| f.record.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["NEW", "OLD"]);
        assert!(out.iter().all(|f| f.is_new));
    }

    #[test]
    fn unseen_records_sort_last() {
        let (mut t, _clock) = tracker();
        t.observe(["B"]);
        let mut records = vec![StockRecord::new("X"), StockRecord::new("B")];
        t.sort_newest_first(&mut records);
        assert_eq!(records[0].symbol, "B");
    }
}
