//! Application Services
//!
//! Services composing the response cache, the ports and the record adapter.
//!
//! - `MoversService`: cached gainer/loser/most-active lists
//! - `ScreenerService`: cached screener searches and symbol lookup
//! - `SessionService`: login, logout and token persistence
//! - `Preferences`: favorites, recent searches and dataset snapshots
//! - `NotificationSweeper`: expires notifications past their display time

mod cached;
mod movers;
mod notification_sweeper;
mod preferences;
mod screener;
mod session;

pub use cached::{DataSource, Fetched, SharedCache, shared_cache};
pub use movers::{DEFAULT_MOVERS_LIMIT, MoversBoard, MoversService};
pub use notification_sweeper::NotificationSweeper;
pub use preferences::{
    AUTH_TOKEN_KEY, CHART_FALLBACK_KEY, FAVORITES_KEY, MAX_RECENT_SEARCHES, Preferences,
    RECENT_SEARCHES_KEY, SNAPSHOT_VALIDITY_SECS, Snapshot, snapshot_key,
};
pub use screener::ScreenerService;
pub use session::{SessionError, SessionService};
