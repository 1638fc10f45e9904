//! Notifications
//!
//! Live-feed messages become [`NotificationEvent`]s held in a bounded,
//! newest-first [`NotificationList`]. The list never holds more than
//! [`MAX_NOTIFICATIONS`] entries; pushing onto a full list drops the oldest.
//!
//! [`NotificationCenter`] wraps the list for sharing between the feed
//! listener (producer) and whatever renders or logs notifications (consumer).

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use super::clock::{Clock, SystemClock};
use super::stock::{StockRecord, format_percentage, format_price};

/// Maximum number of notifications kept.
pub const MAX_NOTIFICATIONS: usize = 10;

/// How long a notification stays visible before it is swept.
pub const DEFAULT_DISPLAY_SECS: u64 = 10;

// =============================================================================
// Events
// =============================================================================

/// Which feed message produced a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// A stock newly crossed above the previous day's high.
    CrossingStock,
    /// A breakout alert above the previous day's high.
    Breakout,
}

/// Display severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationLevel {
    /// Positive signal.
    Success,
    /// Attention required.
    Warning,
}

/// A user-visible notification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationEvent {
    /// Unique id, used for dismissal.
    pub id: Uuid,
    /// Source message kind.
    pub kind: NotificationKind,
    /// Display severity.
    pub level: NotificationLevel,
    /// Headline.
    pub title: String,
    /// Detail text.
    pub body: String,
    /// When the notification was created.
    pub timestamp: DateTime<Utc>,
    /// Raw feed item.
    pub payload: Value,
}

impl NotificationEvent {
    /// Build a notification for a stock that crossed the previous day's high.
    #[must_use]
    pub fn crossing(stock: &StockRecord, payload: Value, at: DateTime<Utc>) -> Self {
        let body = format!(
            "{}: price {}, change {}, above prev high {}",
            stock.display_name(),
            format_price(stock.price),
            format_percentage(stock.change_percent),
            format_percentage(stock.percent_above_prev_high),
        );

        Self {
            id: Uuid::new_v4(),
            kind: NotificationKind::CrossingStock,
            level: NotificationLevel::Success,
            title: format!("{} Crossed Above Previous Day High!", stock.symbol),
            body,
            timestamp: at,
            payload,
        }
    }

    /// Build a breakout alert notification.
    #[must_use]
    pub fn breakout(stock: &StockRecord, payload: Value, at: DateTime<Utc>) -> Self {
        let mut body = format!(
            "{} just crossed above previous day high of {}: price {}, change {}",
            stock.display_name(),
            format_price(stock.previous_day_high),
            format_price(stock.price),
            format_percentage(stock.change_percent),
        );
        if stock.percent_above_prev_high.is_some() {
            body.push_str(", above prev high ");
            body.push_str(&format_percentage(stock.percent_above_prev_high));
        }

        Self {
            id: Uuid::new_v4(),
            kind: NotificationKind::Breakout,
            level: NotificationLevel::Warning,
            title: format!("{} - Breakout Alert!", stock.symbol),
            body,
            timestamp: at,
            payload,
        }
    }

    /// Build the notification for `kind` from one raw feed item.
    ///
    /// Returns `None` when the item cannot be read as a stock.
    #[must_use]
    pub fn from_item(kind: NotificationKind, item: &Value, at: DateTime<Utc>) -> Option<Self> {
        let stock = match StockRecord::from_value(item) {
            Ok(stock) => stock,
            Err(e) => {
                tracing::warn!(error = %e, "Dropping feed item");
                return None;
            }
        };

        Some(match kind {
            NotificationKind::CrossingStock => Self::crossing(&stock, item.clone(), at),
            NotificationKind::Breakout => Self::breakout(&stock, item.clone(), at),
        })
    }
}

// =============================================================================
// Bounded List
// =============================================================================

/// Newest-first list of notifications with a fixed capacity.
#[derive(Debug, Clone)]
pub struct NotificationList {
    items: VecDeque<NotificationEvent>,
    capacity: usize,
}

impl Default for NotificationList {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationList {
    /// Empty list holding at most [`MAX_NOTIFICATIONS`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(MAX_NOTIFICATIONS)
    }

    /// Empty list holding at most `capacity` entries (minimum 1).
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Prepend `event`, returning the entry dropped to stay within capacity.
    pub fn push(&mut self, event: NotificationEvent) -> Option<NotificationEvent> {
        self.items.push_front(event);
        if self.items.len() > self.capacity {
            self.items.pop_back()
        } else {
            None
        }
    }

    /// Remove the notification with `id`. Returns whether it was present.
    pub fn dismiss(&mut self, id: Uuid) -> bool {
        let before = self.items.len();
        self.items.retain(|n| n.id != id);
        self.items.len() != before
    }

    /// Remove notifications created more than `display` before `now`.
    ///
    /// Returns how many were removed.
    pub fn expire_older_than(&mut self, now: DateTime<Utc>, display: Duration) -> usize {
        let before = self.items.len();
        self.items
            .retain(|n| now.signed_duration_since(n.timestamp) < display);
        before - self.items.len()
    }

    /// Remove every notification.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Notifications, newest first.
    pub fn iter(&self) -> impl Iterator<Item = &NotificationEvent> {
        self.items.iter()
    }

    /// Most recent notification.
    #[must_use]
    pub fn latest(&self) -> Option<&NotificationEvent> {
        self.items.front()
    }

    /// Number of notifications.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the list is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Maximum number of entries.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }
}

// =============================================================================
// Shared Center
// =============================================================================

/// Thread-safe notification list with automatic expiry.
#[derive(Debug)]
pub struct NotificationCenter {
    list: Mutex<NotificationList>,
    clock: Arc<dyn Clock>,
    display: Duration,
}

impl Default for NotificationCenter {
    fn default() -> Self {
        Self::new(std::time::Duration::from_secs(DEFAULT_DISPLAY_SECS))
    }
}

impl NotificationCenter {
    /// Create a center on the system clock.
    #[must_use]
    pub fn new(display: std::time::Duration) -> Self {
        Self::with_clock(display, Arc::new(SystemClock))
    }

    /// Create a center reading time from `clock`.
    ///
    /// A `display` too long to represent never expires.
    #[must_use]
    pub fn with_clock(display: std::time::Duration, clock: Arc<dyn Clock>) -> Self {
        let display = Duration::from_std(display).unwrap_or(Duration::MAX);
        Self {
            list: Mutex::new(NotificationList::new()),
            clock,
            display,
        }
    }

    /// Current time on the center's clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Prepend a batch of events in arrival order.
    pub fn publish(&self, events: impl IntoIterator<Item = NotificationEvent>) {
        let mut list = self.list.lock();
        for event in events {
            tracing::info!(id = %event.id, title = %event.title, "Notification");
            if let Some(dropped) = list.push(event) {
                tracing::debug!(id = %dropped.id, "Dropped oldest notification");
            }
        }
    }

    /// Dismiss one notification.
    pub fn dismiss(&self, id: Uuid) -> bool {
        self.list.lock().dismiss(id)
    }

    /// Remove notifications past their display time.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now();
        self.list.lock().expire_older_than(now, self.display)
    }

    /// Copy of the current notifications, newest first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<NotificationEvent> {
        self.list.lock().iter().cloned().collect()
    }

    /// Number of notifications held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.list.lock().len()
    }

    /// Whether no notifications are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.list.lock().is_empty()
    }

    /// Remove every notification.
    pub fn clear(&self) {
        self.list.lock().clear();
    }
}
