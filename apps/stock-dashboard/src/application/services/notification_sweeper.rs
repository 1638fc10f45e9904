//! Notification Sweeper
//!
//! Background task removing notifications past their display time.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::domain::notifications::NotificationCenter;

/// Periodically expires notifications.
#[derive(Debug)]
pub struct NotificationSweeper {
    center: Arc<NotificationCenter>,
    interval: Duration,
    cancel: CancellationToken,
}

impl NotificationSweeper {
    /// Create a sweeper checking every `interval`.
    #[must_use]
    pub const fn new(
        center: Arc<NotificationCenter>,
        interval: Duration,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            center,
            interval,
            cancel,
        }
    }

    /// Run until cancelled.
    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                () = self.cancel.cancelled() => {
                    tracing::debug!("Notification sweeper stopped");
                    break;
                }
                _ = ticker.tick() => {
                    let removed = self.center.sweep();
                    if removed > 0 {
                        tracing::debug!(removed, "Expired notifications");
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::clock::ManualClock;
    use crate::domain::notifications::{NotificationEvent, NotificationKind};
    use chrono::Utc;
    use serde_json::json;

    #[tokio::test(start_paused = true)]
    async fn sweeps_until_cancelled() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let center = Arc::new(NotificationCenter::with_clock(
            Duration::from_secs(10),
            clock.clone(),
        ));
        let event = NotificationEvent::from_item(
            NotificationKind::Breakout,
            &json!({"symbol": "AMD"}),
            center.now(),
        )
        .unwrap();
        center.publish([event]);

        let cancel = CancellationToken::new();
        let sweeper = NotificationSweeper::new(center.clone(), Duration::from_secs(1), cancel.clone());
        let handle = tokio::spawn(sweeper.run());

        clock.advance(chrono::Duration::seconds(11));
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(center.is_empty());

        cancel.cancel();
        handle.await.unwrap();
    }
}
