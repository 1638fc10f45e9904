//! Alerts Port (Driven Port)

use async_trait::async_trait;

use super::ApiError;
use crate::domain::alerts::{Alert, AlertMutation, AlertTypeInfo, AlertUpdate, NewAlert, TriggeredAlert};

/// Port for price-alert management.
#[async_trait]
pub trait AlertsPort: Send + Sync {
    /// Create an alert.
    async fn create_alert(&self, alert: &NewAlert) -> Result<AlertMutation, ApiError>;

    /// Alerts owned by `email`.
    async fn user_alerts(&self, email: &str) -> Result<Vec<Alert>, ApiError>;

    /// Apply a partial update.
    async fn update_alert(&self, id: i64, update: &AlertUpdate) -> Result<AlertMutation, ApiError>;

    /// Delete an alert.
    async fn delete_alert(&self, id: i64) -> Result<AlertMutation, ApiError>;

    /// Recently fired alerts.
    async fn triggered_alerts(&self) -> Result<Vec<TriggeredAlert>, ApiError>;

    /// Alert types the backend supports.
    async fn alert_types(&self) -> Result<Vec<AlertTypeInfo>, ApiError>;
}
