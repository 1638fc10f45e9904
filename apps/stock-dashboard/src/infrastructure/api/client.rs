//! Dashboard backend adapter.
//!
//! Implements the market data, alerts and auth ports over
//! [`DashboardHttpClient`]. List endpoints hand back their raw items;
//! normalization happens in the services.

use std::borrow::Cow;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::api_types::{
    AlertTypesResponse, AlertsResponse, HistoryResponse, PopularResponse, SearchResponse,
    StockListResponse, TriggeredAlertsResponse,
};
use super::config::ApiClientConfig;
use super::error::HttpError;
use super::http_client::DashboardHttpClient;
use crate::application::ports::{
    AlertsPort, ApiError, AuthPort, MarketDataPort, NewUser, TokenResponse, UserProfile,
};
use crate::domain::alerts::{Alert, AlertMutation, AlertTypeInfo, AlertUpdate, NewAlert, TriggeredAlert};
use crate::domain::screener::ScreenerRequest;
use crate::domain::stock::{MoverKind, PriceBar};

/// REST adapter for the dashboard backend.
#[derive(Debug, Clone)]
pub struct DashboardApiClient {
    http: Arc<DashboardHttpClient>,
}

impl DashboardApiClient {
    /// Create an adapter from config.
    ///
    /// # Errors
    ///
    /// Fails when the HTTP client cannot be built.
    pub fn new(config: &ApiClientConfig) -> Result<Self, HttpError> {
        Ok(Self {
            http: Arc::new(DashboardHttpClient::new(config)?),
        })
    }

    /// Backend base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.http.base_url()
    }

    async fn list(&self, path: &str, query: &[(&str, &str)]) -> Result<Vec<Value>, ApiError> {
        let response: StockListResponse = self.http.get(path, query).await?;
        Ok(response.into_items())
    }
}

/// Percent-encode one path segment.
fn path_segment(raw: &str) -> Cow<'_, str> {
    urlencoding::encode(raw)
}

#[async_trait]
impl MarketDataPort for DashboardApiClient {
    async fn popular_stocks(&self) -> Result<Vec<Value>, ApiError> {
        let response: PopularResponse = self.http.get("/api/stocks/popular", &[]).await?;
        Ok(response.popular_stocks)
    }

    async fn search(&self, query: &str) -> Result<Vec<Value>, ApiError> {
        let response: SearchResponse = self
            .http
            .get("/api/stocks/search", &[("query", query)])
            .await?;
        Ok(response.results)
    }

    async fn stock_info(&self, symbol: &str) -> Result<Value, ApiError> {
        let path = format!("/api/stocks/info/{}", path_segment(symbol));
        Ok(self.http.get(&path, &[]).await?)
    }

    async fn stock_price(&self, symbol: &str) -> Result<Value, ApiError> {
        let path = format!("/api/stocks/price/{}", path_segment(symbol));
        Ok(self.http.get(&path, &[]).await?)
    }

    async fn history(&self, symbol: &str, period: &str) -> Result<Vec<PriceBar>, ApiError> {
        let path = format!("/api/stocks/history/{}", path_segment(symbol));
        let response: HistoryResponse = self.http.get(&path, &[("period", period)]).await?;
        Ok(response.history)
    }

    async fn movers(&self, kind: MoverKind, limit: u32) -> Result<Vec<Value>, ApiError> {
        let path = format!("/api/stocks/{}", kind.path());
        let limit = limit.to_string();
        self.list(&path, &[("limit", limit.as_str())]).await
    }

    async fn screener(&self, request: &ScreenerRequest) -> Result<Vec<Value>, ApiError> {
        let query = request.to_query();
        self.list(&request.endpoint(), &query.pairs()).await
    }
}

#[async_trait]
impl AlertsPort for DashboardApiClient {
    async fn create_alert(&self, alert: &NewAlert) -> Result<AlertMutation, ApiError> {
        Ok(self.http.post_json("/api/alerts/create", alert).await?)
    }

    async fn user_alerts(&self, email: &str) -> Result<Vec<Alert>, ApiError> {
        let path = format!("/api/alerts/user/{}", path_segment(email));
        let response: AlertsResponse = self.http.get(&path, &[]).await?;
        Ok(response.alerts)
    }

    async fn update_alert(&self, id: i64, update: &AlertUpdate) -> Result<AlertMutation, ApiError> {
        Ok(self.http.put_json(&format!("/api/alerts/{id}"), update).await?)
    }

    async fn delete_alert(&self, id: i64) -> Result<AlertMutation, ApiError> {
        Ok(self.http.delete(&format!("/api/alerts/{id}")).await?)
    }

    async fn triggered_alerts(&self) -> Result<Vec<TriggeredAlert>, ApiError> {
        let response: TriggeredAlertsResponse = self.http.get("/api/alerts/triggered", &[]).await?;
        Ok(response.triggered_alerts)
    }

    async fn alert_types(&self) -> Result<Vec<AlertTypeInfo>, ApiError> {
        let response: AlertTypesResponse = self.http.get("/api/alerts/types", &[]).await?;
        Ok(response.alert_types)
    }
}

#[async_trait]
impl AuthPort for DashboardApiClient {
    async fn login(&self, username: &str, password: &str) -> Result<TokenResponse, ApiError> {
        let form = [("username", username), ("password", password)];
        Ok(self.http.post_form("/api/auth/token", &form).await?)
    }

    async fn register(&self, user: &NewUser) -> Result<UserProfile, ApiError> {
        Ok(self.http.post_json("/api/auth/register", user).await?)
    }

    async fn current_user(&self) -> Result<UserProfile, ApiError> {
        Ok(self.http.get("/api/auth/me", &[]).await?)
    }

    fn set_bearer_token(&self, token: Option<String>) {
        self.http.set_bearer_token(token);
    }
}
