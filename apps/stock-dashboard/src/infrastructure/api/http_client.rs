//! HTTP client wrapper with retry logic.
//!
//! Transient failures (transport errors, 408/5xx, 429) are retried with
//! exponential backoff. `POST` is only retried when the request never left
//! the client, so a create is not applied twice.

use std::time::{Duration, Instant};

use parking_lot::RwLock;
use reqwest::header::{AUTHORIZATION, RETRY_AFTER};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::api_types::ErrorResponse;
use super::config::{ApiClientConfig, RetryConfig};
use super::error::HttpError;
use crate::infrastructure::metrics::record_api_request;

/// Request body.
#[derive(Debug)]
pub enum Body<'a, B: Serialize> {
    /// No body.
    Empty,
    /// JSON body.
    Json(&'a B),
    /// `application/x-www-form-urlencoded` body.
    Form(&'a B),
}

impl<B: Serialize> Clone for Body<'_, B> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<B: Serialize> Copy for Body<'_, B> {}

/// HTTP client for the dashboard backend.
#[derive(Debug)]
pub struct DashboardHttpClient {
    client: Client,
    base_url: String,
    bearer_token: RwLock<Option<String>>,
    retry_config: RetryConfig,
}

impl DashboardHttpClient {
    /// Create a new HTTP client from config.
    ///
    /// # Errors
    ///
    /// Fails when the underlying client cannot be built.
    pub fn new(config: &ApiClientConfig) -> Result<Self, HttpError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| HttpError::Network(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            bearer_token: RwLock::new(None),
            retry_config: config.retry.clone(),
        })
    }

    /// Backend base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Install or clear the bearer token.
    pub fn set_bearer_token(&self, token: Option<String>) {
        *self.bearer_token.write() = token;
    }

    /// Whether a bearer token is installed.
    #[must_use]
    pub fn has_bearer_token(&self) -> bool {
        self.bearer_token.read().is_some()
    }

    /// GET `path` with `query`.
    ///
    /// # Errors
    ///
    /// See [`HttpError`].
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, HttpError> {
        self.request(Method::GET, path, query, Body::<()>::Empty).await
    }

    /// POST a JSON body.
    ///
    /// # Errors
    ///
    /// See [`HttpError`].
    pub async fn post_json<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, HttpError> {
        self.request(Method::POST, path, &[], Body::Json(body)).await
    }

    /// POST a form body.
    ///
    /// # Errors
    ///
    /// See [`HttpError`].
    pub async fn post_form<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        form: &B,
    ) -> Result<T, HttpError> {
        self.request(Method::POST, path, &[], Body::Form(form)).await
    }

    /// PUT a JSON body.
    ///
    /// # Errors
    ///
    /// See [`HttpError`].
    pub async fn put_json<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, HttpError> {
        self.request(Method::PUT, path, &[], Body::Json(body)).await
    }

    /// DELETE `path`.
    ///
    /// # Errors
    ///
    /// See [`HttpError`].
    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, HttpError> {
        self.request(Method::DELETE, path, &[], Body::<()>::Empty).await
    }

    fn build<B: Serialize>(
        &self,
        method: &Method,
        url: &str,
        query: &[(&str, &str)],
        body: Body<'_, B>,
    ) -> RequestBuilder {
        let mut req = self.client.request(method.clone(), url);
        if !query.is_empty() {
            req = req.query(query);
        }
        if let Some(token) = self.bearer_token.read().as_deref() {
            req = req.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        match body {
            Body::Empty => req,
            Body::Json(b) => req.json(b),
            Body::Form(b) => req.form(b),
        }
    }

    async fn request<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Body<'_, B>,
    ) -> Result<T, HttpError> {
        let started = Instant::now();
        let result = self.request_with_retry(&method, path, query, body).await;
        record_api_request(method.as_str(), result.is_ok(), started.elapsed());
        if let Err(e) = &result {
            tracing::debug!(method = %method, path, error = %e, "Request failed");
        }
        result
    }

    #[allow(clippy::too_many_lines)]
    async fn request_with_retry<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        method: &Method,
        path: &str,
        query: &[(&str, &str)],
        body: Body<'_, B>,
    ) -> Result<T, HttpError> {
        let url = format!("{}{path}", self.base_url);
        let idempotent = *method != Method::POST;
        let mut backoff = ExponentialBackoff::new(&self.retry_config);

        loop {
            let response = match self.build(method, &url, query, body).send().await {
                Ok(resp) => resp,
                Err(e) => {
                    let sent = !(e.is_connect() || e.is_builder());
                    if (idempotent || !sent)
                        && let Some(delay) = backoff.next_backoff()
                    {
                        tracing::warn!(
                            error = %e,
                            delay_ms = delay.as_millis(),
                            attempt = backoff.attempt,
                            "Network error, retrying"
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    if backoff.attempt <= 1 || (!idempotent && sent) {
                        return Err(HttpError::Network(e.to_string()));
                    }
                    return Err(HttpError::MaxRetriesExceeded {
                        attempts: backoff.attempt,
                        last_error: e.to_string(),
                    });
                }
            };

            let status = response.status();

            if status.is_success() {
                let text = response
                    .text()
                    .await
                    .map_err(|e| HttpError::Network(e.to_string()))?;
                let text = if text.trim().is_empty() { "null" } else { text.as_str() };
                return serde_json::from_str(text).map_err(|e| HttpError::JsonParse(e.to_string()));
            }

            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok());

            let error_body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorResponse>(&error_body)
                .map_or(error_body, |err| err.message());

            match categorize_status(status) {
                ErrorCategory::RateLimited => {
                    let delay = backoff
                        .next_backoff()
                        .map(|d| retry_after.map_or(d, Duration::from_secs));
                    if let Some(delay) = delay {
                        tracing::warn!(
                            path,
                            delay_ms = delay.as_millis(),
                            "Rate limited, retrying"
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    return Err(HttpError::RateLimited {
                        retry_after_secs: retry_after.unwrap_or(60),
                    });
                }
                ErrorCategory::Retryable if idempotent => {
                    if let Some(delay) = backoff.next_backoff() {
                        tracing::warn!(
                            status = status.as_u16(),
                            detail = %detail,
                            delay_ms = delay.as_millis(),
                            "Retryable error, retrying"
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    return Err(HttpError::MaxRetriesExceeded {
                        attempts: backoff.attempt,
                        last_error: format!("HTTP {}: {detail}", status.as_u16()),
                    });
                }
                ErrorCategory::Retryable | ErrorCategory::NonRetryable => {
                    return Err(HttpError::Status {
                        status: status.as_u16(),
                        detail,
                        path: path.to_string(),
                    });
                }
            }
        }
    }
}

/// Error category for determining retry behavior.
enum ErrorCategory {
    RateLimited,
    Retryable,
    NonRetryable,
}

/// Categorize HTTP status code for retry handling.
const fn categorize_status(status: StatusCode) -> ErrorCategory {
    match status.as_u16() {
        429 => ErrorCategory::RateLimited,
        408 | 500 | 502 | 503 | 504 => ErrorCategory::Retryable,
        _ => ErrorCategory::NonRetryable,
    }
}

/// Exponential backoff calculator.
struct ExponentialBackoff {
    attempt: u32,
    max_attempts: u32,
    current_backoff: Duration,
    max_backoff: Duration,
    multiplier: f64,
}

impl ExponentialBackoff {
    const fn new(config: &RetryConfig) -> Self {
        Self {
            attempt: 0,
            max_attempts: config.max_attempts,
            current_backoff: config.initial_backoff,
            max_backoff: config.max_backoff,
            multiplier: config.multiplier,
        }
    }

    fn next_backoff(&mut self) -> Option<Duration> {
        self.attempt += 1;
        if self.attempt >= self.max_attempts {
            return None;
        }

        let backoff = self.current_backoff;
        self.current_backoff = Duration::from_secs_f64(
            (self.current_backoff.as_secs_f64() * self.multiplier)
                .min(self.max_backoff.as_secs_f64()),
        );

        Some(backoff)
    }
}
