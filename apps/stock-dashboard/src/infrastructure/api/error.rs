//! REST client error types.

use thiserror::Error;

use crate::application::ports::ApiError;

/// Errors from the HTTP layer.
#[derive(Debug, Error, Clone)]
pub enum HttpError {
    /// Client construction or transport failure.
    #[error("Network error: {0}")]
    Network(String),

    /// Backend returned an error status.
    #[error("HTTP {status}: {detail}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Backend `detail` or the raw body.
        detail: String,
        /// Request path.
        path: String,
    },

    /// Rate limited and out of retries.
    #[error("Rate limited, retry after {retry_after_secs}s")]
    RateLimited {
        /// Suggested retry delay in seconds.
        retry_after_secs: u64,
    },

    /// Response body did not decode.
    #[error("JSON parsing error: {0}")]
    JsonParse(String),

    /// Max retries exceeded.
    #[error("Max retries exceeded after {attempts} attempts: {last_error}")]
    MaxRetriesExceeded {
        /// Number of attempts made before giving up.
        attempts: u32,
        /// The final failure.
        last_error: String,
    },
}

impl From<HttpError> for ApiError {
    fn from(err: HttpError) -> Self {
        match err {
            HttpError::Network(message) => Self::Connection { message },
            HttpError::MaxRetriesExceeded { attempts, last_error } => Self::Connection {
                message: format!("gave up after {attempts} attempts: {last_error}"),
            },
            HttpError::RateLimited { retry_after_secs } => Self::RateLimited { retry_after_secs },
            HttpError::JsonParse(message) => Self::InvalidResponse { message },
            HttpError::Status { status, detail, path } => match status {
                401 | 403 => Self::Unauthorized,
                404 => Self::NotFound { resource: path },
                _ => Self::Rejected { status, detail },
            },
        }
    }
}
