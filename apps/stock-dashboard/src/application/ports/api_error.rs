//! Errors surfaced by the REST ports.

/// Failure of a backend request.
///
/// Every variant is recoverable at the caller: views degrade to an empty
/// list or an inline error instead of aborting.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// Could not reach the backend.
    #[error("Connection error: {message}")]
    Connection {
        /// Error details.
        message: String,
    },

    /// Missing or rejected credentials.
    #[error("Authentication failed")]
    Unauthorized,

    /// Resource does not exist.
    #[error("Not found: {resource}")]
    NotFound {
        /// Requested path.
        resource: String,
    },

    /// Backend asked us to slow down and retries ran out.
    #[error("Rate limited, retry after {retry_after_secs}s")]
    RateLimited {
        /// Suggested delay.
        retry_after_secs: u64,
    },

    /// Backend rejected the request.
    #[error("API error {status}: {detail}")]
    Rejected {
        /// HTTP status.
        status: u16,
        /// Backend `detail` message, or the raw body.
        detail: String,
    },

    /// Response body did not have the expected shape.
    #[error("Unexpected response: {message}")]
    InvalidResponse {
        /// Error details.
        message: String,
    },
}

impl ApiError {
    /// Whether the caller should prompt for a new login.
    #[must_use]
    pub const fn is_auth(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }
}
