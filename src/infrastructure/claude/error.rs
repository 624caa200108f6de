//! Error taxonomy for the Claude API client.

use reqwest::StatusCode;
use thiserror::Error;

/// Errors from the Claude API or the transport underneath it.
#[derive(Debug, Error)]
pub enum ClaudeApiError {
    /// Invalid request parameters or malformed request.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Authentication failed due to an invalid or missing API key.
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Rate limit exceeded, retry after waiting.
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// API server encountered an internal error.
    #[error("API server error: {0}")]
    ServerError(String),

    /// API server is overloaded, retry later.
    #[error("API server overloaded")]
    Overloaded,

    /// Network error during the request.
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// JSON serialization or deserialization error.
    #[error("JSON serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Request timed out waiting for a response.
    #[error("Timeout waiting for response")]
    Timeout,

    /// Anything that does not fit the variants above.
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl ClaudeApiError {
    /// True if this error is transient and worth retrying.
    ///
    /// Transient: rate limits, 5xx server errors, overload, timeouts.
    /// Permanent: bad requests, bad credentials.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::RateLimitExceeded | Self::ServerError(_) | Self::Overloaded | Self::Timeout
        )
    }

    /// True for errors where retrying can never help.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            Self::InvalidRequest(_) | Self::AuthenticationFailed(_)
        )
    }

    /// Map an HTTP status and response body to an error variant.
    ///
    /// 400 → invalid request; 401/403 → authentication; 429 → rate limit;
    /// 529 → overloaded; other 5xx → server error.
    pub fn from_status(status: StatusCode, body: String) -> Self {
        match status.as_u16() {
            400 => Self::InvalidRequest(body),
            401 | 403 => Self::AuthenticationFailed(body),
            429 => Self::RateLimitExceeded,
            529 => Self::Overloaded,
            500..=599 => Self::ServerError(body),
            other => Self::Unknown(format!("HTTP {other}: {body}")),
        }
    }
}
