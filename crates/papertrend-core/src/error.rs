//! Error type for rate-limited fetches

use std::time::Duration;

/// Error from a single fetch through [`crate::RateLimitedClient`].
///
/// Transient failures (5xx, transport errors, timeouts) are retried by the
/// client before they reach the caller.
#[derive(Debug)]
pub enum FetchError {
    /// HTTP error with optional status code (`None` = transport failure)
    Http {
        status: Option<u16>,
        message: String,
    },
    /// Attempt exceeded the per-request timeout and was cancelled
    Timeout(Duration),
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Http {
                status: Some(s),
                message,
            } => write!(f, "HTTP {s}: {message}"),
            Self::Http {
                status: None,
                message,
            } => write!(f, "HTTP error: {message}"),
            Self::Timeout(after) => write!(f, "request timed out after {after:?}"),
        }
    }
}

impl std::error::Error for FetchError {}

impl FetchError {
    /// Create HTTP error from reqwest error
    pub fn from_reqwest(e: &reqwest::Error) -> Self {
        if e.is_timeout() {
            return Self::Http {
                status: None,
                message: "timed out".to_string(),
            };
        }
        Self::Http {
            status: e.status().map(|s| s.as_u16()),
            message: e.to_string(),
        }
    }

    /// Error for a response that arrived with a non-success status.
    pub fn from_status(status: reqwest::StatusCode) -> Self {
        Self::Http {
            status: Some(status.as_u16()),
            message: status
                .canonical_reason()
                .unwrap_or("unexpected status")
                .to_string(),
        }
    }

    /// 5xx, transport failures and timeouts are transient; other statuses are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http { status: None, .. } => true,
            Self::Http {
                status: Some(s), ..
            } => *s >= 500,
            Self::Timeout(_) => true,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => *status,
            Self::Timeout(_) => None,
        }
    }
}
