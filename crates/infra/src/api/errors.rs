//! API-specific error types
//!
//! Classifies failures seen by [`super::ApiClient`] so hosts can decide
//! whether to retry, re-authenticate, or surface the error.

use std::time::Duration;

use carelink_common::auth::{RenewalError, StorageError};
use carelink_domain::CareLinkError;
use thiserror::Error;

/// Categories of API errors for retry logic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorCategory {
    /// Authorization failures and failed renewals; the session may be gone
    Authentication,
    /// Rate limiting errors (429) - retry with backoff
    RateLimit,
    /// Server errors (5xx) - retryable
    Server,
    /// Client errors (4xx except 401, undecodable bodies) - non-retryable
    Client,
    /// Network/connection errors and timeouts - retryable
    Network,
    /// Credential store failures - non-retryable
    Storage,
    /// Configuration errors - non-retryable
    Config,
}

/// API operation errors
#[derive(Debug, Error)]
pub enum ApiError {
    /// The server rejected the request's credentials and no recovery applied
    #[error("Authorization failed: {0}")]
    Unauthorized(String),

    /// The request hit a 401 and the renewal exchange failed
    #[error(transparent)]
    Renewal(#[from] RenewalError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),

    #[error("Server error: {0}")]
    Server(String),

    #[error("Client error: {0}")]
    Client(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ApiError {
    /// Get the error category for this error
    pub const fn category(&self) -> ApiErrorCategory {
        match self {
            Self::Unauthorized(_) | Self::Renewal(_) => ApiErrorCategory::Authentication,
            Self::Storage(_) => ApiErrorCategory::Storage,
            Self::RateLimit(_) => ApiErrorCategory::RateLimit,
            Self::Server(_) => ApiErrorCategory::Server,
            Self::Client(_) | Self::Decode(_) => ApiErrorCategory::Client,
            Self::Network(_) | Self::Timeout(_) => ApiErrorCategory::Network,
            Self::Config(_) => ApiErrorCategory::Config,
        }
    }

    /// Check if retrying the same call later could succeed
    ///
    /// Authentication errors are not retryable: by the time one reaches the
    /// caller the session has already been renewed once or terminated. A
    /// renewal wait that timed out is the exception.
    pub const fn should_retry(&self) -> bool {
        match self {
            Self::Renewal(RenewalError::TimedOut(_)) => true,
            _ => matches!(
                self.category(),
                ApiErrorCategory::RateLimit | ApiErrorCategory::Server | ApiErrorCategory::Network
            ),
        }
    }

    /// Whether this error came with a session termination
    pub const fn ended_session(&self) -> bool {
        match self {
            Self::Unauthorized(_) => true,
            Self::Renewal(err) => err.is_terminal(),
            _ => false,
        }
    }
}

impl From<CareLinkError> for ApiError {
    fn from(err: CareLinkError) -> Self {
        match err {
            CareLinkError::Network(message) => Self::Network(message),
            CareLinkError::Config(message) => Self::Config(message),
            CareLinkError::InvalidInput(message) => Self::Client(message),
            CareLinkError::Internal(message) => Self::Server(message),
        }
    }
}
