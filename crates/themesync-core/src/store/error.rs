//! Remote theme store errors

use std::time::Duration;

use thiserror::Error;

/// Errors returned by a [`ThemeStore`](super::ThemeStore)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Too many requests; the platform asked us to slow down
    #[error("Rate limited by the remote store")]
    RateLimited { retry_after: Option<Duration> },

    /// Request did not complete in time
    #[error("Request timed out")]
    Timeout,

    /// Remote returned a 5xx status
    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// Could not reach the remote store
    #[error("Connection failed: {0}")]
    Transport(String),

    /// Asset or theme does not exist
    #[error("Not found")]
    NotFound,

    /// Missing or invalid credentials
    #[error("Unauthorized ({status}). Check the access token for this shop.")]
    Unauthorized { status: u16 },

    /// Asset exceeds the platform's size limit
    #[error("Asset is too large for the remote store")]
    PayloadTooLarge,

    /// Any other client-side rejection (validation errors, bad requests)
    #[error("Rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// Response body could not be understood
    #[error("Invalid response: {0}")]
    Decode(String),
}

impl StoreError {
    /// Whether retrying the same request may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StoreError::RateLimited { .. }
                | StoreError::Timeout
                | StoreError::Server { .. }
                | StoreError::Transport(_)
        )
    }

    /// Delay the remote asked for before retrying, if any
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            StoreError::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }

    /// Classify an HTTP status and response body
    pub fn from_status(status: u16, message: String, retry_after: Option<Duration>) -> Self {
        match status {
            429 => StoreError::RateLimited { retry_after },
            408 | 504 => StoreError::Timeout,
            401 | 403 => StoreError::Unauthorized { status },
            404 => StoreError::NotFound,
            413 => StoreError::PayloadTooLarge,
            500..=599 => StoreError::Server { status, message },
            _ => StoreError::Rejected { status, message },
        }
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            StoreError::Timeout
        } else if error.is_connect() || error.is_request() {
            StoreError::Transport(error.to_string())
        } else if error.is_decode() {
            StoreError::Decode(error.to_string())
        } else if let Some(status) = error.status() {
            StoreError::from_status(status.as_u16(), error.to_string(), None)
        } else {
            StoreError::Transport(error.to_string())
        }
    }
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;
