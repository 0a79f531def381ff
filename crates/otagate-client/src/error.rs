//! Error types for the backend client

use serde_json::Value;
use thiserror::Error;

/// Errors that can occur when calling a backend
#[derive(Error, Debug)]
pub enum BackendError {
    /// Backend answered with a status other than the one expected for the verb
    #[error("{url} replied with status {status}")]
    Status {
        /// Status code exactly as returned by the backend
        status: u16,
        /// Resource that failed
        url: String,
        /// Backend error body annotated with `ota-source`
        body: Value,
    },

    /// Request never got a response (connect error, timeout, reset)
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Success response carried a body that could not be decoded
    #[error("invalid response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    /// Base URL or resource did not form a valid URL
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl BackendError {
    /// Status code reported by the backend, if it answered at all
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            BackendError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Check if error is transient and the call may be repeated
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            BackendError::Status { status, .. } => *status >= 500,
            BackendError::Transport { source, .. } => {
                source.is_timeout() || source.is_connect() || source.is_request()
            }
            BackendError::Decode { .. } | BackendError::Url(_) => false,
        }
    }

    /// Check if the backend reported that the resource does not exist
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

/// Result type for backend operations
pub type Result<T> = std::result::Result<T, BackendError>;
