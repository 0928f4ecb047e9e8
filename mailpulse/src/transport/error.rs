//! Transport error types

use reqwest::StatusCode;
use thiserror::Error;

/// Errors raised by the outbound delivery API client
#[derive(Debug, Error)]
pub enum TransportError {
    /// The transport cannot be built from the given settings
    #[error("transport configuration error: {0}")]
    Configuration(String),

    /// Connection, timeout or protocol failure
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with a non-success status
    #[error("unexpected status {status}: {body}")]
    Status {
        /// Response status
        status: StatusCode,
        /// Raw response body
        body: String,
    },

    /// The provider kept answering 429 after the bounded retries
    #[error("rate limited by provider after {attempts} attempts: {body}")]
    RateLimited {
        /// Requests issued, including the first one
        attempts: u32,
        /// Body of the last 429 response
        body: String,
    },

    /// The provider returned a body that is not JSON
    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl TransportError {
    /// Create a configuration error from a string message
    #[must_use]
    pub fn configuration<T: Into<String>>(msg: T) -> Self {
        Self::Configuration(msg.into())
    }

    /// Whether re-issuing the request later may succeed
    ///
    /// Rate limiting, server-side (5xx) failures, timeouts and connection
    /// errors are transient. Configuration, client (4xx) and decoding
    /// failures are not.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited { .. } => true,
            Self::Status { status, .. } => status.is_server_error(),
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            Self::Configuration(_) | Self::Decode(_) => false,
        }
    }

    /// Status code of the failed response, if there was one
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::RateLimited { .. } => Some(StatusCode::TOO_MANY_REQUESTS),
            Self::Http(e) => e.status(),
            Self::Configuration(_) | Self::Decode(_) => None,
        }
    }
}
