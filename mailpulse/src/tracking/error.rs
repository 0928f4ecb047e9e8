//! Tracking error types

use thiserror::Error;

/// Errors raised by open tracking
#[derive(Debug, Error)]
pub enum TrackingError {
    /// Unknown or malformed tracking identifier
    #[error("tracking record not found: {0}")]
    NotFound(String),

    /// The recipient address is missing
    #[error("invalid tracking email: {0}")]
    InvalidEmail(String),

    /// Database error
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored row could not be decoded
    #[error("corrupt tracking record {id}: {reason}")]
    Corrupt {
        /// Stored identifier
        id: String,
        /// What failed to decode
        reason: String,
    },
}
