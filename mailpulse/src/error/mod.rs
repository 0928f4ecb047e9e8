//! Error types and error handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::config::ConfigError;
use crate::email::EmailError;
use crate::tracking::TrackingError;
use crate::transport::TransportError;

/// Top-level error type
#[derive(Debug, Error)]
pub enum MailpulseError {
    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Email building, rendering or delivery error
    #[error(transparent)]
    Email(#[from] EmailError),

    /// Open tracking error
    #[error(transparent)]
    Tracking(#[from] TrackingError),

    /// Bad request error
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl From<TransportError> for MailpulseError {
    fn from(error: TransportError) -> Self {
        Self::Email(EmailError::Transport(error))
    }
}

impl MailpulseError {
    /// HTTP status this error maps to
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_)
            | Self::Email(EmailError::Validation(_))
            | Self::Tracking(TrackingError::InvalidEmail(_)) => StatusCode::BAD_REQUEST,
            Self::Tracking(TrackingError::NotFound(_)) => StatusCode::NOT_FOUND,
            Self::Email(EmailError::TemplateNotFound(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Email(EmailError::Delivery { source, .. }) => match source.as_ref() {
                EmailError::TemplateNotFound(_) => StatusCode::UNPROCESSABLE_ENTITY,
                EmailError::Render => StatusCode::INTERNAL_SERVER_ERROR,
                _ => StatusCode::BAD_GATEWAY,
            },
            Self::Config(_)
            | Self::Email(EmailError::Render | EmailError::Transport(_))
            | Self::Tracking(TrackingError::Database(_) | TrackingError::Corrupt { .. }) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for MailpulseError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(status = %status, error = %self, "Request failed");
        }

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
