//! Email error types

use thiserror::Error;

use crate::transport::TransportError;

/// Errors that can occur when building, rendering or delivering an email
#[derive(Debug, Error)]
pub enum EmailError {
    /// Required input is missing or malformed
    #[error("invalid email: {0}")]
    Validation(String),

    /// No template with this name exists in the template directory
    #[error("email template not found: {0}")]
    TemplateNotFound(String),

    /// Template exists but could not be rendered
    ///
    /// The underlying cause is logged where it happens and not exposed here.
    #[error("failed to render email template")]
    Render,

    /// Transport failure outside of a delivery attempt
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The provider call for this recipient failed
    #[error("failed to deliver email to {recipient}: {source}")]
    Delivery {
        /// Recipient as given by the caller
        recipient: String,
        /// Original cause
        #[source]
        source: Box<EmailError>,
    },
}

impl EmailError {
    /// Create a validation error from a string message
    #[must_use]
    pub fn validation<T: Into<String>>(msg: T) -> Self {
        Self::Validation(msg.into())
    }

    /// Wrap a failure as a delivery error for `recipient`
    #[must_use]
    pub fn delivery(recipient: impl Into<String>, source: Self) -> Self {
        Self::Delivery {
            recipient: recipient.into(),
            source: Box::new(source),
        }
    }

    /// Whether sending the same email again later may succeed
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_retryable(),
            Self::Delivery { source, .. } => source.is_retryable(),
            Self::Validation(_) | Self::TemplateNotFound(_) | Self::Render => false,
        }
    }
}
