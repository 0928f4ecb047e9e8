//! Validated JSON extractor
//!
//! Deserializes a JSON body and runs the `validator` rules on it before the
//! handler sees it.
//!
//! # Example
//!
//! ```rust,no_run
//! use mailpulse::extractors::ValidatedJson;
//! use axum::Json;
//! use serde::Deserialize;
//! use validator::Validate;
//!
//! #[derive(Debug, Deserialize, Validate)]
//! struct Subscribe {
//!     #[validate(email)]
//!     email: String,
//! }
//!
//! async fn subscribe(ValidatedJson(body): ValidatedJson<Subscribe>) -> Json<String> {
//!     Json(body.email)
//! }
//! ```

use axum::{
    extract::{FromRequest, Json, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::fmt;
use validator::Validate;

/// Validated JSON extractor
///
/// Rejects malformed bodies and bodies that fail validation with
/// `400 Bad Request` and a `{"error": ...}` JSON body.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate + 'static,
    S: Send + Sync + 'static,
{
    type Rejection = ValidationError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(data) = Json::<T>::from_request(req, state)
            .await
            .map_err(|err| ValidationError::JsonRejection(err.body_text()))?;

        data.validate().map_err(ValidationError::Validation)?;

        Ok(Self(data))
    }
}

/// Rejection returned by [`ValidatedJson`]
#[derive(Debug)]
pub enum ValidationError {
    /// Body is not valid JSON for the target type
    JsonRejection(String),
    /// Body parsed but failed validation
    Validation(validator::ValidationErrors),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::JsonRejection(msg) => write!(f, "Invalid JSON body: {msg}"),
            Self::Validation(errors) => {
                write!(f, "Validation failed: {}", format_validation_errors(errors))
            }
        }
    }
}

impl std::error::Error for ValidationError {}

impl IntoResponse for ValidationError {
    fn into_response(self) -> Response {
        (
            StatusCode::BAD_REQUEST,
            axum::Json(json!({ "error": self.to_string() })),
        )
            .into_response()
    }
}

/// Format validation errors as `field: message` pairs separated by `; `
///
/// Struct-level errors are reported under `__all__`.
#[must_use]
pub fn format_validation_errors(errors: &validator::ValidationErrors) -> String {
    let mut messages: Vec<String> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, field_errors)| {
            field_errors.iter().map(move |error| {
                error.message.as_ref().map_or_else(
                    || format!("{field}: {}", error.code),
                    |message| format!("{field}: {message}"),
                )
            })
        })
        .collect();

    messages.sort();
    messages.join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, Validate)]
    struct Probe {
        #[validate(email)]
        email: String,
    }

    #[test]
    fn test_format_validation_errors() {
        let probe = Probe {
            email: "nope".to_string(),
        };
        let errors = probe.validate().unwrap_err();

        assert_eq!(format_validation_errors(&errors), "email: email");
    }

    #[test]
    fn test_display() {
        let error = ValidationError::JsonRejection("missing field `to_address`".to_string());
        assert!(error.to_string().contains("to_address"));
    }
}
