//! `POST /send`

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::info;
use validator::{Validate, ValidateEmail, ValidationError};

use crate::email::OutgoingEmail;
use crate::error::MailpulseError;
use crate::extractors::ValidatedJson;
use crate::state::AppState;

/// Body of `POST /send`
///
/// Exactly one of `html_body` and `template_name` must be non-blank.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[validate(schema(function = "exactly_one_body"))]
pub struct SendEmailRequest {
    /// One address, or several separated by commas
    #[validate(custom(function = "email_list"))]
    pub to_address: String,

    /// Sender address
    #[validate(email)]
    pub from_address: String,

    /// Sender display name
    #[serde(default)]
    pub from_name: Option<String>,

    /// Reply-To address
    #[serde(default)]
    #[validate(custom(function = "blank_or_email"))]
    pub reply_to_address: Option<String>,

    /// CC address
    #[serde(default)]
    #[validate(custom(function = "blank_or_email"))]
    pub cc_address: Option<String>,

    /// Subject line
    #[serde(default)]
    pub subject: Option<String>,

    /// Raw HTML body
    #[serde(default)]
    pub html_body: Option<String>,

    /// Named template to render instead of `html_body`
    #[serde(default)]
    pub template_name: Option<String>,

    /// Template context, exposed to the template as `data`
    #[serde(default)]
    pub context: Option<Map<String, Value>>,
}

impl SendEmailRequest {
    /// Non-blank template name, if one was given
    #[must_use]
    pub fn template(&self) -> Option<&str> {
        self.template_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }

    /// Convert into an [`OutgoingEmail`]
    #[must_use]
    pub fn into_email(self) -> OutgoingEmail {
        OutgoingEmail {
            to: self.to_address,
            from: Some(self.from_address),
            from_name: self.from_name,
            reply_to: self.reply_to_address,
            cc: self.cc_address,
            subject: self.subject,
            html: self.html_body.unwrap_or_default(),
            headers: std::collections::BTreeMap::new(),
        }
    }
}

fn is_blank(value: Option<&String>) -> bool {
    value.is_none_or(|v| v.trim().is_empty())
}

fn exactly_one_body(request: &SendEmailRequest) -> Result<(), ValidationError> {
    let has_html = !is_blank(request.html_body.as_ref());
    let has_template = !is_blank(request.template_name.as_ref());

    if has_html == has_template {
        let mut error = ValidationError::new("body");
        error.message = Some("exactly one of `html_body` or `template_name` must be provided".into());
        return Err(error);
    }
    Ok(())
}

fn email_list(value: &str) -> Result<(), ValidationError> {
    let mut addresses = value.split(',').map(str::trim).filter(|a| !a.is_empty()).peekable();

    if addresses.peek().is_none() || !addresses.all(|a| a.validate_email()) {
        let mut error = ValidationError::new("email");
        error.message = Some("must be one or more comma-separated email addresses".into());
        return Err(error);
    }
    Ok(())
}

fn blank_or_email(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() || value.trim().validate_email() {
        Ok(())
    } else {
        Err(ValidationError::new("email"))
    }
}

/// Send an email from a JSON request
///
/// Responds `200` with the provider's response on success.
///
/// # Errors
///
/// Validation failures are `400`, an unknown template `422`, provider
/// failures `502`.
pub async fn send_email(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<SendEmailRequest>,
) -> Result<Json<Value>, MailpulseError> {
    info!(to = %request.to_address, from = %request.from_address, "Send request received");

    let template = request.template().map(str::to_string);
    let context = Value::Object(request.context.clone().unwrap_or_default());
    let email = request.into_email();

    let response = match template {
        Some(name) => {
            info!(template = %name, "Rendering email template");
            state.delivery.render_and_send(email, &name, &context).await?
        }
        None => state.delivery.send(email).await?,
    };

    Ok(Json(json!({
        "message": "Email sent successfully!",
        "api_response": response,
    })))
}
