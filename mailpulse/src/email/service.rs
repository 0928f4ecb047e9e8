//! Email delivery through the provider API

use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, info};

use super::message::{format_sender, EmailPayload, OutgoingEmail, Recipients, DEFAULT_SUBJECT};
use super::{EmailError, TemplateStore};
use crate::config::{MailpulseConfig, SenderSettings};
use crate::transport::{ApiTransport, RateLimitedTransport};

/// Provider endpoint that accepts new emails
pub const EMAILS_ENDPOINT: &str = "emails";

/// Wrap width for the plain-text alternative
const TEXT_WIDTH: usize = 80;

/// Builds payloads, renders templates and hands emails to the transport
///
/// # Examples
///
/// ```rust,no_run
/// use mailpulse::config::MailpulseConfig;
/// use mailpulse::email::{DeliveryService, OutgoingEmail};
/// use serde_json::json;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = MailpulseConfig::load()?;
/// let delivery = DeliveryService::from_config(&config)?;
///
/// delivery
///     .render_and_send(
///         OutgoingEmail::new("alice@example.com").subject("Welcome!"),
///         "emails/welcome.html",
///         &json!({"name": "Alice"}),
///     )
///     .await?;
/// # Ok(())
/// # }
/// ```
pub struct DeliveryService {
    transport: Arc<dyn ApiTransport>,
    templates: TemplateStore,
    sender: SenderSettings,
}

impl std::fmt::Debug for DeliveryService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeliveryService")
            .field("templates", &self.templates)
            .field("sender", &self.sender)
            .finish_non_exhaustive()
    }
}

impl DeliveryService {
    /// Create a service over an existing transport
    #[must_use]
    pub fn new(
        transport: Arc<dyn ApiTransport>,
        templates: TemplateStore,
        sender: SenderSettings,
    ) -> Self {
        Self {
            transport,
            templates,
            sender,
        }
    }

    /// Create a service with a [`RateLimitedTransport`] built from `config`
    ///
    /// `config` is used as given; call [`MailpulseConfig::validate`] first,
    /// or go through [`AppState::from_config`](crate::state::AppState::from_config)
    /// which does.
    ///
    /// # Errors
    ///
    /// Returns [`EmailError::Transport`] if the transport cannot be built.
    pub fn from_config(config: &MailpulseConfig) -> Result<Self, EmailError> {
        let transport = RateLimitedTransport::new(&config.provider)?;
        Ok(Self::new(
            Arc::new(transport),
            TemplateStore::from_dir(&config.templates.template_dir),
            config.sender.clone(),
        ))
    }

    /// Sender defaults in use
    #[must_use]
    pub const fn sender_settings(&self) -> &SenderSettings {
        &self.sender
    }

    /// Resolve defaults and build the provider payload
    ///
    /// # Errors
    ///
    /// Returns [`EmailError::Validation`] when the recipient or the resolved
    /// sender address is empty.
    pub fn build_payload(&self, email: OutgoingEmail) -> Result<EmailPayload, EmailError> {
        let from = non_blank(email.from)
            .or_else(|| non_blank(Some(self.sender.default_address.clone())))
            .unwrap_or_default();
        let from_name =
            non_blank(email.from_name).or_else(|| non_blank(Some(self.sender.default_name.clone())));

        let to = Recipients::parse(&email.to);
        let no_recipient = to.addresses().iter().all(|address| address.trim().is_empty());

        if no_recipient || from.is_empty() {
            error!("Missing required recipient or sender address");
            return Err(EmailError::validation(
                "recipient (to) and sender (from) must be provided",
            ));
        }

        let reply_to = non_blank(email.reply_to)
            .or_else(|| non_blank(Some(self.sender.default_reply_to.clone())))
            .unwrap_or_else(|| from.clone());

        let subject = non_blank(email.subject).unwrap_or_else(|| DEFAULT_SUBJECT.to_string());
        let text = if email.html.is_empty() {
            String::new()
        } else {
            html_to_text(&email.html)
        };

        Ok(EmailPayload {
            from: format_sender(&from, from_name.as_deref()),
            to,
            reply_to,
            subject,
            html: email.html,
            text,
            cc: non_blank(email.cc),
            headers: email.headers,
        })
    }

    /// Send an email
    ///
    /// Returns the provider's JSON response, or `None` for an empty body.
    ///
    /// # Errors
    ///
    /// - [`EmailError::Validation`] for a missing recipient or sender
    /// - [`EmailError::Delivery`] when the provider call fails
    pub async fn send(&self, email: OutgoingEmail) -> Result<Option<Value>, EmailError> {
        let recipient = email.to.clone();
        let payload = self.build_payload(email)?;
        let body = serde_json::to_value(&payload)
            .map_err(|e| EmailError::delivery(&recipient, EmailError::Transport(e.into())))?;

        info!(to = %recipient, from = %payload.from, "Sending email");
        match self.transport.post(EMAILS_ENDPOINT, &body).await {
            Ok(response) => {
                debug!(to = %recipient, response = ?response, "Email accepted by provider");
                Ok(response)
            }
            Err(e) => {
                error!(to = %recipient, error = %e, "Failed to send email");
                Err(EmailError::delivery(recipient, e.into()))
            }
        }
    }

    /// Render a named template with `context` bound to `data`
    ///
    /// # Errors
    ///
    /// See [`TemplateStore::render`].
    pub fn render(&self, template_name: &str, context: &Value) -> Result<String, EmailError> {
        self.templates.render(template_name, context)
    }

    /// Render `template_name` into the email body, then send it
    ///
    /// Any `html` already set on `email` is replaced.
    ///
    /// # Errors
    ///
    /// - [`EmailError::Validation`] for an empty template name or missing
    ///   addresses, before any network call
    /// - [`EmailError::Delivery`] for everything else, with the cause as
    ///   its source
    pub async fn render_and_send(
        &self,
        email: OutgoingEmail,
        template_name: &str,
        context: &Value,
    ) -> Result<Option<Value>, EmailError> {
        if template_name.trim().is_empty() {
            return Err(EmailError::validation("template name is required"));
        }

        debug!(to = %email.to, template = %template_name, "Rendering and sending email");
        let recipient = email.to.clone();

        let outcome = match self.render(template_name, context) {
            Ok(html) => self.send(email.html(&html)).await,
            Err(e) => Err(e),
        };

        outcome.map_err(|e| match e {
            EmailError::Validation(_) | EmailError::Delivery { .. } => e,
            other => {
                error!(to = %recipient, template = %template_name, error = %other, "Failed to render and send email");
                EmailError::delivery(recipient, other)
            }
        })
    }

    /// Send an operational alert to the configured alert recipients
    ///
    /// Without configured recipients the alert goes to the default sender
    /// address, with a note about the missing setting in the body.
    ///
    /// # Errors
    ///
    /// Same as [`DeliveryService::send`].
    pub async fn send_system_alert(
        &self,
        subject: &str,
        message: &str,
    ) -> Result<Option<Value>, EmailError> {
        let (recipients, body) = if self.sender.alert_recipients.is_empty() {
            error!(
                fallback = %self.sender.default_address,
                "sender.alert_recipients is not configured, sending alert to the default sender"
            );
            (
                self.sender.default_address.clone(),
                format!("Alert recipients are not configured (sender.alert_recipients). Alert: {message}"),
            )
        } else {
            (self.sender.alert_recipients.join(","), message.to_string())
        };

        info!(to = %recipients, "Sending system alert");
        self.send(
            OutgoingEmail::new(&recipients)
                .from(&self.sender.default_address)
                .subject(&format!("Alert: {subject}"))
                .html(&body),
        )
        .await
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn html_to_text(html: &str) -> String {
    html2text::config::plain()
        .string_from_read(html.as_bytes(), TEXT_WIDTH)
        .unwrap_or_else(|e| {
            error!(error = %e, "Failed to derive plain-text body from HTML");
            String::new()
        })
}
