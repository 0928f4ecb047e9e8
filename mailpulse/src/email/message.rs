//! Outgoing email builder and the provider payload
//!
//! [`OutgoingEmail`] is what callers fill in. [`EmailPayload`] is the JSON
//! body posted to the provider, produced by
//! [`DeliveryService::build_payload`](super::DeliveryService::build_payload)
//! once defaults have been resolved.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Placeholder used when the caller leaves the subject blank
pub const DEFAULT_SUBJECT: &str = "No Subject";

/// An email to send
///
/// ```rust
/// use mailpulse::email::OutgoingEmail;
///
/// let email = OutgoingEmail::new("a@example.com, b@example.com")
///     .from("noreply@myapp.com")
///     .from_name("My App")
///     .subject("Welcome!")
///     .html("<h1>Welcome to our app!</h1>");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingEmail {
    /// Recipient address, or several separated by commas
    pub to: String,

    /// Sender address; the configured default is used when absent
    pub from: Option<String>,

    /// Sender display name; the configured default is used when absent
    pub from_name: Option<String>,

    /// Reply-To address
    pub reply_to: Option<String>,

    /// CC address
    pub cc: Option<String>,

    /// Subject line
    pub subject: Option<String>,

    /// HTML body
    pub html: String,

    /// Extra provider headers
    pub headers: BTreeMap<String, String>,
}

impl OutgoingEmail {
    /// Start an email to `to`
    #[must_use]
    pub fn new(to: &str) -> Self {
        Self {
            to: to.to_string(),
            ..Self::default()
        }
    }

    /// Set the sender address
    #[must_use]
    pub fn from(mut self, address: &str) -> Self {
        self.from = Some(address.to_string());
        self
    }

    /// Set the sender display name
    #[must_use]
    pub fn from_name(mut self, name: &str) -> Self {
        self.from_name = Some(name.to_string());
        self
    }

    /// Set the Reply-To address
    #[must_use]
    pub fn reply_to(mut self, address: &str) -> Self {
        self.reply_to = Some(address.to_string());
        self
    }

    /// Set the CC address
    #[must_use]
    pub fn cc(mut self, address: &str) -> Self {
        self.cc = Some(address.to_string());
        self
    }

    /// Set the subject line
    #[must_use]
    pub fn subject(mut self, subject: &str) -> Self {
        self.subject = Some(subject.to_string());
        self
    }

    /// Set the HTML body
    #[must_use]
    pub fn html(mut self, body: &str) -> Self {
        self.html = body.to_string();
        self
    }

    /// Add a provider header
    #[must_use]
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_string(), value.to_string());
        self
    }
}

/// The `to` field of a provider payload
///
/// Serializes as a bare string for a single recipient and as an array
/// otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Recipients {
    /// Input without a comma, passed through unchanged
    One(String),
    /// Comma-separated input, split and trimmed
    Many(Vec<String>),
}

impl Recipients {
    /// Interpret a caller-supplied `to` value
    ///
    /// Input containing a comma is split on it; entries are trimmed and
    /// empty ones dropped. Anything else is kept as given.
    #[must_use]
    pub fn parse(to: &str) -> Self {
        if to.contains(',') {
            Self::Many(
                to.split(',')
                    .map(str::trim)
                    .filter(|address| !address.is_empty())
                    .map(str::to_string)
                    .collect(),
            )
        } else {
            Self::One(to.to_string())
        }
    }

    /// Addresses in order
    #[must_use]
    pub fn addresses(&self) -> Vec<&str> {
        match self {
            Self::One(address) => vec![address.as_str()],
            Self::Many(addresses) => addresses.iter().map(String::as_str).collect(),
        }
    }
}

/// JSON body of `POST emails`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailPayload {
    /// `"Name <address>"` or a bare address
    pub from: String,
    /// One or more recipients
    pub to: Recipients,
    /// Resolved Reply-To address
    pub reply_to: String,
    /// Subject, never blank
    pub subject: String,
    /// HTML body
    pub html: String,
    /// Plain-text rendering of `html`
    pub text: String,
    /// CC address
    pub cc: Option<String>,
    /// Extra provider headers
    pub headers: BTreeMap<String, String>,
}

/// Format a sender as `"Name <address>"`, or the bare address without a name
#[must_use]
pub fn format_sender(address: &str, name: Option<&str>) -> String {
    match name.map(str::trim).filter(|n| !n.is_empty()) {
        Some(name) => format!("{name} <{address}>"),
        None => address.to_string(),
    }
}
