//! Transactional email delivery
//!
//! This module turns an [`OutgoingEmail`] into the provider's JSON payload and
//! posts it through an [`ApiTransport`](crate::transport::ApiTransport):
//! - Sender, display name and Reply-To defaults from [`SenderSettings`](crate::config::SenderSettings)
//! - Comma-separated recipients sent as a list
//! - A plain-text alternative derived from the HTML body
//! - Named minijinja templates rendered with the caller's context under `data`
//!
//! # Examples
//!
//! ## Sending a simple email
//!
//! ```rust,no_run
//! use mailpulse::config::MailpulseConfig;
//! use mailpulse::email::{DeliveryService, OutgoingEmail};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = MailpulseConfig::load()?;
//! let delivery = DeliveryService::from_config(&config)?;
//!
//! let email = OutgoingEmail::new("user@example.com")
//!     .subject("Welcome!")
//!     .html("<h1>Welcome to our app!</h1>");
//!
//! delivery.send(email).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Alerting operators
//!
//! ```rust,no_run
//! # use mailpulse::email::DeliveryService;
//! # async fn example(delivery: &DeliveryService) -> Result<(), Box<dyn std::error::Error>> {
//! delivery
//!     .send_system_alert("Queue backlog", "More than 10k pending jobs")
//!     .await?;
//! # Ok(())
//! # }
//! ```

mod error;
mod message;
mod service;
mod template;

pub use error::EmailError;
pub use message::{format_sender, EmailPayload, OutgoingEmail, Recipients, DEFAULT_SUBJECT};
pub use service::{DeliveryService, EMAILS_ENDPOINT};
pub use template::TemplateStore;
