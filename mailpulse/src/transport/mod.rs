//! Outbound delivery API transport
//!
//! Wraps the HTTP verbs of one upstream API with a minimum-interval throttle
//! and a bounded retry on `429 Too Many Requests`.
//!
//! # Examples
//!
//! ```rust,no_run
//! use mailpulse::config::MailpulseConfig;
//! use mailpulse::transport::{ApiTransport, RateLimitedTransport};
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = MailpulseConfig::load()?;
//! let transport = RateLimitedTransport::new(&config.provider)?;
//!
//! transport
//!     .post("emails", &json!({"to": "user@example.com", "subject": "Hi"}))
//!     .await?;
//! # Ok(())
//! # }
//! ```

mod client;
mod error;
mod retry;
mod throttle;

pub use client::RateLimitedTransport;
pub use error::TransportError;
pub use retry::{parse_retry_after, RetryPolicy};
pub use throttle::Throttle;

use async_trait::async_trait;
use serde_json::Value;

/// HTTP verbs against one upstream JSON API
///
/// Each call resolves to the parsed JSON body, or `None` when the provider
/// returned an empty body.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ApiTransport: Send + Sync {
    /// POST a JSON payload to `endpoint`
    ///
    /// # Errors
    ///
    /// Returns `TransportError` if the request fails, is rate limited past
    /// the retry budget, or the provider answers with a non-success status
    async fn post(&self, endpoint: &str, payload: &Value) -> Result<Option<Value>, TransportError>;

    /// GET `endpoint` with query parameters
    ///
    /// # Errors
    ///
    /// Same failure modes as [`ApiTransport::post`]
    async fn get(
        &self,
        endpoint: &str,
        query: &[(String, String)],
    ) -> Result<Option<Value>, TransportError>;

    /// PUT a JSON payload to `endpoint`
    ///
    /// # Errors
    ///
    /// Same failure modes as [`ApiTransport::post`]
    async fn put(&self, endpoint: &str, payload: &Value) -> Result<Option<Value>, TransportError>;

    /// DELETE `endpoint`
    ///
    /// # Errors
    ///
    /// Same failure modes as [`ApiTransport::post`]
    async fn delete(&self, endpoint: &str) -> Result<Option<Value>, TransportError>;
}
