//! Retry policy for rate-limited requests
//!
//! Only `429 Too Many Requests` is retried, and only a bounded number of
//! times. Every other failure is returned to the caller on the first attempt.

use http::header::RETRY_AFTER;
use http::HeaderMap;
use std::time::{Duration, SystemTime};

use crate::config::ProviderSettings;

/// Retry behaviour for 429 responses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Re-issues allowed after the first rate-limited response
    pub max_rate_limit_retries: u32,

    /// Delay used when the provider sends no usable `Retry-After`
    pub default_retry_after: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_rate_limit_retries: 1,
            default_retry_after: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Build the policy from provider settings
    #[must_use]
    pub const fn from_settings(settings: &ProviderSettings) -> Self {
        Self {
            max_rate_limit_retries: settings.max_rate_limit_retries,
            default_retry_after: settings.default_retry_after(),
        }
    }

    /// Whether another re-issue is allowed after `retries` re-issues so far
    #[must_use]
    pub const fn should_retry(&self, retries: u32) -> bool {
        retries < self.max_rate_limit_retries
    }

    /// How long to wait before re-issuing a rate-limited request
    #[must_use]
    pub fn retry_delay(&self, headers: &HeaderMap) -> Duration {
        parse_retry_after(headers, SystemTime::now()).unwrap_or(self.default_retry_after)
    }
}

/// Parse a `Retry-After` header
///
/// Accepts both forms allowed by RFC 9110: delta-seconds (`120`) and an
/// HTTP-date. A date in the past yields a zero delay. Returns `None` when the
/// header is absent or unparseable.
#[must_use]
pub fn parse_retry_after(headers: &HeaderMap, now: SystemTime) -> Option<Duration> {
    let value = headers.get(RETRY_AFTER)?.to_str().ok()?.trim();

    if let Ok(secs) = value.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }

    let at = httpdate::parse_http_date(value).ok()?;
    Some(at.duration_since(now).unwrap_or(Duration::ZERO))
}
