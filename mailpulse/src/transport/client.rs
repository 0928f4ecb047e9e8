//! Rate-limited HTTP client for the delivery API

use async_trait::async_trait;
use reqwest::{Client, Method, Request, RequestBuilder, Response, StatusCode};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use super::{ApiTransport, RetryPolicy, Throttle, TransportError};
use crate::config::ProviderSettings;

/// Throttled, retry-aware client for one upstream API
///
/// Every request carries the bearer credential and the configured timeout,
/// waits for its throttle slot, and is re-issued a bounded number of times
/// when the provider answers 429.
///
/// # Examples
///
/// ```rust,no_run
/// use mailpulse::config::ProviderSettings;
/// use mailpulse::transport::{ApiTransport, RateLimitedTransport};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let settings = ProviderSettings {
///     api_key: "em_live_...".to_string(),
///     ..ProviderSettings::default()
/// };
/// let transport = RateLimitedTransport::new(&settings)?;
///
/// let body = transport.get("domains", &[]).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct RateLimitedTransport {
    client: Client,
    retry_client: Client,
    base_url: String,
    api_key: String,
    throttle: Throttle,
    retry: RetryPolicy,
}

impl RateLimitedTransport {
    /// Build a transport from provider settings
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Configuration`] when the API key is empty,
    /// or [`TransportError::Http`] if the HTTP client cannot be built.
    pub fn new(settings: &ProviderSettings) -> Result<Self, TransportError> {
        if settings.api_key.trim().is_empty() {
            error!("provider.api_key is required for the delivery transport");
            return Err(TransportError::configuration("provider.api_key is required"));
        }

        let client = Client::builder()
            .timeout(settings.request_timeout())
            .build()?;

        // Re-issued requests never reuse a pooled connection
        let retry_client = Client::builder()
            .timeout(settings.request_timeout())
            .pool_max_idle_per_host(0)
            .build()?;

        Ok(Self {
            client,
            retry_client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
            throttle: Throttle::new(settings.min_interval()),
            retry: RetryPolicy::from_settings(settings),
        })
    }

    /// The throttle guarding this transport
    #[must_use]
    pub const fn throttle(&self) -> &Throttle {
        &self.throttle
    }

    /// The retry policy applied to 429 responses
    #[must_use]
    pub const fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Absolute URL for an endpoint path
    #[must_use]
    pub fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'))
    }

    fn request(&self, method: Method, endpoint: &str) -> RequestBuilder {
        self.client
            .request(method, self.url(endpoint))
            .bearer_auth(&self.api_key)
    }

    async fn dispatch(&self, builder: RequestBuilder) -> Result<Option<Value>, TransportError> {
        let request = builder.build()?;
        let method = request.method().clone();
        let url = request.url().clone();
        let replay = request.try_clone();

        self.throttle.acquire().await;
        debug!(method = %method, url = %url, "Dispatching delivery API request");
        let outcome = self.client.execute(request).await;
        self.throttle.record_dispatch();
        let mut response = outcome?;

        let mut retries = 0;
        while response.status() == StatusCode::TOO_MANY_REQUESTS {
            let delay = self.retry.retry_delay(response.headers());
            let next = replay
                .as_ref()
                .filter(|_| self.retry.should_retry(retries))
                .and_then(Request::try_clone);

            let Some(next) = next else {
                let body = response.text().await.unwrap_or_default();
                error!(
                    method = %method,
                    url = %url,
                    attempts = retries + 1,
                    "Rate limit still exceeded, giving up"
                );
                return Err(TransportError::RateLimited {
                    attempts: retries + 1,
                    body,
                });
            };

            warn!(
                method = %method,
                url = %url,
                retry_after_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                "Rate limit exceeded, retrying after provider delay"
            );
            tokio::time::sleep(delay).await;
            retries += 1;

            info!(method = %method, url = %url, "Retrying request");
            let outcome = self.retry_client.execute(next).await;
            self.throttle.record_dispatch();
            response = outcome?;
        }

        Self::handle_response(response).await
    }

    async fn handle_response(response: Response) -> Result<Option<Value>, TransportError> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            error!(status = %status, body = %body, "Delivery API request failed");
            return Err(TransportError::Status { status, body });
        }

        if body.trim().is_empty() {
            return Ok(None);
        }

        Ok(Some(serde_json::from_str(&body)?))
    }
}

#[async_trait]
impl ApiTransport for RateLimitedTransport {
    async fn post(&self, endpoint: &str, payload: &Value) -> Result<Option<Value>, TransportError> {
        self.dispatch(self.request(Method::POST, endpoint).json(payload))
            .await
    }

    async fn get(
        &self,
        endpoint: &str,
        query: &[(String, String)],
    ) -> Result<Option<Value>, TransportError> {
        self.dispatch(self.request(Method::GET, endpoint).query(query))
            .await
    }

    async fn put(&self, endpoint: &str, payload: &Value) -> Result<Option<Value>, TransportError> {
        self.dispatch(self.request(Method::PUT, endpoint).json(payload))
            .await
    }

    async fn delete(&self, endpoint: &str) -> Result<Option<Value>, TransportError> {
        self.dispatch(self.request(Method::DELETE, endpoint)).await
    }
}
