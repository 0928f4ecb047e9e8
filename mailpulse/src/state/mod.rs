//! Application state shared by the HTTP handlers

use std::sync::Arc;

use crate::config::MailpulseConfig;
use crate::email::DeliveryService;
use crate::error::MailpulseError;
use crate::tracking::OpenTracker;

/// State handed to every handler
///
/// # Example
///
/// ```rust,no_run
/// use mailpulse::config::MailpulseConfig;
/// use mailpulse::handlers;
/// use mailpulse::state::AppState;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = MailpulseConfig::load()?;
/// let state = AppState::from_config(&config).await?;
///
/// let app = handlers::router(state);
/// let listener = tokio::net::TcpListener::bind(&config.server.bind_address).await?;
/// axum::serve(listener, app).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct AppState {
    /// Outbound email delivery
    pub delivery: Arc<DeliveryService>,

    /// Open tracking
    pub tracker: Arc<OpenTracker>,

    /// Take the pixel requester's IP from `X-Forwarded-For`
    pub trust_forwarded_for: bool,
}

impl AppState {
    /// Assemble state from already-built services
    #[must_use]
    pub fn new(delivery: DeliveryService, tracker: OpenTracker) -> Self {
        Self {
            delivery: Arc::new(delivery),
            tracker: Arc::new(tracker),
            trust_forwarded_for: false,
        }
    }

    /// Trust the first `X-Forwarded-For` hop as the client IP
    #[must_use]
    pub const fn with_forwarded_for(mut self, trust: bool) -> Self {
        self.trust_forwarded_for = trust;
        self
    }

    /// Validate configuration, then build every service from it
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - A required setting is missing or invalid ([`MailpulseError::Config`])
    /// - The delivery transport cannot be built
    /// - The tracking database cannot be opened
    pub async fn from_config(config: &MailpulseConfig) -> Result<Self, MailpulseError> {
        config.validate()?;
        let delivery = DeliveryService::from_config(config)?;
        let tracker = OpenTracker::from_settings(&config.tracking).await?;

        Ok(Self::new(delivery, tracker).with_forwarded_for(config.tracking.trust_forwarded_for))
    }
}
