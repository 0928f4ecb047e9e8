//! mailpulse: transactional email delivery with open tracking
//!
//! Sends email through a third-party delivery API and tells you whether it
//! was opened:
//! - **transport**: throttled, retry-aware client for the provider API
//! - **email**: payload building, sender defaults, named templates, alerts
//! - **tracking**: tracking identifiers, the 1x1 pixel, first-open capture
//! - **handlers**: the axum adapter (`POST /send`, `GET /track/pixel/{id}`)
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use mailpulse::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     observability::init()?;
//!
//!     let config = MailpulseConfig::load()?;
//!     config.validate()?;
//!
//!     let state = AppState::from_config(&config).await?;
//!     let listener = tokio::net::TcpListener::bind(&config.server.bind_address).await?;
//!     axum::serve(
//!         listener,
//!         handlers::router(state).into_make_service_with_connect_info::<std::net::SocketAddr>(),
//!     )
//!     .await?;
//!
//!     Ok(())
//! }
//! ```

// Lint configuration is handled at the workspace level in Cargo.toml
#![allow(clippy::missing_errors_doc)]

pub mod config;
pub mod email;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod observability;
pub mod state;
pub mod tracking;
pub mod transport;

/// Commonly used types
pub mod prelude {
    pub use crate::config::MailpulseConfig;
    pub use crate::email::{DeliveryService, EmailError, OutgoingEmail};
    pub use crate::error::MailpulseError;
    pub use crate::handlers;
    pub use crate::observability;
    pub use crate::state::AppState;
    pub use crate::tracking::{OpenTracker, RequestMetadata, TrackingError, TrackingId};
    pub use crate::transport::{ApiTransport, RateLimitedTransport, TransportError};
}
