//! HTTP handlers
//!
//! - `POST /send` sends an email, optionally rendering a named template
//! - `GET /track/pixel/{tracking_id}` serves the open-tracking pixel
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use mailpulse::handlers;
//! use mailpulse::state::AppState;
//! use std::net::SocketAddr;
//!
//! # async fn example(state: AppState) -> anyhow::Result<()> {
//! let app = handlers::router(state);
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await?;
//! axum::serve(
//!     listener,
//!     app.into_make_service_with_connect_info::<SocketAddr>(),
//! )
//! .await?;
//! # Ok(())
//! # }
//! ```

pub mod pixel;
pub mod send;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the application router
#[must_use]
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/send", post(send::send_email))
        .route("/track/pixel/{tracking_id}", get(pixel::tracking_pixel))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
