//! Axum extractors for mailpulse
//!
//! Provides validated JSON bodies and the pixel requester's metadata.

mod client;
mod validated;

pub use client::ClientMetadata;
pub use validated::{format_validation_errors, ValidatedJson, ValidationError};
