//! `GET /track/pixel/{tracking_id}`

use axum::{
    extract::{Path, State},
    http::header::{CACHE_CONTROL, CONTENT_TYPE},
    response::{IntoResponse, Response},
};

use crate::error::MailpulseError;
use crate::extractors::ClientMetadata;
use crate::state::AppState;
use crate::tracking::PIXEL_CONTENT_TYPE;

/// Serve the tracking pixel and record the first open
///
/// # Errors
///
/// Unknown or malformed identifiers are `404`.
pub async fn tracking_pixel(
    State(state): State<AppState>,
    Path(tracking_id): Path<String>,
    ClientMetadata(metadata): ClientMetadata,
) -> Result<Response, MailpulseError> {
    let gif = state.tracker.fetch_pixel(&tracking_id, metadata).await?;

    Ok((
        [(CONTENT_TYPE, PIXEL_CONTENT_TYPE), (CACHE_CONTROL, "no-store")],
        gif,
    )
        .into_response())
}
