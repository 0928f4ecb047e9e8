//! Email open tracking
//!
//! Every tracked email embeds a 1x1 GIF whose URL carries a [`TrackingId`].
//! The first request for that pixel marks the record as opened and captures
//! when, from which IP and with which user agent. Later requests still get the
//! pixel but change nothing.
//!
//! ```text
//! Unopened --first pixel fetch--> Opened(at, ip, user_agent)   (terminal)
//! ```
//!
//! Records live behind a [`TrackingRepository`]. Two implementations ship
//! with the crate: [`InMemoryTrackingRepository`] and
//! [`SqliteTrackingRepository`].
//!
//! # Examples
//!
//! ```rust
//! use mailpulse::tracking::{OpenTracker, RequestMetadata};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let tracker = OpenTracker::in_memory("https://mail.example.com");
//! let record = tracker.register("alice@example.com").await?;
//!
//! let html = format!(r#"<img src="{}" alt="">"#, tracker.pixel_url(record.tracking_id));
//!
//! let gif = tracker
//!     .fetch_pixel(&record.tracking_id.to_string(), RequestMetadata::default())
//!     .await?;
//! assert_eq!(gif.len(), 43);
//! # Ok(())
//! # }
//! ```

mod error;
mod memory;
mod pixel;
mod sqlite;
mod tracker;

pub use error::TrackingError;
pub use memory::InMemoryTrackingRepository;
pub use pixel::{PIXEL_CONTENT_TYPE, PIXEL_GIF};
pub use sqlite::SqliteTrackingRepository;
pub use tracker::OpenTracker;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;
use uuid::Uuid;

/// Opaque identifier embedded in a pixel URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackingId(Uuid);

impl TrackingId {
    /// Generate a fresh random (v4) identifier
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// The underlying UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for TrackingId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TrackingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for TrackingId {
    type Err = TrackingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|_| TrackingError::NotFound(s.to_string()))
    }
}

impl From<Uuid> for TrackingId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Who fetched the pixel
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestMetadata {
    /// Client IP address
    pub ip: Option<IpAddr>,
    /// `User-Agent` header
    pub user_agent: Option<String>,
}

/// The first open of a tracked email
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenEvent {
    /// When the pixel was first fetched
    pub at: DateTime<Utc>,
    /// Client IP address
    pub ip: Option<IpAddr>,
    /// `User-Agent` header
    pub user_agent: Option<String>,
}

impl OpenEvent {
    /// An open happening now, as described by `metadata`
    #[must_use]
    pub fn now(metadata: RequestMetadata) -> Self {
        Self {
            at: Utc::now(),
            ip: metadata.ip,
            user_agent: metadata.user_agent,
        }
    }
}

/// Open state of a tracked email
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum OpenState {
    /// Pixel never fetched
    Unopened,
    /// Pixel fetched at least once; holds the first fetch only
    Opened(OpenEvent),
}

/// A tracked email
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingRecord {
    /// Identifier embedded in the pixel URL
    pub tracking_id: TrackingId,
    /// Recipient address
    pub email: String,
    /// Current open state
    pub state: OpenState,
}

impl TrackingRecord {
    /// A new, unopened record for `email`
    #[must_use]
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            tracking_id: TrackingId::new(),
            email: email.into(),
            state: OpenState::Unopened,
        }
    }

    /// Whether the pixel has been fetched
    #[must_use]
    pub const fn is_opened(&self) -> bool {
        matches!(self.state, OpenState::Opened(_))
    }

    /// The first open, if any
    #[must_use]
    pub const fn opened(&self) -> Option<&OpenEvent> {
        match &self.state {
            OpenState::Opened(event) => Some(event),
            OpenState::Unopened => None,
        }
    }
}

/// Storage for tracking records
///
/// Implementations must make [`mark_opened`](TrackingRepository::mark_opened)
/// an atomic check-and-set: when several callers race on an unopened record,
/// exactly one of them wins and its event is the one stored.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TrackingRepository: Send + Sync {
    /// Persist a new record
    ///
    /// # Errors
    ///
    /// Returns `TrackingError` if the record cannot be stored
    async fn create(&self, record: &TrackingRecord) -> Result<(), TrackingError>;

    /// Look a record up
    ///
    /// # Errors
    ///
    /// Returns `TrackingError` if the lookup itself fails
    async fn find_by_id(&self, id: TrackingId) -> Result<Option<TrackingRecord>, TrackingError>;

    /// Transition the record to opened unless it already is
    ///
    /// Returns `true` when this call performed the transition.
    ///
    /// # Errors
    ///
    /// Returns `TrackingError::NotFound` for an unknown identifier
    async fn mark_opened(&self, id: TrackingId, event: OpenEvent) -> Result<bool, TrackingError>;
}
