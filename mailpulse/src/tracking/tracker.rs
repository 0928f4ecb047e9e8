//! Open tracker service

use std::sync::Arc;
use tracing::{debug, error, info};

use super::{
    InMemoryTrackingRepository, OpenEvent, RequestMetadata, SqliteTrackingRepository,
    TrackingError, TrackingId, TrackingRecord, TrackingRepository, PIXEL_GIF,
};
use crate::config::TrackingSettings;

/// Registers tracked emails and serves their pixel
pub struct OpenTracker {
    repository: Arc<dyn TrackingRepository>,
    public_base_url: String,
}

impl std::fmt::Debug for OpenTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenTracker")
            .field("public_base_url", &self.public_base_url)
            .finish_non_exhaustive()
    }
}

impl OpenTracker {
    /// Create a tracker over `repository`
    ///
    /// `public_base_url` is the externally reachable origin of the pixel
    /// route, used by [`pixel_url`](Self::pixel_url).
    #[must_use]
    pub fn new(repository: Arc<dyn TrackingRepository>, public_base_url: &str) -> Self {
        Self {
            repository,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Create a tracker backed by an [`InMemoryTrackingRepository`]
    #[must_use]
    pub fn in_memory(public_base_url: &str) -> Self {
        Self::new(Arc::new(InMemoryTrackingRepository::new()), public_base_url)
    }

    /// Create a tracker from configuration
    ///
    /// Uses SQLite when `database_url` is set, memory otherwise.
    ///
    /// # Errors
    ///
    /// Returns `TrackingError::Database` if the database cannot be opened
    pub async fn from_settings(settings: &TrackingSettings) -> Result<Self, TrackingError> {
        match settings.database_url.as_deref() {
            Some(url) => {
                let repository = SqliteTrackingRepository::connect(url).await?;
                info!("Open tracking backed by SQLite");
                Ok(Self::new(Arc::new(repository), &settings.public_base_url))
            }
            None => {
                info!("Open tracking backed by memory; records are lost on restart");
                Ok(Self::in_memory(&settings.public_base_url))
            }
        }
    }

    /// Register a new tracked email
    ///
    /// # Errors
    ///
    /// Returns `TrackingError::InvalidEmail` for a blank address, or a
    /// storage error
    pub async fn register(&self, email: &str) -> Result<TrackingRecord, TrackingError> {
        let email = email.trim();
        if email.is_empty() {
            return Err(TrackingError::InvalidEmail(email.to_string()));
        }

        let record = TrackingRecord::new(email);
        self.repository.create(&record).await?;
        debug!(tracking_id = %record.tracking_id, email = %email, "Registered tracked email");
        Ok(record)
    }

    /// Look a record up by its textual identifier
    ///
    /// # Errors
    ///
    /// Returns `TrackingError::NotFound` for unknown or malformed identifiers
    pub async fn find(&self, tracking_id: &str) -> Result<TrackingRecord, TrackingError> {
        let id: TrackingId = tracking_id.parse()?;
        self.repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| TrackingError::NotFound(tracking_id.to_string()))
    }

    /// Record an open and return the pixel
    ///
    /// The first fetch moves the record to opened; later fetches change
    /// nothing. Storage failures while recording the open are logged and the
    /// pixel is served anyway.
    ///
    /// # Errors
    ///
    /// Returns `TrackingError::NotFound` for unknown or malformed identifiers
    pub async fn fetch_pixel(
        &self,
        tracking_id: &str,
        metadata: RequestMetadata,
    ) -> Result<&'static [u8], TrackingError> {
        let record = self.find(tracking_id).await?;

        if !record.is_opened() {
            match self
                .repository
                .mark_opened(record.tracking_id, OpenEvent::now(metadata))
                .await
            {
                Ok(true) => info!(tracking_id = %record.tracking_id, "Email opened"),
                Ok(false) => {}
                Err(e) => {
                    error!(tracking_id = %record.tracking_id, error = %e, "Failed to record email open");
                }
            }
        }

        Ok(&PIXEL_GIF)
    }

    /// Public URL of the pixel for `tracking_id`
    #[must_use]
    pub fn pixel_url(&self, tracking_id: TrackingId) -> String {
        format!("{}/track/pixel/{tracking_id}", self.public_base_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::{MockTrackingRepository, OpenState};

    fn metadata(agent: &str) -> RequestMetadata {
        RequestMetadata {
            ip: Some("192.0.2.10".parse().unwrap()),
            user_agent: Some(agent.to_string()),
        }
    }

    #[tokio::test]
    async fn test_register_then_open() {
        let tracker = OpenTracker::in_memory("https://mail.example.com/");
        let record = tracker.register("alice@example.com").await.unwrap();
        assert!(!record.is_opened());

        let gif = tracker
            .fetch_pixel(&record.tracking_id.to_string(), metadata("Apple Mail"))
            .await
            .unwrap();
        assert_eq!(gif, PIXEL_GIF.as_slice());

        let stored = tracker.find(&record.tracking_id.to_string()).await.unwrap();
        assert_eq!(
            stored.opened().unwrap().user_agent.as_deref(),
            Some("Apple Mail")
        );
    }

    #[tokio::test]
    async fn test_reopen_keeps_first_open() {
        let tracker = OpenTracker::in_memory("https://mail.example.com");
        let record = tracker.register("alice@example.com").await.unwrap();
        let id = record.tracking_id.to_string();

        tracker.fetch_pixel(&id, metadata("first")).await.unwrap();
        let gif = tracker.fetch_pixel(&id, metadata("second")).await.unwrap();

        assert_eq!(gif.len(), 43);
        let stored = tracker.find(&id).await.unwrap();
        assert_eq!(stored.opened().unwrap().user_agent.as_deref(), Some("first"));
    }

    #[tokio::test]
    async fn test_unknown_and_malformed_ids() {
        let tracker = OpenTracker::in_memory("https://mail.example.com");

        let unknown = tracker
            .fetch_pixel(&TrackingId::new().to_string(), RequestMetadata::default())
            .await;
        let malformed = tracker
            .fetch_pixel("../etc/passwd", RequestMetadata::default())
            .await;

        assert!(matches!(unknown, Err(TrackingError::NotFound(_))));
        assert!(matches!(malformed, Err(TrackingError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_blank_email_is_rejected() {
        let tracker = OpenTracker::in_memory("https://mail.example.com");
        assert!(matches!(
            tracker.register("  ").await,
            Err(TrackingError::InvalidEmail(_))
        ));
    }

    #[tokio::test]
    async fn test_storage_failure_still_serves_pixel() {
        let record = TrackingRecord::new("alice@example.com");
        let stored = record.clone();

        let mut repository = MockTrackingRepository::new();
        repository
            .expect_find_by_id()
            .returning(move |_| Ok(Some(stored.clone())));
        repository.expect_mark_opened().times(1).returning(|_, _| {
            Err(TrackingError::Corrupt {
                id: "x".to_string(),
                reason: "disk full".to_string(),
            })
        });

        let tracker = OpenTracker::new(Arc::new(repository), "https://mail.example.com");
        let gif = tracker
            .fetch_pixel(&record.tracking_id.to_string(), RequestMetadata::default())
            .await
            .unwrap();

        assert_eq!(gif.len(), 43);
        assert_eq!(record.state, OpenState::Unopened);
    }

    #[test]
    fn test_pixel_url() {
        let tracker = OpenTracker::in_memory("https://mail.example.com/");
        let id = TrackingId::new();
        assert_eq!(
            tracker.pixel_url(id),
            format!("https://mail.example.com/track/pixel/{id}")
        );
    }
}
