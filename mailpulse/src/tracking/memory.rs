//! In-process tracking store

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

use super::{OpenEvent, OpenState, TrackingError, TrackingId, TrackingRecord, TrackingRepository};

/// Tracking records held in memory
///
/// Records are lost when the process exits. Used when no database is
/// configured, and in tests.
#[derive(Debug, Default)]
pub struct InMemoryTrackingRepository {
    records: RwLock<HashMap<TrackingId, TrackingRecord>>,
}

impl InMemoryTrackingRepository {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Whether the store holds no records
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

#[async_trait]
impl TrackingRepository for InMemoryTrackingRepository {
    async fn create(&self, record: &TrackingRecord) -> Result<(), TrackingError> {
        self.records
            .write()
            .insert(record.tracking_id, record.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: TrackingId) -> Result<Option<TrackingRecord>, TrackingError> {
        Ok(self.records.read().get(&id).cloned())
    }

    async fn mark_opened(&self, id: TrackingId, event: OpenEvent) -> Result<bool, TrackingError> {
        let mut records = self.records.write();
        let record = records
            .get_mut(&id)
            .ok_or_else(|| TrackingError::NotFound(id.to_string()))?;

        if record.is_opened() {
            return Ok(false);
        }
        record.state = OpenState::Opened(event);
        Ok(true)
    }
}
