//! SQLite-backed tracking store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::net::IpAddr;
use std::str::FromStr;
use tracing::debug;

use super::{OpenEvent, OpenState, TrackingError, TrackingId, TrackingRecord, TrackingRepository};

/// An in-memory database lives only as long as its single connection,
/// which must never be reaped.
fn pool_options(url: &str) -> SqlitePoolOptions {
    if url.contains(":memory:") {
        SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new().max_connections(5)
    }
}

type PixelRow = (
    String,
    String,
    bool,
    Option<String>,
    Option<String>,
    Option<String>,
);

/// Tracking records in the `email_pixels` table
#[derive(Debug, Clone)]
pub struct SqliteTrackingRepository {
    pool: SqlitePool,
}

impl SqliteTrackingRepository {
    /// Wrap an existing pool
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if needed) the database at `url` and run [`migrate`](Self::migrate)
    ///
    /// # Errors
    ///
    /// Returns error if the URL is invalid, the database cannot be opened,
    /// or the schema cannot be created
    pub async fn connect(url: &str) -> Result<Self, TrackingError> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = pool_options(url).connect_with(options).await?;

        let repository = Self::new(pool);
        repository.migrate().await?;
        Ok(repository)
    }

    /// Create the `email_pixels` table if it does not exist
    ///
    /// # Errors
    ///
    /// Returns error if the database query fails
    pub async fn migrate(&self) -> Result<(), TrackingError> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS email_pixels (
                tracking_id TEXT PRIMARY KEY NOT NULL,
                email TEXT NOT NULL,
                opened INTEGER NOT NULL DEFAULT 0,
                opened_at TEXT,
                ip_address TEXT,
                user_agent TEXT
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        debug!("email_pixels table ready");
        Ok(())
    }

    /// The underlying pool
    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    fn decode(row: PixelRow) -> Result<TrackingRecord, TrackingError> {
        let (id, email, opened, opened_at, ip_address, user_agent) = row;
        let corrupt = |reason: String| TrackingError::Corrupt {
            id: id.clone(),
            reason,
        };

        let tracking_id = uuid::Uuid::parse_str(&id)
            .map_err(|e| corrupt(format!("tracking_id: {e}")))?
            .into();

        let state = if opened {
            let at = opened_at
                .as_deref()
                .map(DateTime::parse_from_rfc3339)
                .transpose()
                .map_err(|e| corrupt(format!("opened_at: {e}")))?
                .ok_or_else(|| corrupt("opened without opened_at".to_string()))?
                .with_timezone(&Utc);
            let ip = ip_address
                .as_deref()
                .map(str::parse::<IpAddr>)
                .transpose()
                .map_err(|e| corrupt(format!("ip_address: {e}")))?;

            OpenState::Opened(OpenEvent { at, ip, user_agent })
        } else {
            OpenState::Unopened
        };

        Ok(TrackingRecord {
            tracking_id,
            email,
            state,
        })
    }
}

#[async_trait]
impl TrackingRepository for SqliteTrackingRepository {
    async fn create(&self, record: &TrackingRecord) -> Result<(), TrackingError> {
        let (opened, opened_at, ip_address, user_agent) = match &record.state {
            OpenState::Unopened => (false, None, None, None),
            OpenState::Opened(event) => (
                true,
                Some(event.at.to_rfc3339()),
                event.ip.map(|ip| ip.to_string()),
                event.user_agent.clone(),
            ),
        };

        sqlx::query(
            r"
            INSERT INTO email_pixels (tracking_id, email, opened, opened_at, ip_address, user_agent)
            VALUES (?, ?, ?, ?, ?, ?)
            ",
        )
        .bind(record.tracking_id.to_string())
        .bind(&record.email)
        .bind(opened)
        .bind(opened_at)
        .bind(ip_address)
        .bind(user_agent)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_id(&self, id: TrackingId) -> Result<Option<TrackingRecord>, TrackingError> {
        let row = sqlx::query_as::<_, PixelRow>(
            r"
            SELECT tracking_id, email, opened, opened_at, ip_address, user_agent
            FROM email_pixels
            WHERE tracking_id = ?
            ",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::decode).transpose()
    }

    async fn mark_opened(&self, id: TrackingId, event: OpenEvent) -> Result<bool, TrackingError> {
        let result = sqlx::query(
            r"
            UPDATE email_pixels
            SET opened = 1, opened_at = ?, ip_address = ?, user_agent = ?
            WHERE tracking_id = ? AND opened = 0
            ",
        )
        .bind(event.at.to_rfc3339())
        .bind(event.ip.map(|ip| ip.to_string()))
        .bind(event.user_agent)
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            return Ok(true);
        }

        let exists: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM email_pixels WHERE tracking_id = ?")
                .bind(id.to_string())
                .fetch_one(&self.pool)
                .await?;

        if exists.0 == 0 {
            return Err(TrackingError::NotFound(id.to_string()));
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::RequestMetadata;
    use std::sync::Arc;

    async fn repository() -> SqliteTrackingRepository {
        SqliteTrackingRepository::connect("sqlite::memory:")
            .await
            .unwrap()
    }

    fn event(ip: &str, agent: &str) -> OpenEvent {
        OpenEvent::now(RequestMetadata {
            ip: Some(ip.parse().unwrap()),
            user_agent: Some(agent.to_string()),
        })
    }

    #[tokio::test]
    async fn test_create_and_find() {
        let repo = repository().await;
        let record = TrackingRecord::new("alice@example.com");

        repo.create(&record).await.unwrap();

        let found = repo.find_by_id(record.tracking_id).await.unwrap().unwrap();
        assert_eq!(found, record);
        assert!(repo.find_by_id(TrackingId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_open_transition_is_set_once() {
        let repo = repository().await;
        let record = TrackingRecord::new("alice@example.com");
        repo.create(&record).await.unwrap();

        let first = event("203.0.113.7", "Apple Mail");
        assert!(repo.mark_opened(record.tracking_id, first.clone()).await.unwrap());
        assert!(!repo
            .mark_opened(record.tracking_id, event("2001:db8::1", "Outlook"))
            .await
            .unwrap());

        let stored = repo.find_by_id(record.tracking_id).await.unwrap().unwrap();
        let opened = stored.opened().unwrap();
        assert_eq!(opened.ip, first.ip);
        assert_eq!(opened.user_agent.as_deref(), Some("Apple Mail"));
        assert_eq!(opened.at.timestamp_micros(), first.at.timestamp_micros());
    }

    #[tokio::test]
    async fn test_mark_unknown_is_not_found() {
        let repo = repository().await;
        let err = repo
            .mark_opened(TrackingId::new(), event("203.0.113.7", "x"))
            .await
            .unwrap_err();
        assert!(matches!(err, TrackingError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_migrate_is_idempotent() {
        let repo = repository().await;
        repo.migrate().await.unwrap();
        repo.migrate().await.unwrap();
    }

    #[tokio::test]
    async fn test_memory_pool_keeps_its_connection() {
        let repo = repository().await;
        let options = repo.pool().options();

        assert_eq!(options.get_max_connections(), 1);
        assert_eq!(options.get_min_connections(), 1);
        assert_eq!(options.get_idle_timeout(), None);
        assert_eq!(options.get_max_lifetime(), None);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_opens_on_file_database_have_one_winner() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("pixels.db").display());
        let repo = Arc::new(SqliteTrackingRepository::connect(&url).await.unwrap());
        assert_eq!(repo.pool().options().get_max_connections(), 5);

        let record = TrackingRecord::new("alice@example.com");
        repo.create(&record).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..12 {
            let repo = Arc::clone(&repo);
            let id = record.tracking_id;
            handles.push(tokio::spawn(async move {
                let agent = format!("agent-{i}");
                let opened = repo.mark_opened(id, event("203.0.113.7", &agent)).await.unwrap();
                (opened, agent)
            }));
        }

        let mut winners = Vec::new();
        for handle in handles {
            let (opened, agent) = handle.await.unwrap();
            if opened {
                winners.push(agent);
            }
        }
        assert_eq!(winners.len(), 1);

        let stored = repo.find_by_id(record.tracking_id).await.unwrap().unwrap();
        let winning_event = stored.opened().unwrap();
        assert_eq!(winning_event.user_agent.as_deref(), Some(winners[0].as_str()));
    }
}
