//! Outbound request throttling
//!
//! Spaces requests to the delivery API at least `min_interval` apart. The
//! state lives inside one transport instance; the read of the last dispatch
//! time and the write of the next slot happen under a single lock
//! acquisition, so concurrent callers queue up behind each other instead of
//! racing for the same slot.
//!
//! # Example
//!
//! ```text
//! Limit: 60 requests/minute -> min_interval = 1s
//! t=0.0  caller A reserves slot 0.0, dispatches immediately
//! t=0.1  caller B reserves slot 1.0, sleeps 0.9s
//! t=0.2  caller C reserves slot 2.0, sleeps 1.8s
//! ```

use parking_lot::Mutex;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::debug;

/// Minimum-interval throttle owned by a single transport
#[derive(Debug)]
pub struct Throttle {
    /// Minimum spacing between two dispatches
    min_interval: Duration,
    /// Start of the most recently reserved or completed dispatch
    last_dispatch: Mutex<Option<Instant>>,
}

impl Throttle {
    /// Create a throttle with the given minimum spacing
    #[must_use]
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_dispatch: Mutex::new(None),
        }
    }

    /// Create a throttle from a requests-per-minute limit
    ///
    /// A limit of zero disables throttling.
    #[must_use]
    pub fn per_minute(requests_per_minute: u32) -> Self {
        if requests_per_minute == 0 {
            return Self::new(Duration::ZERO);
        }
        Self::new(Duration::from_secs(60) / requests_per_minute)
    }

    /// Minimum spacing between two dispatches
    #[must_use]
    pub const fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Reserve the next dispatch slot and return how long to wait for it
    pub fn reserve(&self) -> Duration {
        let now = Instant::now();

        let mut last = self.last_dispatch.lock();
        let slot = last.map_or(now, |prev| (prev + self.min_interval).max(now));
        *last = Some(slot);
        drop(last);

        slot - now
    }

    /// Wait until the caller may dispatch
    pub async fn acquire(&self) {
        let wait = self.reserve();
        if wait.is_zero() {
            return;
        }

        debug!(
            wait_ms = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX),
            "Throttling outbound request"
        );
        sleep(wait).await;
    }

    /// Record that a response was just received
    ///
    /// Moves the last dispatch time forward, never backward, so a slow
    /// response pushes the next slot out rather than pulling it in.
    pub fn record_dispatch(&self) {
        let now = Instant::now();
        let mut last = self.last_dispatch.lock();
        if last.is_none_or(|prev| now > prev) {
            *last = Some(now);
        }
    }
}
