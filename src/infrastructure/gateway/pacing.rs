//! Minimum-interval request pacing

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

/// Spaces requests at least `interval` apart.
///
/// Each caller reserves the next free slot under a short lock and then sleeps
/// until that slot outside the lock, so concurrent callers queue up in
/// reservation order instead of all firing when one interval elapses.
#[derive(Debug)]
pub struct RequestPacer {
    interval: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl RequestPacer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_slot: Mutex::new(None),
        }
    }

    /// A pacer that never waits
    pub fn unpaced() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Reserve the next request slot without waiting for it
    pub fn reserve(&self) -> Instant {
        let now = Instant::now();
        let mut next = self.next_slot.lock().unwrap_or_else(PoisonError::into_inner);
        let slot = match *next {
            Some(reserved) if reserved > now => reserved,
            _ => now,
        };
        *next = Some(slot + self.interval);
        slot
    }

    /// Wait until this caller may issue its request
    pub async fn wait(&self) {
        if self.interval.is_zero() {
            return;
        }
        let slot = self.reserve();
        tokio::time::sleep_until(slot).await;
    }
}
