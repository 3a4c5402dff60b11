//! Batch pacing for the quota-limited document store
//!
//! Health store deliveries can arrive back to back. Each batch call is held
//! open for at least a minimum wall-clock duration, which caps the number of
//! batches per second regardless of batch size or store latency.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;

/// Minimum duration of one batch call (1s plus 0.2s buffer)
pub const DEFAULT_MINIMUM_DURATION: Duration = Duration::from_millis(1200);

/// Default number of concurrent store writes per batch
pub const DEFAULT_MAX_CONCURRENT: usize = 16;

/// Holds a batch open until its minimum duration has passed
#[derive(Debug, Clone, Copy)]
pub struct BatchFloor {
    minimum: Duration,
    started: Instant,
}

impl BatchFloor {
    /// Start measuring at batch entry
    pub fn start(minimum: Duration) -> Self {
        Self {
            minimum,
            started: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Time left before the floor is reached
    pub fn remaining(&self) -> Duration {
        self.minimum.saturating_sub(self.elapsed())
    }

    /// Sleep for `max(0, minimum - elapsed)`
    pub async fn wait(self) -> Duration {
        let remaining = self.remaining();
        if !remaining.is_zero() {
            tokio::time::sleep(remaining).await;
        }
        remaining
    }
}

/// Limits concurrent store writes within a batch
#[derive(Clone)]
pub struct WriteLimiter {
    semaphore: Arc<Semaphore>,
}

impl Default for WriteLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CONCURRENT)
    }
}

impl WriteLimiter {
    /// Create a limiter with the given concurrency, at least one
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    /// Wait for a write slot. `None` only if the limiter was closed.
    pub async fn acquire(&self) -> Option<WriteGuard> {
        let permit = self.semaphore.clone().acquire_owned().await.ok()?;
        Some(WriteGuard { _permit: permit })
    }

    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }
}

/// Guard that holds a write slot
pub struct WriteGuard {
    _permit: OwnedSemaphorePermit,
}
