//! Timer seam for the retry loop.

use async_trait::async_trait;
use std::time::Duration;

/// Waits out a backoff delay.
///
/// The executor never calls `tokio::time::sleep` directly; swapping the
/// sleeper lets tests record the schedule instead of waiting for it.
#[async_trait]
pub trait Sleeper: Send + Sync {
    /// Sleep for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// Sleeps on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
