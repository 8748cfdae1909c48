//! Test doubles for the retry loop.

use super::sleep::Sleeper;
use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;

/// A [`Sleeper`] that records every requested delay and returns immediately.
///
/// ```rust
/// use adxkit_core::retry::{ExponentialBackoff, RetryExecutor};
/// use adxkit_core::retry::testing::RecordingSleeper;
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// # async fn example() {
/// let sleeper = Arc::new(RecordingSleeper::new());
/// let backoff = ExponentialBackoff::builder().power_of(2).max_retries(2).build();
///
/// let result = RetryExecutor::new(&backoff)
///     .with_sleeper(sleeper.clone())
///     .run(|| async { Err::<(), _>(std::io::Error::other("down")) })
///     .await;
///
/// assert!(result.is_err());
/// assert_eq!(sleeper.delays(), vec![Duration::from_secs(1), Duration::from_secs(2)]);
/// # }
/// ```
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    delays: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays requested so far, in order.
    pub fn delays(&self) -> Vec<Duration> {
        self.delays
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Sum of all requested delays.
    pub fn total(&self) -> Duration {
        self.delays().iter().sum()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.delays
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(duration);
    }
}
