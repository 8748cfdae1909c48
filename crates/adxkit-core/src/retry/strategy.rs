//! The backoff strategy trait and the retry predicate seam.

use super::error::RetryError;
use super::executor::RetryExecutor;
use async_trait::async_trait;
use std::error::Error;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Decides whether a failure may be retried.
///
/// Receives the error and the 0-indexed attempt that produced it. Strategies
/// without a predicate treat every error as retryable.
pub type RetryPredicate = Arc<dyn Fn(&(dyn Error + 'static), u32) -> bool + Send + Sync>;

/// A strategy for retrying failed operations with backoff.
///
/// Implementations determine when to retry, how long to wait between attempts,
/// and when to give up. The retry loop itself lives in [`RetryExecutor`], so a
/// strategy only has to answer three questions.
///
/// # Examples
///
/// ```rust
/// use adxkit_core::retry::{BackoffStrategy, ExponentialBackoff};
/// use std::time::Duration;
/// use std::sync::atomic::{AtomicU32, Ordering};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let backoff = ExponentialBackoff::builder()
///     .max_retries(3)
///     .initial_delay(Duration::from_millis(100))
///     .build();
///
/// let attempts = Arc::new(AtomicU32::new(0));
/// let result = backoff.execute(|| {
///     let attempts = Arc::clone(&attempts);
///     async move {
///         let current = attempts.fetch_add(1, Ordering::SeqCst);
///         if current < 2 {
///             Err(std::io::Error::other("retry me"))
///         } else {
///             Ok(42)
///         }
///     }
/// }).await?;
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait BackoffStrategy: Send + Sync {
    /// Execute an operation with this strategy, sleeping on the tokio timer.
    ///
    /// Use [`RetryExecutor`] directly to inject a [`Sleeper`](super::Sleeper)
    /// or a cancellation token.
    ///
    /// # Returns
    /// - `Ok(T)`: The successful result
    /// - `Err(RetryError<E>)`: The final error and the number of attempts made
    async fn execute<F, Fut, T, E>(&self, operation: F) -> Result<T, RetryError<E>>
    where
        F: Fn() -> Fut + Send + Sync,
        Fut: Future<Output = Result<T, E>> + Send,
        T: Send,
        E: Error + Send + Sync + 'static,
    {
        RetryExecutor::new(self).run(operation).await
    }

    /// Determine if an error is retryable.
    ///
    /// Default implementation returns `true` for all errors.
    ///
    /// # Parameters
    /// - `error`: The error to evaluate
    /// - `attempt`: The attempt that failed (0-indexed)
    fn should_retry(&self, error: &(dyn Error + 'static), attempt: u32) -> bool {
        let _ = (error, attempt);
        true
    }

    /// Calculate the delay before the next retry attempt.
    ///
    /// Called after a failure and before sleeping: `next_delay(0)` is the wait
    /// between the initial attempt and the first retry.
    ///
    /// # Returns
    /// - `Some(Duration)`: Wait this long before the next retry
    /// - `None`: Retry immediately
    fn next_delay(&self, attempt: u32) -> Option<Duration>;

    /// Get the maximum number of retry attempts.
    ///
    /// If `max_retries() == 3`, the operation will be attempted up to 4 times
    /// total (1 initial + 3 retries).
    fn max_retries(&self) -> u32;
}
