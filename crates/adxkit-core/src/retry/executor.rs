//! The retry loop.

use super::error::RetryError;
use super::sleep::{Sleeper, TokioSleeper};
use super::strategy::BackoffStrategy;
use std::error::Error;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Runs an async operation under a [`BackoffStrategy`].
///
/// Attempts are strictly sequential. Cancellation is cooperative: the token is
/// checked before every attempt and raced against every backoff wait, but an
/// attempt that has already started always runs to completion.
///
/// # Examples
///
/// ```rust
/// use adxkit_core::retry::{ExponentialBackoff, RetryError, RetryExecutor};
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() {
/// let backoff = ExponentialBackoff::builder().power_of(2).max_retries(2).build();
/// let token = CancellationToken::new();
/// token.cancel();
///
/// let result = RetryExecutor::new(&backoff)
///     .with_cancellation(token)
///     .run(|| async { Ok::<_, std::io::Error>(1) })
///     .await;
///
/// assert!(matches!(result, Err(RetryError::Cancelled { attempts: 0, .. })));
/// # }
/// ```
pub struct RetryExecutor<'a, S: ?Sized> {
    strategy: &'a S,
    sleeper: Arc<dyn Sleeper>,
    cancellation: Option<CancellationToken>,
}

impl<'a, S> RetryExecutor<'a, S>
where
    S: BackoffStrategy + ?Sized,
{
    /// Create an executor that sleeps on the tokio timer and cannot be cancelled.
    pub fn new(strategy: &'a S) -> Self {
        Self {
            strategy,
            sleeper: Arc::new(TokioSleeper),
            cancellation: None,
        }
    }

    /// Replace the sleeper used between attempts.
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Observe `token` before each attempt and during each wait.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }

    /// Drive `operation` until it succeeds, the predicate rejects an error,
    /// the retry budget is spent, or cancellation is observed.
    pub async fn run<F, Fut, T, E>(self, mut operation: F) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Error + 'static,
    {
        let max_retries = self.strategy.max_retries();
        let mut attempt: u32 = 0;
        let mut last_error: Option<E> = None;

        loop {
            if self.is_cancelled() {
                return Err(RetryError::Cancelled {
                    attempts: attempt,
                    last_error,
                });
            }

            let err = match operation().await {
                Ok(value) => {
                    #[cfg(feature = "tracing")]
                    if attempt > 0 {
                        tracing::debug!(attempts = attempt + 1, "Operation succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) => err,
            };
            let attempts = attempt + 1;

            if !self.strategy.should_retry(&err, attempt) {
                #[cfg(feature = "tracing")]
                tracing::debug!(attempts, error = %err, "Error rejected by retry predicate");
                return Err(RetryError::Rejected {
                    attempts,
                    source: err,
                });
            }

            if attempt >= max_retries {
                #[cfg(feature = "tracing")]
                tracing::error!(attempts, error = %err, "Retry budget exhausted");
                return Err(RetryError::Exhausted {
                    attempts,
                    source: err,
                });
            }

            let delay = self.strategy.next_delay(attempt);

            #[cfg(feature = "tracing")]
            tracing::warn!(
                attempt = attempts,
                max_attempts = max_retries.saturating_add(1),
                delay_ms = delay.map(|d| d.as_millis() as u64),
                error = %err,
                "Attempt failed, retrying"
            );

            last_error = Some(err);

            if let Some(delay) = delay {
                match &self.cancellation {
                    Some(token) => {
                        tokio::select! {
                            biased;
                            _ = token.cancelled() => {
                                return Err(RetryError::Cancelled {
                                    attempts,
                                    last_error,
                                });
                            }
                            _ = self.sleeper.sleep(delay) => {}
                        }
                    }
                    None => self.sleeper.sleep(delay).await,
                }
            }

            attempt += 1;
        }
    }
}
