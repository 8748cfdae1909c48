//! Exponential backoff with optional jitter.

use super::strategy::{BackoffStrategy, RetryPredicate};
use std::error::Error;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Exponential backoff strategy with configurable jitter and retry predicate.
///
/// Delays between retries increase exponentially: `initial_delay * multiplier^attempt`,
/// capped at `max_delay`.
///
/// # Mathematical Formula
///
/// For attempt `n` (0-indexed after first failure):
/// ```text
/// base_delay = initial_delay * (multiplier ^ n)
/// capped_delay = min(base_delay, max_delay)
/// jitter_range = capped_delay * jitter
/// final_delay = capped_delay + random(-jitter_range/2, +jitter_range/2)
/// ```
///
/// A power schedule (`base ^ n` seconds) is the special case
/// `initial_delay = 1s, multiplier = base, jitter = 0`; see
/// [`ExponentialBackoffBuilder::power_of`]. Delays that do not fit in a
/// [`Duration`] saturate at `max_delay`.
///
/// # Examples
///
/// ```rust
/// use adxkit_core::retry::{BackoffStrategy, ExponentialBackoff};
/// use std::time::Duration;
///
/// // Default configuration (max_retries=3, initial=100ms, max=60s, multiplier=2.0, jitter=0.1)
/// let backoff = ExponentialBackoff::default();
///
/// // 1s, 3s, 9s, 27s
/// let backoff = ExponentialBackoff::builder()
///     .power_of(3)
///     .max_retries(4)
///     .build();
/// assert_eq!(backoff.next_delay(2), Some(Duration::from_secs(9)));
/// ```
#[derive(Clone)]
pub struct ExponentialBackoff {
    max_retries: u32,
    initial_delay: Duration,
    max_delay: Duration,
    multiplier: f64,
    jitter: f64,
    predicate: Option<RetryPredicate>,
}

impl ExponentialBackoff {
    /// Create a new builder for configuring exponential backoff.
    pub fn builder() -> ExponentialBackoffBuilder {
        ExponentialBackoffBuilder::default()
    }
}

impl fmt::Debug for ExponentialBackoff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExponentialBackoff")
            .field("max_retries", &self.max_retries)
            .field("initial_delay", &self.initial_delay)
            .field("max_delay", &self.max_delay)
            .field("multiplier", &self.multiplier)
            .field("jitter", &self.jitter)
            .field("has_predicate", &self.predicate.is_some())
            .finish()
    }
}

impl Default for ExponentialBackoff {
    /// Defaults:
    /// - `max_retries`: 3
    /// - `initial_delay`: 100ms
    /// - `max_delay`: 60s
    /// - `multiplier`: 2.0 (doubles each time)
    /// - `jitter`: 0.1 (10% randomization)
    /// - no predicate (every error is retried)
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(60),
            multiplier: 2.0,
            jitter: 0.1,
            predicate: None,
        }
    }
}

impl BackoffStrategy for ExponentialBackoff {
    fn should_retry(&self, error: &(dyn Error + 'static), attempt: u32) -> bool {
        match &self.predicate {
            Some(predicate) => predicate(error, attempt),
            None => true,
        }
    }

    fn next_delay(&self, attempt: u32) -> Option<Duration> {
        // attempt 0 is the delay before the first RETRY
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let base_delay = self.initial_delay.as_secs_f64() * self.multiplier.powi(exponent);

        let jittered = if self.jitter > 0.0 {
            let jitter_amount = base_delay * self.jitter * (rand::random::<f64>() - 0.5) * 2.0;
            base_delay + jitter_amount
        } else {
            base_delay
        };

        let capped = jittered.max(0.0).min(self.max_delay.as_secs_f64());
        Some(Duration::try_from_secs_f64(capped).unwrap_or(self.max_delay))
    }

    fn max_retries(&self) -> u32 {
        self.max_retries
    }
}

/// Builder for configuring `ExponentialBackoff`.
///
/// ```rust
/// use adxkit_core::retry::ExponentialBackoff;
/// use std::time::Duration;
///
/// let backoff = ExponentialBackoff::builder()
///     .max_retries(5)
///     .initial_delay(Duration::from_millis(100))
///     .max_delay(Duration::from_secs(30))
///     .multiplier(2.0)
///     .jitter(0.1)
///     .retry_if(|err, _attempt| !err.to_string().contains("unauthorized"))
///     .build();
/// ```
#[derive(Default)]
pub struct ExponentialBackoffBuilder {
    max_retries: Option<u32>,
    initial_delay: Option<Duration>,
    max_delay: Option<Duration>,
    multiplier: Option<f64>,
    jitter: Option<f64>,
    predicate: Option<RetryPredicate>,
}

impl ExponentialBackoffBuilder {
    /// Set the maximum number of retry attempts.
    ///
    /// Default: 3
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    /// Set the initial delay before the first retry.
    ///
    /// Default: 100ms
    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = Some(delay);
        self
    }

    /// Set the maximum delay between retries.
    ///
    /// Default: 60s
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = Some(delay);
        self
    }

    /// Set the exponential multiplier.
    ///
    /// Default: 2.0
    pub fn multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = Some(multiplier);
        self
    }

    /// Set the jitter factor (0.0 to 1.0).
    ///
    /// Default: 0.1
    pub fn jitter(mut self, jitter: f64) -> Self {
        self.jitter = Some(jitter.clamp(0.0, 1.0));
        self
    }

    /// Wait `base_secs ^ attempt` seconds before each retry.
    ///
    /// Sets `initial_delay = 1s`, `multiplier = base_secs`, no jitter and no
    /// cap. A base of 0 yields 1s before the first retry and no wait after.
    pub fn power_of(mut self, base_secs: u64) -> Self {
        self.initial_delay = Some(Duration::from_secs(1));
        self.multiplier = Some(base_secs as f64);
        self.max_delay = Some(Duration::MAX);
        self.jitter = Some(0.0);
        self
    }

    /// Only retry errors for which `predicate` returns `true`.
    ///
    /// Default: every error is retried.
    pub fn retry_if<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&(dyn Error + 'static), u32) -> bool + Send + Sync + 'static,
    {
        self.predicate = Some(Arc::new(predicate));
        self
    }

    /// Use an already shared predicate.
    pub fn predicate(mut self, predicate: Option<RetryPredicate>) -> Self {
        self.predicate = predicate;
        self
    }

    /// Build the `ExponentialBackoff` instance.
    ///
    /// Uses default values for any unset parameters.
    pub fn build(self) -> ExponentialBackoff {
        ExponentialBackoff {
            max_retries: self.max_retries.unwrap_or(3),
            initial_delay: self.initial_delay.unwrap_or(Duration::from_millis(100)),
            max_delay: self.max_delay.unwrap_or(Duration::from_secs(60)),
            multiplier: self.multiplier.unwrap_or(2.0),
            jitter: self.jitter.unwrap_or(0.1),
            predicate: self.predicate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn secs(values: &[u64]) -> Vec<Duration> {
        values.iter().copied().map(Duration::from_secs).collect()
    }

    fn schedule(backoff: &ExponentialBackoff) -> Vec<Duration> {
        (0..backoff.max_retries())
            .filter_map(|n| backoff.next_delay(n))
            .collect()
    }

    #[test]
    fn test_fractional_multiplier() {
        let backoff = ExponentialBackoff::builder()
            .initial_delay(Duration::from_millis(250))
            .multiplier(1.5)
            .jitter(0.0)
            .max_retries(3)
            .build();

        assert_eq!(
            schedule(&backoff),
            vec![
                Duration::from_millis(250),
                Duration::from_millis(375),
                Duration::from_micros(562_500),
            ]
        );
    }

    #[test]
    fn test_power_of_schedule() {
        let backoff = ExponentialBackoff::builder()
            .power_of(2)
            .max_retries(5)
            .build();

        assert_eq!(schedule(&backoff), secs(&[1, 2, 4, 8, 16]));
    }

    #[test]
    fn test_power_of_zero_base() {
        let backoff = ExponentialBackoff::builder()
            .power_of(0)
            .max_retries(4)
            .build();

        // 0^0 == 1
        assert_eq!(schedule(&backoff), secs(&[1, 0, 0, 0]));
    }

    #[test]
    fn test_power_of_one_base_is_constant() {
        let backoff = ExponentialBackoff::builder()
            .power_of(1)
            .max_retries(5)
            .build();

        assert_eq!(schedule(&backoff), secs(&[1; 5]));
    }

    #[test]
    fn test_huge_delay_saturates() {
        let backoff = ExponentialBackoff::builder().power_of(u64::MAX).build();

        assert_eq!(backoff.next_delay(4), Some(Duration::MAX));
        assert_eq!(backoff.next_delay(u32::MAX), Some(Duration::MAX));
    }

    #[test]
    fn test_explicit_cap_applies_to_power_schedule() {
        let backoff = ExponentialBackoff::builder()
            .power_of(10)
            .max_delay(Duration::from_secs(30))
            .max_retries(4)
            .build();

        assert_eq!(schedule(&backoff), secs(&[1, 10, 30, 30]));
    }

    #[test]
    fn test_jitter_stays_within_band() {
        let backoff = ExponentialBackoff::builder()
            .power_of(4)
            .jitter(0.25)
            .build();

        // 4s +/- 25%
        for _ in 0..50 {
            let delay = backoff.next_delay(1).unwrap();
            assert!(
                delay >= Duration::from_secs(3) && delay <= Duration::from_secs(5),
                "jittered delay {:?} outside [3s, 5s]",
                delay
            );
        }
    }

    #[test]
    fn test_unset_builder_matches_default() {
        let built = ExponentialBackoff::builder().build();
        let default = ExponentialBackoff::default();

        assert_eq!(built.max_retries(), default.max_retries());
        assert_eq!(format!("{:?}", built), format!("{:?}", default));
    }

    #[test]
    fn test_jitter_out_of_range_clamped() {
        assert_eq!(ExponentialBackoff::builder().jitter(7.5).build().jitter, 1.0);
        assert_eq!(ExponentialBackoff::builder().jitter(-1.0).build().jitter, 0.0);
    }

    #[test]
    fn test_default_predicate_retries_everything() {
        let backoff = ExponentialBackoff::default();
        let err = std::io::Error::other("anything");

        assert!(backoff.should_retry(&err, 0));
        assert!(backoff.should_retry(&err, 99));
    }

    #[test]
    fn test_custom_predicate_sees_attempt() {
        let backoff = ExponentialBackoff::builder()
            .retry_if(|_, attempt| attempt < 1)
            .build();
        let err = std::io::Error::other("transient");

        assert!(backoff.should_retry(&err, 0));
        assert!(!backoff.should_retry(&err, 1));
    }

    #[test]
    fn test_predicate_can_downcast() {
        let backoff = ExponentialBackoff::builder()
            .retry_if(|err, _| {
                err.downcast_ref::<std::io::Error>()
                    .is_some_and(|io| io.kind() == std::io::ErrorKind::TimedOut)
            })
            .build();

        let timeout = std::io::Error::from(std::io::ErrorKind::TimedOut);
        let denied = std::io::Error::from(std::io::ErrorKind::PermissionDenied);
        assert!(backoff.should_retry(&timeout, 0));
        assert!(!backoff.should_retry(&denied, 0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_execute_retries_until_success() {
        let backoff = ExponentialBackoff::builder()
            .power_of(2)
            .max_retries(3)
            .build();
        let calls = Arc::new(AtomicU32::new(0));

        let result = backoff
            .execute(|| {
                let calls = Arc::clone(&calls);
                async move {
                    match calls.fetch_add(1, Ordering::SeqCst) {
                        0 | 1 => Err(std::io::Error::other("throttled")),
                        _ => Ok("done"),
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_debug_hides_predicate_body() {
        let backoff = ExponentialBackoff::builder().retry_if(|_, _| true).build();
        let rendered = format!("{:?}", backoff);

        assert!(rendered.contains("has_predicate: true"));
    }

    proptest! {
        #[test]
        fn prop_power_schedule_matches_integer_pow(base in 0u64..=10, attempt in 0u32..=5) {
            let backoff = ExponentialBackoff::builder().power_of(base).build();
            let expected = Duration::from_secs(base.pow(attempt));
            prop_assert_eq!(backoff.next_delay(attempt).unwrap(), expected);
        }
    }
}
