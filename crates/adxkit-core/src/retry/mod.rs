//! Retry strategies and backoff implementations.
//!
//! # Key Types
//!
//! - [`BackoffStrategy`] - how many retries, how long to wait, which errors qualify
//! - [`ExponentialBackoff`] - `initial_delay * multiplier ^ attempt`, optionally jittered
//! - [`RetryExecutor`] - drives an operation under a strategy, a [`Sleeper`] and a
//!   cancellation token
//! - [`RetryError`] - why the executor stopped
//!
//! # Examples
//!
//! ```rust
//! use adxkit_core::retry::{ExponentialBackoff, RetryExecutor};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // 1s, 2s, 4s between attempts
//! let backoff = ExponentialBackoff::builder()
//!     .power_of(2)
//!     .max_retries(3)
//!     .build();
//!
//! let token = CancellationToken::new();
//! let value = RetryExecutor::new(&backoff)
//!     .with_cancellation(token)
//!     .run(|| async { Ok::<_, std::io::Error>(42) })
//!     .await?;
//! # Ok(())
//! # }
//! ```

mod error;
mod executor;
mod exponential;
mod sleep;
mod strategy;
pub mod testing;

pub use error::RetryError;
pub use executor::RetryExecutor;
pub use exponential::{ExponentialBackoff, ExponentialBackoffBuilder};
pub use sleep::{Sleeper, TokioSleeper};
pub use strategy::{BackoffStrategy, RetryPredicate};
