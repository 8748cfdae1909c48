#![deny(unsafe_code)]
#![warn(missing_docs)]

//! Core retry abstractions for adxkit.
//!
//! This crate holds the pieces of the execution helper that have nothing to do
//! with the analytical engine itself:
//!
//! - **Backoff strategies** via the [`BackoffStrategy`](retry::BackoffStrategy) trait
//!   - Exponential backoff with optional jitter
//!   - `base ^ attempt` power schedules
//!   - A single retry predicate, defaulting to "retry everything"
//! - **Injectable sleeping** via [`Sleeper`](retry::Sleeper), so schedules can be
//!   asserted without waiting in real time
//! - **Cancellation-aware execution** via [`RetryExecutor`](retry::RetryExecutor)
//!
//! # Examples
//!
//! ```rust
//! use adxkit_core::prelude::*;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let backoff = ExponentialBackoff::builder()
//!     .max_retries(3)
//!     .initial_delay(Duration::from_millis(100))
//!     .build();
//!
//! let result = backoff.execute(|| async {
//!     Ok::<_, std::io::Error>(42)
//! }).await?;
//! # Ok(())
//! # }
//! ```

pub mod retry;

/// Convenient re-exports of commonly used items.
///
/// ```rust
/// use adxkit_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::retry::{
        BackoffStrategy, ExponentialBackoff, ExponentialBackoffBuilder, RetryError,
        RetryExecutor, RetryPredicate, Sleeper, TokioSleeper,
    };
}
