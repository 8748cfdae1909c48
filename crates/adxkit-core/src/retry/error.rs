use thiserror::Error;

/// Why a [`RetryExecutor`](super::RetryExecutor) stopped without a result.
///
/// Every variant records how many attempts actually reached the operation.
#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// The retry budget ran out; `source` is the error of the final attempt.
    #[error("gave up after {attempts} attempt(s): {source}")]
    Exhausted {
        /// Attempts made, including the initial one
        attempts: u32,
        /// Error returned by the last attempt
        #[source]
        source: E,
    },

    /// The strategy's predicate refused to retry `source`.
    #[error("not retried after attempt {attempts}: {source}")]
    Rejected {
        /// Attempts made, including the initial one
        attempts: u32,
        /// Error the predicate rejected
        #[source]
        source: E,
    },

    /// Cancellation was observed before an attempt or during a wait.
    #[error("cancelled after {attempts} attempt(s)")]
    Cancelled {
        /// Attempts made before cancellation was observed
        attempts: u32,
        /// Error of the most recent attempt, if any attempt ran
        last_error: Option<E>,
    },
}

impl<E> RetryError<E> {
    /// Number of attempts that reached the operation.
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Exhausted { attempts, .. }
            | Self::Rejected { attempts, .. }
            | Self::Cancelled { attempts, .. } => *attempts,
        }
    }

    /// Whether the executor stopped because of cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// The most recent operation error, if any attempt ran.
    pub fn last_error(&self) -> Option<&E> {
        match self {
            Self::Exhausted { source, .. } | Self::Rejected { source, .. } => Some(source),
            Self::Cancelled { last_error, .. } => last_error.as_ref(),
        }
    }

    /// Consume the error, returning the most recent operation error.
    pub fn into_last_error(self) -> Option<E> {
        match self {
            Self::Exhausted { source, .. } | Self::Rejected { source, .. } => Some(source),
            Self::Cancelled { last_error, .. } => last_error,
        }
    }
}
