//! Structured logging for engine round trips
//!
//! Every statement the HTTP collaborator sends is logged through this layer.
//! Enable the `trace` feature for a ready-made subscriber.

use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Metadata for one statement sent to the engine
#[derive(Debug, Clone)]
pub struct StatementMetadata {
    /// Endpoint path, e.g. `v1/rest/mgmt`
    pub path: String,
    /// Target database
    pub database: String,
    /// Correlation id for the call
    pub client_request_id: String,
}

impl StatementMetadata {
    /// Create new statement metadata
    pub fn new(
        path: impl Into<String>,
        database: impl Into<String>,
        client_request_id: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            database: database.into(),
            client_request_id: client_request_id.into(),
        }
    }

    /// Log statement being sent. Statement text is not logged.
    pub fn log_request(&self) {
        debug!(
            path = %self.path,
            database = %self.database,
            client_request_id = %self.client_request_id,
            "Sending statement"
        );
    }

    /// Log a success response
    pub fn log_success(&self, status: u16, elapsed: Duration) {
        debug!(
            path = %self.path,
            client_request_id = %self.client_request_id,
            status,
            elapsed_ms = elapsed.as_millis() as u64,
            "Engine responded"
        );
    }

    /// Log a rejected statement
    pub fn log_error(&self, status: u16, elapsed: Duration, error: &str) {
        warn!(
            path = %self.path,
            client_request_id = %self.client_request_id,
            status,
            elapsed_ms = elapsed.as_millis() as u64,
            error = %error,
            "Engine rejected statement"
        );
    }
}

/// Timer for measuring request duration
#[derive(Debug)]
pub struct RequestTimer {
    start: Instant,
}

impl RequestTimer {
    /// Start a new timer
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get elapsed duration
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

/// Install a `fmt` subscriber filtered by `RUST_LOG` (default `adxkit=info`).
///
/// Returns `false` if a global subscriber was already installed.
#[cfg(feature = "trace")]
#[cfg_attr(docsrs, doc(cfg(feature = "trace")))]
pub fn init_tracing() -> bool {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("adxkit=info,adxkit_core=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .is_ok()
}
