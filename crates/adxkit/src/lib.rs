//! # adxkit
//!
//! Retrying execution helper for Azure Data Explorer (Kusto) clusters:
//! - Control commands and queries with application-key authentication
//! - Up-front validation of every request field, before any network activity
//! - `base_wait_time ^ attempt` backoff with a bounded retry budget
//! - Cooperative cancellation between attempts
//! - A pluggable collaborator seam for tests and alternative transports
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use adxkit::{CancellationToken, ExecutionHelper, ExecutionRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let helper = ExecutionHelper::new(2)?;
//!
//!     let request = ExecutionRequest::new(
//!         "https://help.kusto.windows.net/",
//!         "Samples",
//!         ".show tables",
//!         "app-id",
//!         "app-secret",
//!         "tenant-id",
//!     );
//!
//!     if let Some(result) = helper.execute_command(&request, &CancellationToken::new()).await? {
//!         println!("{}", result.payload());
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// Re-export commonly used types
pub use client::{AdminClient, ConnectionFactory, QueryClient, TabularResult};
pub use config::HelperConfig;
pub use error::{ClientError, Error, Field, Result};
pub use helper::ExecutionHelper;
pub use http::HttpConnectionFactory;
pub use request::{AppCredentials, ClientRequestProperties, ExecutionRequest};

// Module declarations
pub mod client;
pub mod config;
pub mod error;
pub mod helper;
pub mod http;
pub mod observability;
pub mod request;
pub mod testing;
pub mod validation;

// Re-export key dependencies for convenience
pub use adxkit_core;
pub use async_trait::async_trait;
pub use tokio_util::sync::CancellationToken;

/// Prelude module for common imports
///
/// # Examples
///
/// ```rust
/// use adxkit::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        CancellationToken, ClientError, Error, ExecutionHelper, ExecutionRequest, HelperConfig,
        Result, TabularResult,
    };
}

/// Crate version, automatically updated from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert_eq!(VERSION, env!("CARGO_PKG_VERSION"));
    }
}
