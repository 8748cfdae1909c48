//! Error types for adxkit
//!
//! Two layers:
//! - [`Error`] is what callers of [`ExecutionHelper`](crate::ExecutionHelper) see.
//!   Configuration and validation problems are reported before any network
//!   activity; execution failures carry the collaborator's final error.
//! - [`ClientError`] is what a collaborator returns from a single connection
//!   or attempt.

use adxkit_core::retry::RetryError;
use std::fmt;
use thiserror::Error;

/// Result type alias for helper operations.
pub type Result<T> = std::result::Result<T, Error>;

/// A required request field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    /// Cluster URL
    Cluster,
    /// Database name
    Database,
    /// Command or query text
    Statement,
    /// Application (client) ID
    AppId,
    /// Application secret
    AppSecret,
    /// Application tenant
    AppTenant,
}

impl Field {
    /// All required fields, in validation order.
    pub const ALL: [Field; 6] = [
        Field::Cluster,
        Field::Database,
        Field::Statement,
        Field::AppId,
        Field::AppSecret,
        Field::AppTenant,
    ];

    /// Field name as used in error messages.
    pub const fn as_str(self) -> &'static str {
        match self {
            Field::Cluster => "cluster",
            Field::Database => "database",
            Field::Statement => "statement",
            Field::AppId => "app_id",
            Field::AppSecret => "app_secret",
            Field::AppTenant => "app_tenant",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Main error type for adxkit.
#[derive(Debug, Error)]
pub enum Error {
    /// A bounded setting was outside its accepted closed interval.
    #[error("{name} out of range: {value} (accepted {min}..={max})")]
    OutOfRange {
        /// Setting name
        name: &'static str,
        /// Rejected value
        value: i64,
        /// Inclusive lower bound
        min: i64,
        /// Inclusive upper bound
        max: i64,
    },

    /// Configuration could not be loaded.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// A required value was not supplied.
    #[error("Required value missing: {0}")]
    MissingValue(Field),

    /// A required value was supplied but empty.
    #[error("Required value invalid: {0} must not be empty")]
    InvalidValue(Field),

    /// The collaborator could not open a connection.
    #[error("Failed to open connection: {0}")]
    Connection(#[source] ClientError),

    /// Every attempt failed; `source` is the error of the last one.
    #[error("Execution failed after {attempts} attempt(s): {source}")]
    Execution {
        /// Attempts made, including the initial one
        attempts: u32,
        /// Final collaborator error, unchanged
        #[source]
        source: ClientError,
    },

    /// The cancellation token fired before the call could finish.
    #[error("Execution cancelled after {attempts} attempt(s)")]
    Cancelled {
        /// Attempts made before cancellation was observed
        attempts: u32,
        /// Error of the most recent attempt, if any attempt ran
        last_error: Option<ClientError>,
    },
}

impl Error {
    /// Retries or wait time outside accepted bounds, or unreadable configuration.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::OutOfRange { .. } | Error::Config(_))
    }

    /// A required request field was missing or empty.
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::MissingValue(_) | Error::InvalidValue(_))
    }

    /// The offending field for validation errors.
    pub fn field(&self) -> Option<Field> {
        match self {
            Error::MissingValue(field) | Error::InvalidValue(field) => Some(*field),
            _ => None,
        }
    }

    /// The collaborator error behind this failure, if any.
    pub fn client_error(&self) -> Option<&ClientError> {
        match self {
            Error::Connection(source) | Error::Execution { source, .. } => Some(source),
            Error::Cancelled { last_error, .. } => last_error.as_ref(),
            _ => None,
        }
    }

    /// Attempts that reached the collaborator, for execution outcomes.
    pub fn attempts(&self) -> Option<u32> {
        match self {
            Error::Execution { attempts, .. } | Error::Cancelled { attempts, .. } => {
                Some(*attempts)
            }
            _ => None,
        }
    }
}

impl From<RetryError<ClientError>> for Error {
    fn from(err: RetryError<ClientError>) -> Self {
        match err {
            RetryError::Exhausted { attempts, source } | RetryError::Rejected { attempts, source } => {
                Error::Execution { attempts, source }
            }
            RetryError::Cancelled {
                attempts,
                last_error,
            } => Error::Cancelled {
                attempts,
                last_error,
            },
        }
    }
}

/// Errors raised by a collaborator while connecting or executing a statement.
#[derive(Debug, Clone, Error)]
pub enum ClientError {
    /// The identity provider refused the application credentials.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// The cluster URL could not be used as an endpoint.
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// Network, TLS or timeout failure.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The engine rejected the request.
    #[error("Service error (status {status}): {message}")]
    Service {
        /// HTTP status code
        status: u16,
        /// Engine error code, if reported
        code: Option<String>,
        /// Error message
        message: String,
    },

    /// The engine answered with something that is not JSON.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Any other collaborator failure.
    #[error("{0}")]
    Other(String),
}

impl ClientError {
    /// Build a service error from a non-success response body.
    ///
    /// Understands the engine's `{"error": {"code", "message", "@message"}}`
    /// envelope and falls back to the raw body.
    pub fn from_response(status: u16, body: &str) -> Self {
        match serde_json::from_str::<EngineErrorResponse>(body) {
            Ok(envelope) => ClientError::Service {
                status,
                code: envelope.error.code,
                message: envelope
                    .error
                    .detailed_message
                    .or(envelope.error.message)
                    .unwrap_or_else(|| body.to_string()),
            },
            Err(_) => ClientError::Service {
                status,
                code: None,
                message: if body.is_empty() {
                    format!("HTTP {}", status)
                } else {
                    body.to_string()
                },
            },
        }
    }

    /// Whether the failure looks transient.
    ///
    /// The helper retries every error by default; this classification is for
    /// callers who install a narrower retry predicate.
    pub fn is_transient(&self) -> bool {
        match self {
            ClientError::Transport(_) => true,
            ClientError::Service { status, .. } => {
                *status >= 500 || *status == 408 || *status == 429
            }
            _ => false,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ClientError::InvalidResponse(err.to_string())
        } else {
            ClientError::Transport(err.to_string())
        }
    }
}

#[derive(Debug, serde::Deserialize)]
struct EngineErrorResponse {
    error: EngineErrorDetails,
}

#[derive(Debug, serde::Deserialize)]
struct EngineErrorDetails {
    code: Option<String>,
    message: Option<String>,
    #[serde(rename = "@message")]
    detailed_message: Option<String>,
}
