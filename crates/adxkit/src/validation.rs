//! Input validation for execution requests
//!
//! Runs before any network activity. Fields are checked in a fixed order
//! (cluster, database, statement, app_id, app_secret, app_tenant, retries) and
//! the first failure is reported, so a request with several bad fields always
//! yields the same error.

use crate::error::{Error, Field, Result};
use crate::request::{AppCredentials, ExecutionRequest};
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

/// Smallest accepted retry budget.
pub const MIN_RETRIES: u32 = 0;

/// Largest accepted retry budget.
pub const MAX_RETRIES: u32 = 5;

/// A request whose required fields are known to be present and non-empty.
#[derive(Debug, Clone, Copy)]
pub struct ValidatedRequest<'a> {
    /// Cluster URL
    pub cluster: &'a str,
    /// Database name
    pub database: &'a str,
    /// Command or query text
    pub statement: &'a str,
    /// Application (client) ID
    pub app_id: &'a str,
    /// Application secret
    pub app_secret: &'a SecretString,
    /// Application tenant
    pub app_tenant: &'a str,
    /// Per-call retry budget, already bounds-checked
    pub retries: Option<u32>,
}

impl ValidatedRequest<'_> {
    /// Credentials for the collaborator.
    pub fn credentials(&self) -> AppCredentials {
        AppCredentials {
            app_id: self.app_id.to_string(),
            app_secret: self.app_secret.clone(),
            app_tenant: self.app_tenant.to_string(),
        }
    }
}

/// Validate an execution request.
///
/// # Errors
///
/// - [`Error::MissingValue`] for the first required field that is `None`
/// - [`Error::InvalidValue`] for the first required field that is empty
/// - [`Error::OutOfRange`] if a per-call retry budget exceeds [`MAX_RETRIES`]
///
/// # Examples
///
/// ```rust
/// use adxkit::{Error, ExecutionRequest, Field};
/// use adxkit::validation::validate_request;
///
/// let request = ExecutionRequest::new("https://c", "db", "", "id", "secret", "tenant");
/// assert!(matches!(
///     validate_request(&request),
///     Err(Error::InvalidValue(Field::Statement))
/// ));
/// ```
pub fn validate_request(request: &ExecutionRequest) -> Result<ValidatedRequest<'_>> {
    let cluster = require(request.cluster.as_deref(), Field::Cluster)?;
    let database = require(request.database.as_deref(), Field::Database)?;
    let statement = require(request.statement.as_deref(), Field::Statement)?;
    let app_id = require(request.app_id.as_deref(), Field::AppId)?;
    let app_secret = require_secret(request.app_secret.as_ref())?;
    let app_tenant = require(request.app_tenant.as_deref(), Field::AppTenant)?;
    let retries = request.retries.map(validate_retries).transpose()?;

    debug!(
        cluster,
        database,
        statement_len = statement.len(),
        retries,
        "Execution request validated"
    );

    Ok(ValidatedRequest {
        cluster,
        database,
        statement,
        app_id,
        app_secret,
        app_tenant,
        retries,
    })
}

/// Check that a retry budget lies in `MIN_RETRIES..=MAX_RETRIES`.
pub fn validate_retries(retries: u32) -> Result<u32> {
    if (MIN_RETRIES..=MAX_RETRIES).contains(&retries) {
        Ok(retries)
    } else {
        Err(Error::OutOfRange {
            name: "retries",
            value: i64::from(retries),
            min: i64::from(MIN_RETRIES),
            max: i64::from(MAX_RETRIES),
        })
    }
}

/// Check that a base wait time in seconds is not negative.
pub fn validate_base_wait_time(seconds: i64) -> Result<u64> {
    u64::try_from(seconds).map_err(|_| Error::OutOfRange {
        name: "base_wait_time",
        value: seconds,
        min: 0,
        max: i64::MAX,
    })
}

fn require(value: Option<&str>, field: Field) -> Result<&str> {
    match value {
        None => Err(Error::MissingValue(field)),
        Some("") => Err(Error::InvalidValue(field)),
        Some(value) => Ok(value),
    }
}

fn require_secret(value: Option<&SecretString>) -> Result<&SecretString> {
    match value {
        None => Err(Error::MissingValue(Field::AppSecret)),
        Some(secret) if secret.expose_secret().is_empty() => {
            Err(Error::InvalidValue(Field::AppSecret))
        }
        Some(secret) => Ok(secret),
    }
}
