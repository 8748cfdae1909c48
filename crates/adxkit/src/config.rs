//! Configuration for the execution helper

use crate::error::{Error, Result};
use crate::validation::{validate_base_wait_time, validate_retries};
use std::time::Duration;

/// Default retry budget.
pub const DEFAULT_RETRIES: u32 = 2;

/// Default base wait time, in seconds.
pub const DEFAULT_BASE_WAIT_TIME: u64 = 2;

/// Default identity provider host for application-key authentication.
pub const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";

/// Default timeout for a single HTTP request (the engine's own default).
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(240);

/// Default application name reported to the engine.
pub const DEFAULT_APP_NAME: &str = "adxkit";

/// Configuration for [`ExecutionHelper`](crate::ExecutionHelper) and the
/// bundled HTTP collaborator.
#[derive(Debug, Clone)]
pub struct HelperConfig {
    /// Retries after the initial attempt, `0..=5`
    pub retries: u32,

    /// Base of the `base ^ attempt` backoff, in seconds
    pub base_wait_time: u64,

    /// Identity provider host used to acquire tokens
    pub authority_host: String,

    /// Timeout for a single HTTP request
    pub request_timeout: Duration,

    /// Application name reported with every request
    pub app_name: String,
}

impl Default for HelperConfig {
    fn default() -> Self {
        Self {
            retries: DEFAULT_RETRIES,
            base_wait_time: DEFAULT_BASE_WAIT_TIME,
            authority_host: DEFAULT_AUTHORITY_HOST.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            app_name: DEFAULT_APP_NAME.to_string(),
        }
    }
}

impl HelperConfig {
    /// Create a builder.
    pub fn builder() -> HelperConfigBuilder {
        HelperConfigBuilder::default()
    }

    /// Check bounded settings.
    pub fn validate(&self) -> Result<()> {
        validate_retries(self.retries)?;
        if self.authority_host.is_empty() {
            return Err(Error::Config("authority_host must not be empty".to_string()));
        }
        Ok(())
    }

    /// Load configuration from environment variables.
    ///
    /// This will look for:
    /// - `ADX_RETRIES` for the retry budget
    /// - `ADX_BASE_WAIT_TIME` for the backoff base (seconds)
    /// - `ADX_AUTHORITY_HOST` for the identity provider
    /// - `ADX_TIMEOUT` for the per-request timeout (seconds)
    /// - `ADX_APP_NAME` for the reported application name
    ///
    /// A `.env` file in the working directory is loaded first, if present.
    /// Unset variables keep their defaults; unparseable ones are an error.
    #[cfg(feature = "env")]
    pub fn from_env() -> Result<Self> {
        use std::env;

        let _ = dotenvy::dotenv();
        let mut config = Self::default();

        if let Ok(retries) = env::var("ADX_RETRIES") {
            config.retries = validate_retries(parse_var("ADX_RETRIES", &retries)?)?;
        }

        if let Ok(wait) = env::var("ADX_BASE_WAIT_TIME") {
            config.base_wait_time = validate_base_wait_time(parse_var("ADX_BASE_WAIT_TIME", &wait)?)?;
        }

        if let Ok(host) = env::var("ADX_AUTHORITY_HOST") {
            config.authority_host = host;
        }

        if let Ok(timeout) = env::var("ADX_TIMEOUT") {
            config.request_timeout = Duration::from_secs(parse_var("ADX_TIMEOUT", &timeout)?);
        }

        if let Ok(app_name) = env::var("ADX_APP_NAME") {
            config.app_name = app_name;
        }

        config.validate()?;
        Ok(config)
    }
}

#[cfg(feature = "env")]
fn parse_var<T>(name: &str, value: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| Error::Config(format!("{}={:?}: {}", name, value, e)))
}

/// Builder for creating [`HelperConfig`] with a fluent API.
#[derive(Debug, Default)]
pub struct HelperConfigBuilder {
    config: HelperConfig,
}

impl HelperConfigBuilder {
    /// Set the retry budget.
    pub fn retries(mut self, retries: u32) -> Self {
        self.config.retries = retries;
        self
    }

    /// Set the backoff base in seconds.
    pub fn base_wait_time(mut self, seconds: u64) -> Self {
        self.config.base_wait_time = seconds;
        self
    }

    /// Set the identity provider host.
    pub fn authority_host(mut self, host: impl Into<String>) -> Self {
        self.config.authority_host = host.into();
        self
    }

    /// Set the per-request timeout.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    /// Set the reported application name.
    pub fn app_name(mut self, app_name: impl Into<String>) -> Self {
        self.config.app_name = app_name.into();
        self
    }

    /// Validate and build the configuration.
    pub fn build(self) -> Result<HelperConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
