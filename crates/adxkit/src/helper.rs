//! The execution helper
//!
//! Validates a request, opens one connection through the collaborator, and
//! runs the statement under a `base_wait_time ^ attempt` backoff until it
//! succeeds, the retry budget is spent, or the caller cancels.

use crate::client::{AdminClient, ConnectionFactory, QueryClient, TabularResult};
use crate::config::{DEFAULT_BASE_WAIT_TIME, DEFAULT_RETRIES, HelperConfig};
use crate::error::{Error, Result};
use crate::http::HttpConnectionFactory;
use crate::request::{ClientRequestProperties, ExecutionRequest};
use crate::validation::{validate_base_wait_time, validate_request, validate_retries};
use adxkit_core::retry::{
    ExponentialBackoff, RetryExecutor, RetryPredicate, Sleeper, TokioSleeper,
};
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Runs control commands and queries against a cluster with retries.
///
/// # Examples
///
/// ```rust,no_run
/// use adxkit::{ExecutionHelper, ExecutionRequest};
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> adxkit::Result<()> {
/// let mut helper = ExecutionHelper::new(3)?;
/// helper.set_base_wait_time(1)?;
///
/// let request = ExecutionRequest::new(
///     "https://help.kusto.windows.net/",
///     "Samples",
///     "StormEvents | take 10",
///     "app-id",
///     "app-secret",
///     "tenant-id",
/// );
///
/// let result = helper
///     .execute_query(&request, &CancellationToken::new())
///     .await?;
/// # Ok(())
/// # }
/// ```
pub struct ExecutionHelper<F = HttpConnectionFactory> {
    factory: F,
    retries: u32,
    base_wait_time: u64,
    app_name: Option<String>,
    predicate: Option<RetryPredicate>,
    sleeper: Arc<dyn Sleeper>,
}

impl ExecutionHelper<HttpConnectionFactory> {
    /// Create a helper backed by the HTTP collaborator.
    ///
    /// # Errors
    ///
    /// [`Error::OutOfRange`] if `retries` is outside `0..=5`.
    pub fn new(retries: u32) -> Result<Self> {
        let config = HelperConfig {
            retries,
            ..HelperConfig::default()
        };
        Self::from_config(config)
    }

    /// Create a helper from a full configuration.
    pub fn from_config(config: HelperConfig) -> Result<Self> {
        config.validate()?;
        let factory = HttpConnectionFactory::from_config(&config)?;
        Ok(Self::with_factory(factory, config.retries)?
            .with_base_wait_time(config.base_wait_time)
            .with_app_name(config.app_name))
    }

    /// Create a helper from `ADX_*` environment variables.
    #[cfg(feature = "env")]
    pub fn from_env() -> Result<Self> {
        Self::from_config(HelperConfig::from_env()?)
    }
}

impl<F> ExecutionHelper<F>
where
    F: ConnectionFactory,
{
    /// Create a helper around any collaborator.
    ///
    /// # Errors
    ///
    /// [`Error::OutOfRange`] if `retries` is outside `0..=5`.
    pub fn with_factory(factory: F, retries: u32) -> Result<Self> {
        Ok(Self {
            factory,
            retries: validate_retries(retries)?,
            base_wait_time: DEFAULT_BASE_WAIT_TIME,
            app_name: None,
            predicate: None,
            sleeper: Arc::new(TokioSleeper),
        })
    }

    /// Retry budget used when a request does not carry its own.
    pub fn retries(&self) -> u32 {
        self.retries
    }

    /// Base of the backoff schedule, in seconds.
    pub fn base_wait_time(&self) -> u64 {
        self.base_wait_time
    }

    /// Change the backoff base.
    ///
    /// # Errors
    ///
    /// [`Error::OutOfRange`] if `seconds` is negative; the previous value is kept.
    pub fn set_base_wait_time(&mut self, seconds: i64) -> Result<()> {
        self.base_wait_time = validate_base_wait_time(seconds)?;
        Ok(())
    }

    /// Builder-style variant of [`set_base_wait_time`](Self::set_base_wait_time)
    /// for values that cannot be negative.
    pub fn with_base_wait_time(mut self, seconds: u64) -> Self {
        self.base_wait_time = seconds;
        self
    }

    /// Report `app_name` to the engine with every request.
    pub fn with_app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = Some(app_name.into());
        self
    }

    /// Only retry failures for which `predicate` returns `true`.
    ///
    /// Without a predicate every collaborator error is retried.
    pub fn with_retry_predicate<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&(dyn StdError + 'static), u32) -> bool + Send + Sync + 'static,
    {
        self.predicate = Some(Arc::new(predicate));
        self
    }

    /// Replace the timer used between attempts.
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// The collaborator this helper delegates to.
    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// Execute a control command.
    ///
    /// Validation happens before any connection is opened. The command is
    /// retried on any collaborator error up to the request's (or the helper's)
    /// retry budget, waiting `base_wait_time ^ n` seconds before retry `n`.
    ///
    /// # Errors
    ///
    /// - Validation and configuration errors, before any network activity
    /// - [`Error::Connection`] if the connection cannot be opened
    /// - [`Error::Execution`] with the last collaborator error once retries run out
    /// - [`Error::Cancelled`] if `cancellation` fires between attempts
    #[tracing::instrument(skip_all, fields(operation = "command"))]
    pub async fn execute_command(
        &self,
        request: &ExecutionRequest,
        cancellation: &CancellationToken,
    ) -> Result<Option<TabularResult>> {
        let validated = validate_request(request)?;
        let retries = validated.retries.unwrap_or(self.retries);

        debug!(cluster = validated.cluster, database = validated.database, "Opening admin connection");
        let client = self
            .factory
            .create_admin_connection(validated.cluster, validated.database, &validated.credentials())
            .await
            .map_err(Error::Connection)?;

        let properties = self.request_properties();
        let policy = self.retry_policy(retries);
        let result = self
            .executor(&policy, cancellation)
            .run(|| client.execute_control_command(validated.database, validated.statement, &properties))
            .await?;

        info!(
            client_request_id = %properties.client_request_id,
            has_result = result.is_some(),
            "Control command completed"
        );
        Ok(result)
    }

    /// Execute a query.
    ///
    /// Same contract as [`execute_command`](Self::execute_command), using the
    /// collaborator's query capability.
    #[tracing::instrument(skip_all, fields(operation = "query"))]
    pub async fn execute_query(
        &self,
        request: &ExecutionRequest,
        cancellation: &CancellationToken,
    ) -> Result<Option<TabularResult>> {
        let validated = validate_request(request)?;
        let retries = validated.retries.unwrap_or(self.retries);

        debug!(cluster = validated.cluster, database = validated.database, "Opening query connection");
        let client = self
            .factory
            .create_query_connection(validated.cluster, validated.database, &validated.credentials())
            .await
            .map_err(Error::Connection)?;

        let properties = self.request_properties();
        let policy = self.retry_policy(retries);
        let result = self
            .executor(&policy, cancellation)
            .run(|| client.execute_query(validated.database, validated.statement, &properties))
            .await?;

        info!(
            client_request_id = %properties.client_request_id,
            has_result = result.is_some(),
            "Query completed"
        );
        Ok(result)
    }

    fn request_properties(&self) -> ClientRequestProperties {
        let properties = ClientRequestProperties::new();
        match &self.app_name {
            Some(app_name) => properties.with_application(app_name.clone()),
            None => properties,
        }
    }

    fn retry_policy(&self, retries: u32) -> ExponentialBackoff {
        ExponentialBackoff::builder()
            .power_of(self.base_wait_time)
            .max_retries(retries)
            .predicate(self.predicate.clone())
            .build()
    }

    fn executor<'a>(
        &self,
        policy: &'a ExponentialBackoff,
        cancellation: &CancellationToken,
    ) -> RetryExecutor<'a, ExponentialBackoff> {
        RetryExecutor::new(policy)
            .with_sleeper(Arc::clone(&self.sleeper))
            .with_cancellation(cancellation.clone())
    }
}

impl<F> Default for ExecutionHelper<F>
where
    F: ConnectionFactory + Default,
{
    /// A helper with the default retry budget and base wait time.
    fn default() -> Self {
        Self {
            factory: F::default(),
            retries: DEFAULT_RETRIES,
            base_wait_time: DEFAULT_BASE_WAIT_TIME,
            app_name: None,
            predicate: None,
            sleeper: Arc::new(TokioSleeper),
        }
    }
}

impl<F> fmt::Debug for ExecutionHelper<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionHelper")
            .field("retries", &self.retries)
            .field("base_wait_time", &self.base_wait_time)
            .field("app_name", &self.app_name)
            .field("has_predicate", &self.predicate.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ClientError, Field};
    use crate::testing::{CallKind, ScriptedFactory};
    use adxkit_core::retry::testing::RecordingSleeper;
    use serde_json::json;
    use std::time::Duration;

    const CLUSTER: &str = "https://help.kusto.windows.net/";
    const DATABASE: &str = "acme";
    const COMMAND: &str = ".show tables";
    const QUERY: &str = "AcmeThings | take 10";

    fn request(statement: &str) -> ExecutionRequest {
        ExecutionRequest::new(CLUSTER, DATABASE, statement, "app-id", "app-secret", "app-tenant")
    }

    fn helper(
        factory: ScriptedFactory,
        retries: u32,
    ) -> (ExecutionHelper<ScriptedFactory>, Arc<RecordingSleeper>) {
        let sleeper = Arc::new(RecordingSleeper::new());
        let helper = ExecutionHelper::with_factory(factory, retries)
            .unwrap()
            .with_sleeper(sleeper.clone());
        (helper, sleeper)
    }

    #[test]
    fn test_retries_out_of_range_rejected() {
        let err = ExecutionHelper::with_factory(ScriptedFactory::new(), 6).unwrap_err();
        assert!(err.is_configuration());

        let err = ExecutionHelper::new(u32::MAX).unwrap_err();
        assert!(matches!(err, Error::OutOfRange { name: "retries", .. }));
    }

    #[test]
    fn test_retry_bounds_inclusive() {
        assert!(ExecutionHelper::with_factory(ScriptedFactory::new(), 0).is_ok());
        assert!(ExecutionHelper::with_factory(ScriptedFactory::new(), 5).is_ok());
    }

    #[test]
    fn test_negative_base_wait_time_keeps_previous_value() {
        let mut helper = ExecutionHelper::with_factory(ScriptedFactory::new(), 2).unwrap();
        helper.set_base_wait_time(7).unwrap();

        let err = helper.set_base_wait_time(-1).unwrap_err();

        assert!(matches!(err, Error::OutOfRange { name: "base_wait_time", value: -1, .. }));
        assert_eq!(helper.base_wait_time(), 7);
    }

    #[test]
    fn test_defaults() {
        let helper = ExecutionHelper::with_factory(ScriptedFactory::new(), DEFAULT_RETRIES).unwrap();

        assert_eq!(helper.retries(), 2);
        assert_eq!(helper.base_wait_time(), 2);

        let helper = ExecutionHelper::<ScriptedFactory>::default();
        assert_eq!(helper.retries(), DEFAULT_RETRIES);
        assert_eq!(helper.base_wait_time(), DEFAULT_BASE_WAIT_TIME);
    }

    #[tokio::test]
    async fn test_validation_happens_before_connection() {
        let factory = ScriptedFactory::new();
        let (helper, _) = helper(factory.clone(), 2);
        let mut bad = request(COMMAND);
        bad.app_tenant = None;

        let err = helper
            .execute_command(&bad, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::MissingValue(Field::AppTenant)));
        assert_eq!(factory.connections_opened(), 0);
        assert_eq!(factory.attempts(), 0);
    }

    #[tokio::test]
    async fn test_fails_twice_then_succeeds() {
        let factory = ScriptedFactory::new();
        factory.push_err(ClientError::Transport("connection reset".into()));
        factory.push_err(ClientError::Transport("connection reset".into()));
        factory.push_ok(Some(TabularResult::new(json!({"Tables": []}))));

        let (mut helper, sleeper) = helper(factory.clone(), 2);
        helper.set_base_wait_time(2).unwrap();

        let result = helper
            .execute_command(&request(COMMAND), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(result.unwrap().payload(), &json!({"Tables": []}));
        assert_eq!(factory.attempts(), 3);
        assert_eq!(
            sleeper.delays(),
            vec![Duration::from_secs(1), Duration::from_secs(2)]
        );
    }

    #[tokio::test]
    async fn test_exhausted_retries_surface_last_error() {
        let factory = ScriptedFactory::new();
        factory.push_err(ClientError::Transport("first".into()));
        factory.push_err(ClientError::Transport("second".into()));
        factory.push_err(ClientError::Other("last".into()));

        let (helper, sleeper) = helper(factory.clone(), 2);

        let err = helper
            .execute_query(&request(QUERY), &CancellationToken::new())
            .await
            .unwrap_err();

        match err {
            Error::Execution { attempts, source } => {
                assert_eq!(attempts, 3);
                assert!(matches!(source, ClientError::Other(msg) if msg == "last"));
            }
            other => panic!("expected Execution, got {:?}", other),
        }
        assert_eq!(factory.attempts(), 3);
        assert_eq!(sleeper.delays().len(), 2);
    }

    #[tokio::test]
    async fn test_per_call_retries_override() {
        let factory = ScriptedFactory::always_failing("down");
        let (helper, _) = helper(factory.clone(), 1);

        let err = helper
            .execute_query(&request(QUERY).with_retries(4), &CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(err.attempts(), Some(5));
        assert_eq!(factory.attempts(), 5);
    }

    #[tokio::test]
    async fn test_per_call_retries_out_of_range() {
        let factory = ScriptedFactory::new();
        let (helper, _) = helper(factory.clone(), 2);

        let err = helper
            .execute_command(&request(COMMAND).with_retries(6), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(err.is_configuration());
        assert_eq!(factory.connections_opened(), 0);
    }

    #[tokio::test]
    async fn test_predicate_narrows_retries() {
        let factory = ScriptedFactory::new();
        factory.push_err(ClientError::Authentication("bad secret".into()));

        let (helper, _) = helper(factory.clone(), 5);
        let helper = helper.with_retry_predicate(|err, _| {
            err.downcast_ref::<ClientError>()
                .is_some_and(ClientError::is_transient)
        });

        let err = helper
            .execute_command(&request(COMMAND), &CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(err.attempts(), Some(1));
        assert!(matches!(err.client_error(), Some(ClientError::Authentication(_))));
    }

    #[tokio::test]
    async fn test_connection_failure_not_retried() {
        let factory = ScriptedFactory::new();
        factory.fail_connections(ClientError::Authentication("AADSTS7000215".into()));
        let (helper, _) = helper(factory.clone(), 5);

        let err = helper
            .execute_query(&request(QUERY), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Connection(ClientError::Authentication(_))));
        assert_eq!(factory.attempts(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_token_skips_attempts() {
        let factory = ScriptedFactory::new();
        let (helper, _) = helper(factory.clone(), 2);
        let token = CancellationToken::new();
        token.cancel();

        let err = helper
            .execute_query(&request(QUERY), &token)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Cancelled { attempts: 0, last_error: None }));
        assert_eq!(factory.attempts(), 0);
        // The connection was still opened and released.
        assert_eq!(factory.connections_released(), factory.connections_opened());
    }

    #[tokio::test]
    async fn test_same_request_id_across_retries() {
        let factory = ScriptedFactory::new();
        factory.push_err(ClientError::Transport("blip".into()));
        factory.push_ok(None);
        let (helper, _) = helper(factory.clone(), 2);

        let result = helper
            .with_app_name("nightly-job")
            .execute_command(&request(COMMAND), &CancellationToken::new())
            .await
            .unwrap();

        assert!(result.is_none());
        let calls = factory.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].client_request_id, calls[1].client_request_id);
        assert_eq!(calls[0].kind, CallKind::Command);
        assert_eq!(calls[0].statement, COMMAND);
        assert_eq!(calls[0].application.as_deref(), Some("nightly-job"));
    }

    #[tokio::test]
    async fn test_separate_calls_get_fresh_request_ids() {
        let factory = ScriptedFactory::new();
        let (helper, _) = helper(factory.clone(), 0);

        helper
            .execute_query(&request(QUERY), &CancellationToken::new())
            .await
            .unwrap();
        helper
            .execute_query(&request(QUERY), &CancellationToken::new())
            .await
            .unwrap();

        let calls = factory.calls();
        assert_ne!(calls[0].client_request_id, calls[1].client_request_id);
    }

    #[tokio::test]
    async fn test_connection_released_on_failure() {
        let factory = ScriptedFactory::always_failing("down");
        let (helper, _) = helper(factory.clone(), 1);

        let _ = helper
            .execute_command(&request(COMMAND), &CancellationToken::new())
            .await;

        assert_eq!(factory.connections_opened(), 1);
        assert_eq!(factory.connections_released(), 1);
    }
}
