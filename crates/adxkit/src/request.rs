//! Request-side types: what a caller asks for and what the collaborator receives.

use secrecy::SecretString;
use uuid::Uuid;

/// One command or query execution.
///
/// Every required field is an `Option` so that a field that was never supplied
/// (`None`) can be told apart from one supplied empty (`Some("")`). Both are
/// rejected by validation, with different errors.
///
/// # Examples
///
/// ```rust
/// use adxkit::ExecutionRequest;
///
/// let request = ExecutionRequest::new(
///     "https://help.kusto.windows.net/",
///     "acme",
///     ".show tables",
///     "00000000-0000-0000-0000-000000000001",
///     "app-secret",
///     "00000000-0000-0000-0000-000000000002",
/// )
/// .with_retries(3);
///
/// assert_eq!(request.retries, Some(3));
/// // The secret never shows up in debug output.
/// assert!(!format!("{:?}", request).contains("app-secret"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct ExecutionRequest {
    /// Cluster URL, e.g. `https://help.kusto.windows.net/`
    pub cluster: Option<String>,
    /// Database name
    pub database: Option<String>,
    /// Control command or query text
    pub statement: Option<String>,
    /// Application (client) ID
    pub app_id: Option<String>,
    /// Application secret
    pub app_secret: Option<SecretString>,
    /// Application tenant
    pub app_tenant: Option<String>,
    /// Per-call retry budget, overriding the helper's
    pub retries: Option<u32>,
}

impl ExecutionRequest {
    /// Create a request with every required field set.
    pub fn new(
        cluster: impl Into<String>,
        database: impl Into<String>,
        statement: impl Into<String>,
        app_id: impl Into<String>,
        app_secret: impl Into<String>,
        app_tenant: impl Into<String>,
    ) -> Self {
        Self {
            cluster: Some(cluster.into()),
            database: Some(database.into()),
            statement: Some(statement.into()),
            app_id: Some(app_id.into()),
            app_secret: Some(SecretString::new(app_secret.into().into_boxed_str())),
            app_tenant: Some(app_tenant.into()),
            retries: None,
        }
    }

    /// Set the cluster URL.
    pub fn with_cluster(mut self, cluster: impl Into<String>) -> Self {
        self.cluster = Some(cluster.into());
        self
    }

    /// Set the database name.
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Set the command or query text.
    pub fn with_statement(mut self, statement: impl Into<String>) -> Self {
        self.statement = Some(statement.into());
        self
    }

    /// Set the application credentials.
    pub fn with_credentials(
        mut self,
        app_id: impl Into<String>,
        app_secret: impl Into<String>,
        app_tenant: impl Into<String>,
    ) -> Self {
        self.app_id = Some(app_id.into());
        self.app_secret = Some(SecretString::new(app_secret.into().into_boxed_str()));
        self.app_tenant = Some(app_tenant.into());
        self
    }

    /// Override the helper's retry budget for this call.
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = Some(retries);
        self
    }
}

/// Application-key credentials handed to the collaborator.
#[derive(Debug, Clone)]
pub struct AppCredentials {
    /// Application (client) ID
    pub app_id: String,
    /// Application secret
    pub app_secret: SecretString,
    /// Tenant the application is registered in
    pub app_tenant: String,
}

/// Per-call request metadata.
///
/// The correlation id is generated once per helper call and reused by every
/// retry of that call, so the engine's logs group the attempts together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientRequestProperties {
    /// Correlation id sent with every attempt
    pub client_request_id: String,
    /// Application name reported to the engine
    pub application: Option<String>,
}

impl ClientRequestProperties {
    /// Fresh properties with a random correlation id.
    pub fn new() -> Self {
        Self {
            client_request_id: Uuid::new_v4().to_string(),
            application: None,
        }
    }

    /// Report `application` to the engine.
    pub fn with_application(mut self, application: impl Into<String>) -> Self {
        self.application = Some(application.into());
        self
    }
}

impl Default for ClientRequestProperties {
    fn default() -> Self {
        Self::new()
    }
}
