//! reqwest-backed collaborator

use super::auth::acquire_token;
use super::{APP_HEADER, CLIENT_REQUEST_ID_HEADER, MGMT_PATH, QUERY_PATH};
use crate::client::{AdminClient, ConnectionFactory, QueryClient, TabularResult};
use crate::config::{DEFAULT_APP_NAME, DEFAULT_AUTHORITY_HOST, DEFAULT_REQUEST_TIMEOUT, HelperConfig};
use crate::error::{ClientError, Error, Result};
use crate::observability::{RequestTimer, StatementMetadata};
use crate::request::{AppCredentials, ClientRequestProperties};
use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::Url;

#[derive(Serialize)]
struct StatementBody<'a> {
    db: &'a str,
    csl: &'a str,
}

/// Opens token-authenticated connections to a cluster over HTTPS.
///
/// Opening a connection does no network I/O: it checks the cluster URL and
/// keeps the credentials. Each statement acquires its own token, so a
/// transient identity provider failure is retried with the statement. The
/// underlying `reqwest::Client` is shared, so its connection pool is reused
/// between helper calls. Tokens are not.
#[derive(Debug, Clone)]
pub struct HttpConnectionFactory {
    http: reqwest::Client,
    authority_host: String,
    app_name: String,
    request_timeout: Duration,
}

impl HttpConnectionFactory {
    /// Create a factory with default settings.
    pub fn new() -> Result<Self> {
        Self::from_config(&HelperConfig::default())
    }

    /// Create a factory from the HTTP-related parts of `config`.
    pub fn from_config(config: &HelperConfig) -> Result<Self> {
        let http = build_client(config.request_timeout)
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            authority_host: config.authority_host.clone(),
            app_name: config.app_name.clone(),
            request_timeout: config.request_timeout,
        })
    }

    /// Override the identity provider host.
    pub fn with_authority_host(mut self, host: impl Into<String>) -> Self {
        self.authority_host = host.into();
        self
    }

    /// Identity provider host in use.
    pub fn authority_host(&self) -> &str {
        &self.authority_host
    }

    /// Timeout applied to every HTTP request, token requests included.
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    fn connect(
        &self,
        cluster: &str,
        credentials: &AppCredentials,
    ) -> std::result::Result<HttpConnection, ClientError> {
        let endpoint = parse_cluster(cluster)?;
        debug!(cluster = %endpoint, "Connection ready");

        Ok(HttpConnection {
            http: self.http.clone(),
            endpoint,
            authority_host: self.authority_host.clone(),
            credentials: credentials.clone(),
            app_name: self.app_name.clone(),
        })
    }
}

fn build_client(timeout: Duration) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder().timeout(timeout).build()
}

impl Default for HttpConnectionFactory {
    /// Same settings as [`HttpConnectionFactory::new`].
    ///
    /// # Panics
    ///
    /// If the TLS backend cannot be initialized, like `reqwest::Client::new`.
    /// Use [`new`](Self::new) to get that failure as an error.
    fn default() -> Self {
        let http = build_client(DEFAULT_REQUEST_TIMEOUT).unwrap_or_else(|_| reqwest::Client::new());
        Self {
            http,
            authority_host: DEFAULT_AUTHORITY_HOST.to_string(),
            app_name: DEFAULT_APP_NAME.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

#[async_trait]
impl ConnectionFactory for HttpConnectionFactory {
    type Admin = HttpAdminClient;
    type Query = HttpQueryClient;

    async fn create_admin_connection(
        &self,
        cluster: &str,
        _database: &str,
        credentials: &AppCredentials,
    ) -> std::result::Result<HttpAdminClient, ClientError> {
        Ok(HttpAdminClient {
            connection: Arc::new(self.connect(cluster, credentials)?),
        })
    }

    async fn create_query_connection(
        &self,
        cluster: &str,
        _database: &str,
        credentials: &AppCredentials,
    ) -> std::result::Result<HttpQueryClient, ClientError> {
        Ok(HttpQueryClient {
            connection: Arc::new(self.connect(cluster, credentials)?),
        })
    }
}

/// Cluster URLs must be absolute `http` or `https` URLs.
fn parse_cluster(cluster: &str) -> std::result::Result<Url, ClientError> {
    let url = Url::parse(cluster)
        .map_err(|e| ClientError::InvalidEndpoint(format!("{}: {}", cluster, e)))?;

    match url.scheme() {
        "https" | "http" if !url.cannot_be_a_base() => Ok(url),
        _ => Err(ClientError::InvalidEndpoint(format!(
            "{}: expected an http(s) URL",
            cluster
        ))),
    }
}

struct HttpConnection {
    http: reqwest::Client,
    endpoint: Url,
    authority_host: String,
    credentials: AppCredentials,
    app_name: String,
}

impl HttpConnection {
    async fn post(
        &self,
        path: &str,
        database: &str,
        csl: &str,
        properties: &ClientRequestProperties,
    ) -> std::result::Result<Option<TabularResult>, ClientError> {
        let url = self
            .endpoint
            .join(path)
            .map_err(|e| ClientError::InvalidEndpoint(e.to_string()))?;
        let app = properties.application.as_deref().unwrap_or(&self.app_name);

        // One token per attempt
        let token = acquire_token(
            &self.http,
            &self.authority_host,
            &self.endpoint,
            &self.credentials,
        )
        .await?;

        let metadata = StatementMetadata::new(path, database, &properties.client_request_id);
        metadata.log_request();

        let timer = RequestTimer::start();
        let response = self
            .http
            .post(url)
            .bearer_auth(token.expose_secret())
            .header(CLIENT_REQUEST_ID_HEADER, &properties.client_request_id)
            .header(APP_HEADER, app)
            .json(&StatementBody { db: database, csl })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let err = ClientError::from_response(status.as_u16(), &body);
            metadata.log_error(status.as_u16(), timer.elapsed(), &err.to_string());
            return Err(err);
        }
        metadata.log_success(status.as_u16(), timer.elapsed());

        if body.trim().is_empty() {
            return Ok(None);
        }

        let payload = serde_json::from_str(&body)
            .map_err(|e| ClientError::InvalidResponse(format!("response is not JSON: {}", e)))?;
        Ok(Some(TabularResult::new(payload)))
    }
}

impl fmt::Debug for HttpConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpConnection")
            .field("endpoint", &self.endpoint.as_str())
            .field("authority_host", &self.authority_host)
            .field("app_name", &self.app_name)
            .finish_non_exhaustive()
    }
}

/// Control command client for one helper call.
#[derive(Debug, Clone)]
pub struct HttpAdminClient {
    connection: Arc<HttpConnection>,
}

#[async_trait]
impl AdminClient for HttpAdminClient {
    async fn execute_control_command(
        &self,
        database: &str,
        command: &str,
        properties: &ClientRequestProperties,
    ) -> std::result::Result<Option<TabularResult>, ClientError> {
        self.connection
            .post(MGMT_PATH, database, command, properties)
            .await
    }
}

/// Query client for one helper call.
#[derive(Debug, Clone)]
pub struct HttpQueryClient {
    connection: Arc<HttpConnection>,
}

#[async_trait]
impl QueryClient for HttpQueryClient {
    async fn execute_query(
        &self,
        database: &str,
        query: &str,
        properties: &ClientRequestProperties,
    ) -> std::result::Result<Option<TabularResult>, ClientError> {
        self.connection
            .post(QUERY_PATH, database, query, properties)
            .await
    }
}
