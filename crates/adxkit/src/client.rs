//! Collaborator seam
//!
//! The helper never talks to the engine itself. It asks a
//! [`ConnectionFactory`] for a short-lived client, issues exactly one
//! statement per attempt through it, and drops it before returning.
//! [`HttpConnectionFactory`](crate::http::HttpConnectionFactory) is the
//! bundled implementation; tests use [`ScriptedFactory`](crate::testing::ScriptedFactory).

use crate::error::ClientError;
use crate::request::{AppCredentials, ClientRequestProperties};
use async_trait::async_trait;
use serde_json::Value;

/// Opaque tabular result returned by the engine.
///
/// adxkit does not shape result sets; the payload is handed to the caller
/// exactly as the collaborator produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct TabularResult {
    payload: Value,
}

impl TabularResult {
    /// Wrap a raw engine payload.
    pub fn new(payload: Value) -> Self {
        Self { payload }
    }

    /// Borrow the raw payload.
    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// Take ownership of the raw payload.
    pub fn into_payload(self) -> Value {
        self.payload
    }
}

/// Executes control (management) commands.
#[async_trait]
pub trait AdminClient: Send + Sync {
    /// Run one control command. `None` means the engine returned no result.
    async fn execute_control_command(
        &self,
        database: &str,
        command: &str,
        properties: &ClientRequestProperties,
    ) -> Result<Option<TabularResult>, ClientError>;
}

/// Executes read-only queries.
#[async_trait]
pub trait QueryClient: Send + Sync {
    /// Run one query. `None` means the engine returned no result.
    async fn execute_query(
        &self,
        database: &str,
        query: &str,
        properties: &ClientRequestProperties,
    ) -> Result<Option<TabularResult>, ClientError>;
}

/// Opens per-call connections to a cluster.
///
/// Connections are owned by a single helper call and released when dropped,
/// on every exit path.
#[async_trait]
pub trait ConnectionFactory: Send + Sync {
    /// Client type for control commands.
    type Admin: AdminClient;
    /// Client type for queries.
    type Query: QueryClient;

    /// Open a connection able to run control commands.
    async fn create_admin_connection(
        &self,
        cluster: &str,
        database: &str,
        credentials: &AppCredentials,
    ) -> Result<Self::Admin, ClientError>;

    /// Open a connection able to run queries.
    async fn create_query_connection(
        &self,
        cluster: &str,
        database: &str,
        credentials: &AppCredentials,
    ) -> Result<Self::Query, ClientError>;
}
