//! Test utilities for code that drives an [`ExecutionHelper`](crate::ExecutionHelper)
//!
//! [`ScriptedFactory`] is an in-memory collaborator: queue the outcomes each
//! attempt should produce, run the helper, then inspect what was called and
//! whether every connection was released.
//!
//! # Examples
//!
//! ```rust
//! use adxkit::testing::ScriptedFactory;
//! use adxkit::{ClientError, ExecutionHelper, ExecutionRequest};
//! use adxkit_core::retry::testing::RecordingSleeper;
//! use tokio_util::sync::CancellationToken;
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let factory = ScriptedFactory::new();
//! factory.push_err(ClientError::Transport("reset".into()));
//! factory.push_ok(None);
//!
//! let helper = ExecutionHelper::with_factory(factory.clone(), 2)
//!     .unwrap()
//!     .with_sleeper(Arc::new(RecordingSleeper::new()));
//!
//! let request = ExecutionRequest::new("https://c", "db", ".show tables", "id", "secret", "tenant");
//! let result = helper.execute_command(&request, &CancellationToken::new()).await;
//!
//! assert!(result.unwrap().is_none());
//! assert_eq!(factory.attempts(), 2);
//! # });
//! ```

use crate::client::{AdminClient, ConnectionFactory, QueryClient, TabularResult};
use crate::error::ClientError;
use crate::request::{AppCredentials, ClientRequestProperties};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

type Outcome = Result<Option<TabularResult>, ClientError>;

/// Which capability an attempt went through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    /// A control command
    Command,
    /// A query
    Query,
}

/// One attempt as seen by the collaborator.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    /// Command or query
    pub kind: CallKind,
    /// Target database
    pub database: String,
    /// Statement text
    pub statement: String,
    /// Correlation id sent with the attempt
    pub client_request_id: String,
    /// Application name sent with the attempt
    pub application: Option<String>,
}

#[derive(Debug, Default)]
struct State {
    outcomes: Mutex<VecDeque<Outcome>>,
    calls: Mutex<Vec<RecordedCall>>,
    connection_error: Mutex<Option<ClientError>>,
    always_fail: Option<String>,
    opened: AtomicUsize,
    released: AtomicUsize,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Scripted collaborator that replays queued outcomes.
///
/// Each attempt pops the next outcome. Once the queue is empty, attempts
/// succeed with no result, unless the factory was built with
/// [`always_failing`](Self::always_failing).
#[derive(Debug, Clone, Default)]
pub struct ScriptedFactory {
    state: Arc<State>,
}

impl ScriptedFactory {
    /// An empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// A collaborator whose every attempt fails with a transport error.
    pub fn always_failing(message: impl Into<String>) -> Self {
        Self {
            state: Arc::new(State {
                always_fail: Some(message.into()),
                ..State::default()
            }),
        }
    }

    /// Queue a failing attempt.
    pub fn push_err(&self, error: ClientError) {
        lock(&self.state.outcomes).push_back(Err(error));
    }

    /// Queue a successful attempt.
    pub fn push_ok(&self, result: Option<TabularResult>) {
        lock(&self.state.outcomes).push_back(Ok(result));
    }

    /// Make every connection attempt fail with `error`.
    pub fn fail_connections(&self, error: ClientError) {
        *lock(&self.state.connection_error) = Some(error);
    }

    /// Number of attempts made so far.
    pub fn attempts(&self) -> usize {
        lock(&self.state.calls).len()
    }

    /// Every attempt made so far, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        lock(&self.state.calls).clone()
    }

    /// Connections handed out.
    pub fn connections_opened(&self) -> usize {
        self.state.opened.load(Ordering::SeqCst)
    }

    /// Connections dropped.
    pub fn connections_released(&self) -> usize {
        self.state.released.load(Ordering::SeqCst)
    }

    fn open(&self) -> Result<ScriptedClient, ClientError> {
        if let Some(err) = lock(&self.state.connection_error).clone() {
            return Err(err);
        }
        self.state.opened.fetch_add(1, Ordering::SeqCst);
        Ok(ScriptedClient {
            state: Arc::clone(&self.state),
        })
    }
}

#[async_trait]
impl ConnectionFactory for ScriptedFactory {
    type Admin = ScriptedClient;
    type Query = ScriptedClient;

    async fn create_admin_connection(
        &self,
        _cluster: &str,
        _database: &str,
        _credentials: &AppCredentials,
    ) -> Result<ScriptedClient, ClientError> {
        self.open()
    }

    async fn create_query_connection(
        &self,
        _cluster: &str,
        _database: &str,
        _credentials: &AppCredentials,
    ) -> Result<ScriptedClient, ClientError> {
        self.open()
    }
}

/// Connection handed out by [`ScriptedFactory`]. Counts as released on drop.
#[derive(Debug)]
pub struct ScriptedClient {
    state: Arc<State>,
}

impl ScriptedClient {
    fn record(
        &self,
        kind: CallKind,
        database: &str,
        statement: &str,
        properties: &ClientRequestProperties,
    ) -> Outcome {
        lock(&self.state.calls).push(RecordedCall {
            kind,
            database: database.to_string(),
            statement: statement.to_string(),
            client_request_id: properties.client_request_id.clone(),
            application: properties.application.clone(),
        });

        if let Some(message) = &self.state.always_fail {
            return Err(ClientError::Transport(message.clone()));
        }
        lock(&self.state.outcomes).pop_front().unwrap_or(Ok(None))
    }
}

impl Drop for ScriptedClient {
    fn drop(&mut self) {
        self.state.released.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl AdminClient for ScriptedClient {
    async fn execute_control_command(
        &self,
        database: &str,
        command: &str,
        properties: &ClientRequestProperties,
    ) -> Outcome {
        self.record(CallKind::Command, database, command, properties)
    }
}

#[async_trait]
impl QueryClient for ScriptedClient {
    async fn execute_query(
        &self,
        database: &str,
        query: &str,
        properties: &ClientRequestProperties,
    ) -> Outcome {
        self.record(CallKind::Query, database, query, properties)
    }
}
