//! HTTP collaborator for real clusters
//!
//! Opens a "connection" by acquiring an application-key token from the
//! identity provider, then posts control commands to `/v1/rest/mgmt` and
//! queries to `/v2/rest/query`. Response bodies are returned untouched.

mod auth;
mod client;

pub use client::{HttpAdminClient, HttpConnectionFactory, HttpQueryClient};

/// Request header carrying the per-call correlation id.
pub const CLIENT_REQUEST_ID_HEADER: &str = "x-ms-client-request-id";

/// Request header carrying the application name.
pub const APP_HEADER: &str = "x-ms-app";

/// Control command endpoint, relative to the cluster URL.
pub const MGMT_PATH: &str = "v1/rest/mgmt";

/// Query endpoint, relative to the cluster URL.
pub const QUERY_PATH: &str = "v2/rest/query";
