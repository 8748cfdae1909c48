//! Application-key token acquisition (OAuth2 client credentials).

use crate::error::ClientError;
use crate::request::AppCredentials;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::debug;
use url::Url;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    error_description: Option<String>,
}

/// Token scope for a cluster: `{cluster}/.default`.
pub(crate) fn scope_for(cluster: &Url) -> String {
    format!("{}/.default", cluster.as_str().trim_end_matches('/'))
}

/// Acquire a bearer token for `cluster`. Tokens are never cached.
pub(crate) async fn acquire_token(
    http: &reqwest::Client,
    authority_host: &str,
    cluster: &Url,
    credentials: &AppCredentials,
) -> Result<SecretString, ClientError> {
    let token_url = format!(
        "{}/{}/oauth2/v2.0/token",
        authority_host.trim_end_matches('/'),
        credentials.app_tenant
    );
    let scope = scope_for(cluster);

    debug!(tenant = %credentials.app_tenant, scope = %scope, "Requesting application token");

    let response = http
        .post(&token_url)
        .form(&[
            ("grant_type", "client_credentials"),
            ("client_id", credentials.app_id.as_str()),
            ("client_secret", credentials.app_secret.expose_secret()),
            ("scope", scope.as_str()),
        ])
        .send()
        .await?;

    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        return Err(token_error(status.as_u16(), &body));
    }

    let token: TokenResponse = serde_json::from_str(&body)
        .map_err(|e| ClientError::Authentication(format!("malformed token response: {}", e)))?;

    Ok(SecretString::new(token.access_token.into_boxed_str()))
}

/// Outages and throttling stay retryable; anything else is a credential problem.
fn token_error(status: u16, body: &str) -> ClientError {
    let parsed = serde_json::from_str::<TokenErrorResponse>(body).ok();
    let reason = match &parsed {
        Some(err) => match &err.error_description {
            Some(description) => format!("{}: {}", err.error, description),
            None => err.error.clone(),
        },
        None => format!("identity provider returned HTTP {}", status),
    };

    if status >= 500 || status == 408 || status == 429 {
        ClientError::Service {
            status,
            code: parsed.map(|err| err.error),
            message: reason,
        }
    } else {
        ClientError::Authentication(reason)
    }
}
