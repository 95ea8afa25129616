//! Token endpoint interactions
//!
//! Handles the two token-endpoint POSTs of the authorization-code flow:
//! 1. Authorization code exchange (completing an interactive round)
//! 2. Token refresh (reusing a cached refresh token)
//!
//! Both send form-encoded bodies and neither retries: retry policy, such as
//! it is, belongs to the orchestrator's cache-fallback logic.

use serde::{Deserialize, Serialize};

use crate::config::ServerConfig;
use crate::error::{Error, Result};

/// Access/refresh token pair returned by the token endpoint.
///
/// Never partially populated: a response missing either field fails to
/// decode and the operation errors as a whole.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenData {
    pub access_token: String,
    pub refresh_token: String,
}

/// Exchange an authorization code for a token pair.
///
/// Any non-200 response is an error carrying the status and response body
/// so the user can see what the provider rejected.
pub async fn exchange_code(
    client: &reqwest::Client,
    server: &ServerConfig,
    code: &str,
) -> Result<TokenData> {
    let response = client
        .post(&server.token_url)
        .form(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", &server.redirect_uri),
            ("client_id", &server.client_id),
            ("client_secret", server.client_secret.expose()),
        ])
        .send()
        .await
        .map_err(|e| Error::Http(format!("token exchange request failed: {e}")))?;

    let status = response.status();
    if status != reqwest::StatusCode::OK {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("<no body>"));
        return Err(Error::TokenEndpoint(format!(
            "token exchange failed ({status}): {body}"
        )));
    }

    response
        .json::<TokenData>()
        .await
        .map_err(|e| Error::TokenEndpoint(format!("invalid token response: {e}")))
}

/// Obtain a fresh token pair from a refresh token.
///
/// Non-200 responses error with the status alone; the orchestrator treats
/// any refresh failure as "cached credentials are stale" and falls back to
/// a full interactive round.
pub async fn refresh(
    client: &reqwest::Client,
    server: &ServerConfig,
    refresh_token: &str,
) -> Result<TokenData> {
    let response = client
        .post(&server.token_url)
        .form(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", &server.client_id),
            ("client_secret", server.client_secret.expose()),
        ])
        .send()
        .await
        .map_err(|e| Error::Http(format!("token refresh request failed: {e}")))?;

    let status = response.status();
    if status != reqwest::StatusCode::OK {
        return Err(Error::TokenEndpoint(format!(
            "token refresh failed: {status}"
        )));
    }

    response
        .json::<TokenData>()
        .await
        .map_err(|e| Error::TokenEndpoint(format!("invalid refresh response: {e}")))
}
