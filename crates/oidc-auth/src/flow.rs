//! Flow orchestrator
//!
//! Sequences the whole credential flow: try the cache + a refresh first,
//! otherwise run a full interactive authorization round, then persist the
//! result. This is the only module that talks to every other component;
//! the listener never touches the cache and the cache never sees the state
//! parameter.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::cache::TokenCache;
use crate::callback::CallbackListener;
use crate::config::{AppConfig, ServerConfig};
use crate::error::{Error, Result};
use crate::state::generate_state;
use crate::token::{self, TokenData};

/// Length of the generated state parameter.
const STATE_LENGTH: usize = 16;

/// Client-side timeout for token endpoint calls.
const TOKEN_ENDPOINT_TIMEOUT: Duration = Duration::from_secs(10);

/// Compose the provider authorization URL for one flow execution.
///
/// Query parameters: `client_id`, `redirect_uri`, `response_type=code`,
/// `scope`, `state`, each value percent-encoded.
pub fn authorization_url(server: &ServerConfig, state: &str) -> String {
    format!(
        "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&state={}",
        server.auth_url,
        urlencoding::encode(&server.client_id),
        urlencoding::encode(&server.redirect_uri),
        urlencoding::encode(&server.scope),
        urlencoding::encode(state),
    )
}

/// Run the credential flow to completion and return the token pair.
///
/// The configuration must already be validated. Errors returned here are
/// the unrecovered ones: listener bind failure, callback timeout, a failed
/// code exchange, or a failed final persist. A failed cache read or refresh
/// is recovered internally by falling back to a fresh interactive round.
pub async fn run(config: &AppConfig) -> Result<TokenData> {
    let client = reqwest::Client::builder()
        .timeout(TOKEN_ENDPOINT_TIMEOUT)
        .build()
        .map_err(|e| Error::Http(format!("building HTTP client: {e}")))?;
    let cache = TokenCache::new(config.credentials_cache.clone());

    if !config.skip_cache {
        if let Some(refreshed) = try_cached_refresh(&client, config, &cache).await {
            cache.save(&refreshed).await?;
            info!("reused cached credentials via refresh");
            return Ok(refreshed);
        }
    }

    // Full interactive round. Bind before showing the URL so a port
    // conflict surfaces instead of sending the user to a dead redirect.
    let state = generate_state(STATE_LENGTH);
    let listener = CallbackListener::bind(&config.callback_port, state.clone()).await?;

    let auth_url = authorization_url(&config.server, &state);
    println!("Open the following URL in your browser to continue:\n{auth_url}");

    let code = listener.wait_for_code(config.callback_timeout_secs).await?;
    debug!("exchanging authorization code");

    let tokens = token::exchange_code(&client, &config.server, &code).await?;
    cache.save(&tokens).await?;
    info!("authorization flow completed");

    Ok(tokens)
}

/// Attempt the cache-then-refresh shortcut.
///
/// Returns the refreshed pair on success. Any failure along the way is a
/// cache miss: a missing or corrupt record simply falls through, a rejected
/// refresh additionally clears the cache so the stale record is not retried
/// next run. Neither is fatal.
async fn try_cached_refresh(
    client: &reqwest::Client,
    config: &AppConfig,
    cache: &TokenCache,
) -> Option<TokenData> {
    let cached = match cache.load().await {
        Ok(cached) => cached,
        Err(err) => {
            debug!(%err, "no usable credential cache");
            return None;
        }
    };

    match token::refresh(client, &config.server, &cached.refresh_token).await {
        Ok(refreshed) => Some(refreshed),
        Err(err) => {
            warn!(%err, "token refresh failed, clearing cache");
            if let Err(err) = cache.clear().await {
                warn!(%err, "failed to clear credential cache");
            }
            None
        }
    }
}
