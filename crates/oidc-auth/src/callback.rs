//! Redirect-callback listener
//!
//! A short-lived HTTP endpoint that receives the identity provider's
//! redirect on `GET /callback`, validates the `state` parameter against the
//! value minted for this flow, and hands the authorization code to the
//! orchestrator over a single-shot channel. Invalid requests get a 400 and
//! the listener keeps waiting; after the one valid code is delivered the
//! server shuts itself down and releases the port.
//!
//! Binding happens eagerly in [`CallbackListener::bind`] so a port conflict
//! surfaces before the authorization URL is ever shown to the user.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::sync::{Mutex, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Query parameters of the provider redirect. Missing parameters are
/// treated as empty so they fail validation instead of failing extraction.
#[derive(Deserialize)]
struct CallbackParams {
    #[serde(default)]
    code: String,
    #[serde(default)]
    state: String,
}

/// Shared handler state. The senders sit behind `Option` so the handler can
/// consume them exactly once; a later well-formed request finds them gone
/// and is rejected.
#[derive(Clone)]
struct ListenerState {
    expected_state: String,
    code_tx: Arc<Mutex<Option<oneshot::Sender<String>>>>,
    shutdown_tx: Arc<Mutex<Option<oneshot::Sender<()>>>>,
}

/// A bound, running callback listener tied to one flow execution.
#[derive(Debug)]
pub struct CallbackListener {
    local_addr: SocketAddr,
    code_rx: oneshot::Receiver<String>,
    server: JoinHandle<()>,
}

impl CallbackListener {
    /// Bind `127.0.0.1:<port>` and start serving `/callback`.
    ///
    /// Bind failure (port in use, insufficient permission) is returned here,
    /// before the caller prints the authorization URL.
    pub async fn bind(port: &str, expected_state: String) -> Result<Self> {
        let addr = format!("127.0.0.1:{port}");
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| Error::Bind(addr.clone(), e.to_string()))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| Error::Bind(addr, e.to_string()))?;

        let (code_tx, code_rx) = oneshot::channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let state = ListenerState {
            expected_state,
            code_tx: Arc::new(Mutex::new(Some(code_tx))),
            shutdown_tx: Arc::new(Mutex::new(Some(shutdown_tx))),
        };

        let app = Router::new()
            .route("/callback", get(handle_callback))
            .with_state(state);

        let server = tokio::spawn(async move {
            let shutdown = async {
                let _ = shutdown_rx.await;
            };
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(shutdown)
                .await
            {
                warn!(error = %e, "callback server terminated abnormally");
            }
        });

        debug!(%local_addr, "callback listener bound");
        Ok(Self {
            local_addr,
            code_rx,
            server,
        })
    }

    /// The address actually bound (useful when the port was `0`).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Suspend until the one valid authorization code arrives.
    ///
    /// With a non-zero `timeout_secs` the wait is cancelled after that many
    /// seconds, the server task is aborted to release the port, and
    /// [`Error::CallbackTimeout`] is returned. Zero waits indefinitely.
    /// On success the server has already begun graceful shutdown; this
    /// waits for it to finish so the port is free when we return.
    pub async fn wait_for_code(self, timeout_secs: u64) -> Result<String> {
        let received = if timeout_secs == 0 {
            self.code_rx.await
        } else {
            match tokio::time::timeout(Duration::from_secs(timeout_secs), self.code_rx).await {
                Ok(received) => received,
                Err(_) => {
                    self.server.abort();
                    return Err(Error::CallbackTimeout(timeout_secs));
                }
            }
        };

        match received {
            Ok(code) => {
                let _ = self.server.await;
                debug!("authorization code received, listener stopped");
                Ok(code)
            }
            // Sender dropped without sending: the serve task died underneath us
            Err(_) => {
                self.server.abort();
                Err(Error::Http(
                    "callback listener stopped before delivering a code".into(),
                ))
            }
        }
    }
}

async fn handle_callback(
    State(state): State<ListenerState>,
    Query(params): Query<CallbackParams>,
) -> (StatusCode, &'static str) {
    if params.code.is_empty() || params.state != state.expected_state {
        warn!("rejected callback with missing code or mismatched state");
        return (StatusCode::BAD_REQUEST, "Invalid request\n");
    }

    let Some(code_tx) = state.code_tx.lock().await.take() else {
        // A replayed or duplicated redirect after the code was consumed
        warn!("rejected duplicate callback after code delivery");
        return (StatusCode::BAD_REQUEST, "Authorization already completed\n");
    };

    if code_tx.send(params.code).is_err() {
        // Orchestrator gave up (timeout) between our bind and this request
        return (StatusCode::BAD_REQUEST, "Authorization no longer pending\n");
    }

    if let Some(shutdown_tx) = state.shutdown_tx.lock().await.take() {
        let _ = shutdown_tx.send(());
    }

    (
        StatusCode::OK,
        "Authorization successful. You can close this tab.\n",
    )
}
