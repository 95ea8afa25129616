//! Error types for the authorization flow
//!
//! Which variants are fatal depends on where they surface: `Http` and
//! `TokenEndpoint` abort the flow during the final code exchange but only
//! trigger the reauthorization fallback during a cache refresh; `Cache` is
//! recovered on the read side and fatal on the final persist. `Bind` and
//! `CallbackTimeout` are always fatal. The orchestrator makes those calls;
//! nothing here terminates the process.

/// Errors from authorization flow operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("token endpoint error: {0}")]
    TokenEndpoint(String),

    #[error("credential cache error: {0}")]
    Cache(String),

    #[error("callback listener bind failed on {0}: {1}")]
    Bind(String, String),

    #[error("timed out after {0}s waiting for the authorization callback")]
    CallbackTimeout(u64),
}

/// Result alias for flow operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages_are_descriptive() {
        assert!(
            Error::Bind("127.0.0.1:8666".into(), "address in use".into())
                .to_string()
                .contains("127.0.0.1:8666")
        );
        assert!(
            Error::TokenEndpoint("401: invalid_grant".into())
                .to_string()
                .contains("invalid_grant")
        );
        assert_eq!(
            Error::CallbackTimeout(300).to_string(),
            "timed out after 300s waiting for the authorization callback"
        );
    }
}
