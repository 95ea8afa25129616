//! OAuth2/OIDC authorization-code flow engine
//!
//! Implements the credential broker's core: state-parameter generation, the
//! local redirect-callback listener, the code/refresh token exchanges, and
//! the credential cache, sequenced by [`flow::run`]. This crate is a
//! standalone library with no dependency on the CLI binary — it can be
//! tested and used independently.
//!
//! Flow outline:
//! 1. [`cache::TokenCache::load`] + [`token::refresh`] reuse a cached pair
//! 2. On a cache miss, [`state::generate_state`] mints the CSRF nonce
//! 3. [`callback::CallbackListener::bind`] opens the redirect endpoint
//! 4. The user authorizes via [`flow::authorization_url`]
//! 5. [`token::exchange_code`] turns the callback code into tokens
//! 6. [`cache::TokenCache::save`] persists the pair for next time

pub mod cache;
pub mod callback;
pub mod config;
pub mod error;
pub mod flow;
pub mod state;
pub mod token;

pub use cache::TokenCache;
pub use callback::CallbackListener;
pub use config::{AppConfig, ServerConfig};
pub use error::{Error, Result};
pub use state::generate_state;
pub use token::{TokenData, exchange_code, refresh};
