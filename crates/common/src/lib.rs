//! Common types for the oidc-token workspace

mod error;
mod secret;

pub use error::{Error, Result};
pub use secret::Secret;
