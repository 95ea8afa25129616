//! OAuth state-parameter generation
//!
//! The state parameter is the anti-CSRF nonce echoed back by the identity
//! provider in the redirect. It must be unpredictable, so it is drawn from
//! the thread-local CSPRNG rather than a seeded general-purpose generator.

use rand::RngExt;
use rand::distr::Alphanumeric;

/// Generate a random alphanumeric state parameter of the given length.
///
/// Characters are sampled independently and uniformly from the 62-symbol
/// alphanumeric alphabet `[A-Za-z0-9]`.
pub fn generate_state(length: usize) -> String {
    rand::rng()
        .sample_iter(Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}
