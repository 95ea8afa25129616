//! Secret wrapper for sensitive values

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use zeroize::Zeroize;

/// Sensitive value - redacted in Debug/Display/logs
pub struct Secret<T: Zeroize>(T);

impl<T: Zeroize> Secret<T> {
    /// Create a new secret value
    pub fn new(value: T) -> Self {
        Self(value)
    }

    /// Expose the inner value (use sparingly)
    pub fn expose(&self) -> &T {
        &self.0
    }
}

impl<T: Zeroize> fmt::Debug for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl<T: Zeroize> fmt::Display for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl<T: Zeroize> Drop for Secret<T> {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl<T: Zeroize + Clone> Clone for Secret<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

// Serde passes through to the inner value: secrets live in config files,
// so they must round-trip. Redaction applies to Debug/Display only.
impl<'de, T: Zeroize + Deserialize<'de>> Deserialize<'de> for Secret<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        T::deserialize(deserializer).map(Self)
    }
}

impl<T: Zeroize + Serialize> Serialize for Secret<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_redacts_debug() {
        let secret = Secret::new(String::from("my-client-secret"));
        let debug = format!("{:?}", secret);
        assert_eq!(debug, "[REDACTED]");
        assert!(!debug.contains("my-client-secret"));
    }

    #[test]
    fn test_secret_exposes_value() {
        let secret = Secret::new(String::from("my-client-secret"));
        assert_eq!(secret.expose(), "my-client-secret");
    }

    #[test]
    fn test_secret_serde_roundtrip() {
        #[derive(Serialize, Deserialize)]
        struct Wrapper {
            secret: Secret<String>,
        }

        let toml = "secret = \"hunter2\"\n";
        let wrapper: Wrapper = toml::from_str(toml).unwrap();
        assert_eq!(wrapper.secret.expose(), "hunter2");

        let out = toml::to_string(&wrapper).unwrap();
        assert_eq!(out, toml);
    }
}
