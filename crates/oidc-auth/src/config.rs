//! Flow configuration types and validation
//!
//! The CLI assembles these from flags, environment variables, and the config
//! file; the flow engine treats them as read-only once [`flow::run`] starts.
//! Validation must pass before the flow is allowed to begin.
//!
//! [`flow::run`]: crate::flow::run

use std::path::PathBuf;

use common::Secret;
use serde::{Deserialize, Serialize};
use url::Url;

/// OpenID Connect server parameters.
///
/// The client secret is wrapped in [`Secret`] so a Debug dump of the
/// configuration never leaks it into logs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub auth_url: String,
    pub token_url: String,
    pub client_id: String,
    pub client_secret: Secret<String>,
    pub redirect_uri: String,
    pub scope: String,
}

/// Full application configuration: server parameters plus the local
/// callback/cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub credentials_cache: PathBuf,
    #[serde(default)]
    pub skip_cache: bool,
    pub callback_port: String,
    /// Seconds to wait for the browser round before failing the flow.
    /// 0 disables the timeout and waits indefinitely.
    #[serde(default = "default_callback_timeout")]
    pub callback_timeout_secs: u64,
}

fn default_callback_timeout() -> u64 {
    300
}

impl AppConfig {
    /// Validate the configuration invariants.
    ///
    /// Every server field must be non-empty, and the port embedded in the
    /// redirect URI must equal `callback_port` exactly (compared as strings,
    /// so `"08666"` does not match `"8666"`). A redirect URI without an
    /// explicit port never validates.
    pub fn validate(&self) -> common::Result<()> {
        let required = [
            ("server.auth_url", &self.server.auth_url),
            ("server.token_url", &self.server.token_url),
            ("server.client_id", &self.server.client_id),
            ("server.redirect_uri", &self.server.redirect_uri),
            ("server.scope", &self.server.scope),
        ];
        for (name, value) in required {
            if value.is_empty() {
                return Err(common::Error::Config(format!("missing field {name}")));
            }
        }
        if self.server.client_secret.expose().is_empty() {
            return Err(common::Error::Config(
                "missing field server.client_secret".into(),
            ));
        }

        let redirect = Url::parse(&self.server.redirect_uri).map_err(|e| {
            common::Error::Config(format!(
                "server.redirect_uri is not a valid URL ({}): {e}",
                self.server.redirect_uri
            ))
        })?;
        let Some(port) = explicit_port(&redirect, &self.server.redirect_uri) else {
            return Err(common::Error::Config(format!(
                "server.redirect_uri must carry an explicit port matching callback_port {}",
                self.callback_port
            )));
        };
        if port.to_string() != self.callback_port {
            return Err(common::Error::Config(format!(
                "server.redirect_uri port {port} does not match callback_port {}",
                self.callback_port
            )));
        }

        Ok(())
    }
}

/// Port written explicitly in the redirect URI.
///
/// `Url::port()` normalizes scheme-default ports away, so
/// `http://host:80/callback` would look portless; recover such a port from
/// the URI text so it still satisfies the callback-port invariant.
fn explicit_port(url: &Url, raw: &str) -> Option<u16> {
    if let Some(port) = url.port() {
        return Some(port);
    }
    let after_scheme = raw.split_once("//").map(|(_, rest)| rest)?;
    let authority = after_scheme.split(['/', '?', '#']).next()?;
    let host_port = authority.rsplit_once('@').map_or(authority, |(_, hp)| hp);
    let (_, port) = host_port.rsplit_once(':')?;
    port.parse()
        .ok()
        .filter(|p| Some(*p) == url.port_or_known_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> AppConfig {
        AppConfig {
            server: ServerConfig {
                auth_url: "https://idp.example/authorize".into(),
                token_url: "https://idp.example/token".into(),
                client_id: "abc".into(),
                client_secret: Secret::new("s3cret".into()),
                redirect_uri: "http://localhost:8666/callback".into(),
                scope: "openid profile".into(),
            },
            credentials_cache: PathBuf::from("/tmp/credentials.json"),
            skip_cache: false,
            callback_port: "8666".into(),
            callback_timeout_secs: 300,
        }
    }

    #[test]
    fn valid_config_passes() {
        valid_config().validate().unwrap();
    }

    #[test]
    fn each_empty_server_field_fails() {
        let fields: [(&str, fn(&mut AppConfig)); 6] = [
            ("auth_url", |c| c.server.auth_url.clear()),
            ("token_url", |c| c.server.token_url.clear()),
            ("client_id", |c| c.server.client_id.clear()),
            ("client_secret", |c| {
                c.server.client_secret = Secret::new(String::new())
            }),
            ("redirect_uri", |c| c.server.redirect_uri.clear()),
            ("scope", |c| c.server.scope.clear()),
        ];

        for (name, clear) in fields {
            let mut config = valid_config();
            clear(&mut config);
            let err = config.validate().unwrap_err();
            assert!(
                matches!(err, common::Error::Config(_)),
                "{name}: expected Config error, got {err:?}"
            );
        }
    }

    #[test]
    fn port_mismatch_fails() {
        let mut config = valid_config();
        config.callback_port = "9000".into();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("does not match callback_port"));
    }

    #[test]
    fn matching_port_passes() {
        let mut config = valid_config();
        config.server.redirect_uri = "http://127.0.0.1:9000/callback".into();
        config.callback_port = "9000".into();
        config.validate().unwrap();
    }

    #[test]
    fn scheme_default_port_written_explicitly_still_matches() {
        // url::Url normalizes :80/:443 away; the invariant is about what
        // the operator wrote, so these must still validate
        let mut config = valid_config();
        config.server.redirect_uri = "http://localhost:80/callback".into();
        config.callback_port = "80".into();
        config.validate().unwrap();

        config.server.redirect_uri = "https://localhost:443/callback".into();
        config.callback_port = "443".into();
        config.validate().unwrap();
    }

    #[test]
    fn scheme_default_port_still_mismatches_other_values() {
        let mut config = valid_config();
        config.server.redirect_uri = "http://localhost:80/callback".into();
        config.callback_port = "8666".into();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("does not match callback_port"));
    }

    #[test]
    fn redirect_uri_without_port_fails() {
        let mut config = valid_config();
        config.server.redirect_uri = "http://localhost/callback".into();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("explicit port"));
    }

    #[test]
    fn port_comparison_is_textual() {
        // "08666" parses to port 8666 but is not the same string
        let mut config = valid_config();
        config.callback_port = "08666".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn debug_output_redacts_secret() {
        let config = valid_config();
        let debug = format!("{config:?}");
        assert!(!debug.contains("s3cret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn deserializes_from_toml_with_defaults() {
        let toml = r#"
credentials_cache = "/tmp/creds.json"
callback_port = "8666"

[server]
auth_url = "https://idp.example/authorize"
token_url = "https://idp.example/token"
client_id = "abc"
client_secret = "s3cret"
redirect_uri = "http://localhost:8666/callback"
scope = "openid"
"#;
        let config: AppConfig = toml::from_str(toml).unwrap();
        assert!(!config.skip_cache);
        assert_eq!(config.callback_timeout_secs, 300);
        config.validate().unwrap();
    }
}
