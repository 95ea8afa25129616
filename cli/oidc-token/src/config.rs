//! CLI surface and configuration assembly
//!
//! Every setting can come from a flag, an environment variable, or the TOML
//! config file, with precedence flag > env > file > built-in default (clap's
//! `env` attribute covers the first two). The merged result is an
//! `oidc_auth::AppConfig`; validation of the flow invariants happens there,
//! not here.

use std::path::{Path, PathBuf};

use clap::Parser;
use common::Secret;
use oidc_auth::{AppConfig, ServerConfig};
use serde::Deserialize;

/// Retrieve an access token from an OpenID Connect server using the
/// authorization code flow.
#[derive(Parser, Debug)]
#[command(name = "oidc-token", version)]
pub struct Cli {
    /// Path to the config file (default: <config dir>/oidc-token/config.toml)
    #[arg(long, env = "CONFIG_FILE")]
    pub config_file: Option<PathBuf>,

    /// Save the merged configuration to the default config file
    #[arg(
        long,
        env = "SAVE_CONFIG",
        default_value_t = true,
        action = clap::ArgAction::Set
    )]
    pub save_config: bool,

    /// URL of the OpenID Connect authorization endpoint
    #[arg(long, env = "SERVER_AUTH_URL")]
    pub auth_url: Option<String>,

    /// URL of the OpenID Connect token endpoint
    #[arg(long, env = "SERVER_TOKEN_URL")]
    pub token_url: Option<String>,

    /// ID of the client to authenticate as
    #[arg(long, env = "SERVER_CLIENT_ID")]
    pub client_id: Option<String>,

    /// Secret of the client to authenticate as
    #[arg(long, env = "SERVER_CLIENT_SECRET")]
    pub client_secret: Option<String>,

    /// URL the provider redirects to after authorization
    #[arg(long, env = "SERVER_REDIRECT_URI")]
    pub redirect_uri: Option<String>,

    /// OpenID scopes to request
    #[arg(long, env = "SERVER_SCOPE")]
    pub scope: Option<String>,

    /// Port the local callback server listens on
    #[arg(long, env = "CALLBACK_SERVER_PORT")]
    pub callback_port: Option<String>,

    /// Path where credentials are cached
    #[arg(long, env = "CREDENTIALS_CACHE")]
    pub credentials_cache: Option<PathBuf>,

    /// Skip the cache and force a new token exchange
    ///
    /// Tri-state so `--skip-cache=false` can override a config file that
    /// sets it; bare `--skip-cache` means true, absent defers to the file.
    #[arg(
        long,
        env = "SKIP_CACHE",
        num_args = 0..=1,
        default_missing_value = "true"
    )]
    pub skip_cache: Option<bool>,

    /// Seconds to wait for the browser callback (0 waits forever)
    #[arg(long, env = "CALLBACK_TIMEOUT_SECS")]
    pub callback_timeout_secs: Option<u64>,
}

/// Config-file schema. Everything is optional; the file only fills in what
/// flags and environment variables left unset.
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    #[serde(default)]
    server: FileServerConfig,
    credentials_cache: Option<PathBuf>,
    #[serde(default)]
    skip_cache: bool,
    callback_port: Option<String>,
    callback_timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct FileServerConfig {
    auth_url: Option<String>,
    token_url: Option<String>,
    client_id: Option<String>,
    client_secret: Option<String>,
    redirect_uri: Option<String>,
    scope: Option<String>,
}

/// Default config file location under the platform config directory.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("oidc-token/config.toml"))
}

fn default_cache_path() -> Option<PathBuf> {
    dirs::cache_dir().map(|dir| dir.join("oidc-token/credentials.json"))
}

/// Assemble the application configuration from CLI, environment, and file.
///
/// An explicitly named config file that cannot be read is fatal; the
/// default path being absent is just a first run and is skipped silently.
pub fn load(cli: &Cli) -> common::Result<AppConfig> {
    let file = match &cli.config_file {
        Some(path) => read_file(path)?,
        None => match default_config_path() {
            Some(path) if path.exists() => read_file(&path)?,
            _ => FileConfig::default(),
        },
    };

    let server = ServerConfig {
        auth_url: cli
            .auth_url
            .clone()
            .or(file.server.auth_url)
            .unwrap_or_default(),
        token_url: cli
            .token_url
            .clone()
            .or(file.server.token_url)
            .unwrap_or_default(),
        client_id: cli
            .client_id
            .clone()
            .or(file.server.client_id)
            .unwrap_or_default(),
        client_secret: Secret::new(
            cli.client_secret
                .clone()
                .or(file.server.client_secret)
                .unwrap_or_default(),
        ),
        redirect_uri: cli
            .redirect_uri
            .clone()
            .or(file.server.redirect_uri)
            .unwrap_or_default(),
        scope: cli.scope.clone().or(file.server.scope).unwrap_or_default(),
    };

    let credentials_cache = cli
        .credentials_cache
        .clone()
        .or(file.credentials_cache)
        .or_else(default_cache_path)
        .ok_or_else(|| {
            common::Error::Config(
                "cannot determine a credentials cache path; pass --credentials-cache".into(),
            )
        })?;

    Ok(AppConfig {
        server,
        credentials_cache,
        skip_cache: cli.skip_cache.unwrap_or(file.skip_cache),
        callback_port: cli
            .callback_port
            .clone()
            .or(file.callback_port)
            .unwrap_or_else(|| "8666".into()),
        callback_timeout_secs: cli
            .callback_timeout_secs
            .or(file.callback_timeout_secs)
            .unwrap_or(300),
    })
}

fn read_file(path: &Path) -> common::Result<FileConfig> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        common::Error::Config(format!("reading config file {}: {e}", path.display()))
    })?;
    Ok(toml::from_str(&contents)?)
}

/// Write the merged configuration back as TOML, 0600 since it carries the
/// client secret.
pub fn save(config: &AppConfig, path: &Path) -> common::Result<()> {
    let toml = toml::to_string_pretty(config)
        .map_err(|e| common::Error::Config(format!("serializing config: {e}")))?;

    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    std::fs::write(path, toml)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    }

    Ok(())
}
