//! oidc-token
//!
//! CLI credential broker: runs the OAuth2/OIDC authorization-code flow
//! against a configurable identity provider, reusing a cached refresh token
//! when possible, and prints the resulting access token to stdout.
//!
//! This binary only wires things together — flag/env/file merging, logging
//! setup, and exit-code handling. The flow itself lives in the `oidc-auth`
//! crate.

mod config;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    // LOG_LEVEL / RUST_LOG control diagnostics; default keeps the terminal
    // quiet since stdout carries the token itself.
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let cli = Cli::parse();

    let app_config = config::load(&cli)?;
    app_config.validate().context("invalid configuration")?;

    if cli.save_config {
        let path = config::default_config_path()
            .context("cannot determine a config directory for --save-config")?;
        config::save(&app_config, &path)
            .with_context(|| format!("failed to save config to {}", path.display()))?;
        info!(path = %path.display(), "saved configuration");
    }

    let tokens = oidc_auth::flow::run(&app_config)
        .await
        .context("authorization flow failed")?;

    println!("{}", tokens.access_token);
    Ok(())
}
