//! CLI subcommands and the wiring they share

pub mod config;
pub mod filters;
pub mod users;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use usersync_core::config::Config;
use usersync_rest::{RestClient, RestPlatform};

/// Loads the configuration from `path`, or from the default location
///
/// A missing file at the default location yields the defaults; an explicit
/// path must exist.
pub fn load_config(path: Option<&Path>) -> Result<(PathBuf, Config)> {
    match path {
        Some(path) => {
            let config = Config::load(path)
                .with_context(|| format!("Failed to load configuration {}", path.display()))?;
            Ok((path.to_path_buf(), config))
        }
        None => {
            let path = Config::default_path();
            let config = Config::load_or_default(&path);
            Ok((path, config))
        }
    }
}

/// Fails with every validation error of `config`
pub fn ensure_valid(config: &Config) -> Result<()> {
    let errors = config.validate();
    if errors.is_empty() {
        return Ok(());
    }
    let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
    anyhow::bail!("Invalid configuration: {}", messages.join("; "))
}

/// Builds the REST platform client from the `platform` section
///
/// The API token is read from the environment variable named by
/// `platform.token_env`.
pub fn connect(config: &Config) -> Result<RestPlatform> {
    let token = std::env::var(&config.platform.token_env).with_context(|| {
        format!(
            "API token not found, set the {} environment variable",
            config.platform.token_env
        )
    })?;
    info!(server = %config.platform.server, "Connecting to platform");

    let platform = RestPlatform::new(RestClient::with_base_url(token, &config.platform.server));
    Ok(match &config.platform.domain {
        Some(domain) => platform.with_domain(domain.clone()),
        None => platform,
    })
}
