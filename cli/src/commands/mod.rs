//! Command implementations

pub mod config;
pub mod export;
pub mod fetch;
pub mod platforms;
pub mod publish;
pub mod validate;
pub mod version;

use anyhow::{Result, bail};

use crate::app::AppContext;
use crate::domain::config::validate_config_value;

/// Resolves the registry URL from `--registry` or `registry.url`.
fn registry_url(app: &AppContext, flag: Option<String>) -> Result<String> {
    let Some(url) = flag.or_else(|| app.config.registry.url.clone()) else {
        bail!("No registry configured. Pass --registry or run: agentport config set registry.url <URL>");
    };
    validate_config_value("registry.url", &url)?;
    Ok(url)
}
