mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    // Try default locations
    let default_paths = [
        "./config.toml",
        "./cinefuse.toml",
        "~/.config/cinefuse/config.toml",
        "/etc/cinefuse/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            return load_config(path);
        }
    }

    Ok(Config::default())
}

/// Validate configuration.
///
/// A missing catalog credential is fatal: the catalog upstream is the
/// backbone of every operation. Missing optional credentials only disable
/// their feature, so they warn and continue.
pub fn validate_config(config: &Config) -> Result<()> {
    if config.server.port == 0 {
        anyhow::bail!("Server port cannot be 0");
    }

    if config.catalog.api_key.is_empty() {
        anyhow::bail!("Catalog API key is required (set [catalog] api_key)");
    }

    if config.ratings.api_key.is_empty() {
        tracing::warn!("No ratings API key configured; ratings enrichment disabled");
    }

    if config.streaming.api_key.is_empty() {
        tracing::warn!("No streaming API key configured; streaming availability disabled");
    }

    if config.cache.capacity == 0 {
        anyhow::bail!("Cache capacity cannot be 0");
    }

    Ok(())
}
