/// Loading and saving the client configuration
use anyhow::{Context, Result};
use emby_client::ServerConfig;
use std::path::Path;

pub const DEFAULT_CONFIG_FILE: &str = "emby.toml";

/// Environment variables overriding the file, e.g. `EMBY_URL`, `EMBY_API_KEY`.
pub const ENV_PREFIX: &str = "EMBY";

/// Load configuration from file and environment
pub fn load(path: &Path) -> Result<ServerConfig> {
    load_with_prefix(path, ENV_PREFIX)
}

fn load_with_prefix(path: &Path, prefix: &str) -> Result<ServerConfig> {
    let mut settings = config::Config::builder();

    // Load from config file if it exists
    if path.exists() {
        settings = settings.add_source(config::File::from(path.to_path_buf()));
    }

    // Keys are flat, so no separator: EMBY_API_KEY maps to `api_key`
    settings = settings.add_source(config::Environment::with_prefix(prefix));

    let config = settings
        .build()
        .with_context(|| format!("Failed to read configuration from {}", path.display()))?;

    config
        .try_deserialize()
        .context("Invalid configuration")
}

/// Persist the configuration, including the session obtained by the client.
pub fn save(path: &Path, config: &ServerConfig) -> Result<()> {
    let contents = toml::to_string_pretty(config).context("Failed to serialize configuration")?;
    std::fs::write(path, contents)
        .with_context(|| format!("Failed to write configuration to {}", path.display()))?;

    tracing::info!(path = %path.display(), "Configuration saved");
    Ok(())
}
