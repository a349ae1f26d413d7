use crate::config::schema::{
    ConductorConfig, CONDUCTOR_AUTH_KEY, CONDUCTOR_AUTH_SECRET, CONDUCTOR_SERVER_URL,
    LOCAL_DEV_SERVER_URL,
};
use crate::config::validation::validate_config;
use crate::error::{ConductorError, Result};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable pointing at an explicit TOML config file.
pub const CONFIG_PATH_ENV: &str = "CONDUCTOR_MCP_CONFIG";

/// Get the default configuration file path based on platform
pub fn get_config_path() -> PathBuf {
    dirs::config_dir()
        .map(|p| p.join("conductor-mcp"))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("config.toml")
}

/// Load configuration from a TOML file
pub fn load_config_file(path: &Path) -> Result<ConductorConfig> {
    let content = fs::read_to_string(path).map_err(|e| {
        ConductorError::Config(format!("Failed to read config from {:?}: {}", path, e))
    })?;

    let config: ConductorConfig = toml::from_str(&content)?;

    tracing::info!("Loaded config from {:?}", path);
    Ok(config)
}

/// Read connection settings from a variable lookup. Empty values count as unset.
pub fn config_from_lookup<F>(lookup: F) -> ConductorConfig
where
    F: Fn(&str) -> Option<String>,
{
    let read = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
    ConductorConfig {
        server_url: read(CONDUCTOR_SERVER_URL).unwrap_or_default(),
        auth_key: read(CONDUCTOR_AUTH_KEY),
        auth_secret: read(CONDUCTOR_AUTH_SECRET),
    }
}

/// Read connection settings from the process environment
pub fn config_from_env() -> ConductorConfig {
    config_from_lookup(|name| env::var(name).ok())
}

/// Build the startup configuration.
///
/// Layering, lowest to highest: `local_dev` defaults, config file, environment.
/// The file is `file` when given, otherwise the platform default if it exists.
pub fn resolve_config_with<F>(
    file: Option<&Path>,
    lookup: F,
    local_dev: bool,
) -> Result<ConductorConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = ConductorConfig::default();

    if local_dev {
        tracing::info!("Initializing local development");
        config.server_url = LOCAL_DEV_SERVER_URL.to_string();
    }

    match file {
        Some(path) => config = config.merge(load_config_file(path)?),
        None => {
            let default_path = get_config_path();
            if default_path.exists() {
                config = config.merge(load_config_file(&default_path)?);
            }
        }
    }

    config = config.merge(config_from_lookup(lookup));

    validate_config(&config)?;
    Ok(config)
}

/// Build the startup configuration from the real environment
pub fn resolve_config(local_dev: bool) -> Result<ConductorConfig> {
    let file = env::var(CONFIG_PATH_ENV)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from);
    resolve_config_with(file.as_deref(), |name| env::var(name).ok(), local_dev)
}
