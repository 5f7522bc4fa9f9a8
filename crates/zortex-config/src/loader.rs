use std::path::{Path, PathBuf};

use tracing::debug;

use crate::env::apply_env_overrides;
use crate::error::{ConfigError, ConfigResult};
use crate::schema::ZortexConfig;

/// Load configuration from the default config file path, layering
/// environment variable overrides on top, then validate. Hierarchy:
/// env > file > defaults (spec §6).
pub fn load_config() -> ConfigResult<ZortexConfig> {
    let path = default_config_file_path()?;
    load_config_from(&path)
}

/// Load configuration from an explicit path, applying env overrides and
/// validation identically to [`load_config`]. A missing file yields
/// defaults rather than an error.
pub fn load_config_from(path: &Path) -> ConfigResult<ZortexConfig> {
    let mut config = if path.exists() {
        load_from_file(path)?
    } else {
        debug!(path = %path.display(), "config file not found, using defaults");
        ZortexConfig::default()
    };

    apply_env_overrides(&mut config)?;
    config.validate()?;
    Ok(config)
}

fn load_from_file(path: &Path) -> ConfigResult<ZortexConfig> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let config = toml::from_str(&contents)?;
    Ok(config)
}

/// Default config file path: `~/.zortex/config.toml`, matching the
/// home-relative dotfile convention used by `knhk-config`.
pub fn default_config_file_path() -> ConfigResult<PathBuf> {
    let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
    Ok(home.join(".zortex").join("config.toml"))
}
