mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::info;

/// Environment variable that overrides the config file location.
pub const CONFIG_ENV: &str = "AKMD_CONFIG";

/// Returns the config directory: $XDG_CONFIG_HOME/akmd/
pub fn config_dir() -> Result<PathBuf> {
    let dir = dirs::config_dir()
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?
        .join("akmd");
    Ok(dir)
}

/// Returns the config file path: `$AKMD_CONFIG`, or <config_dir>/akmd/config.toml.
pub fn config_path() -> Result<PathBuf> {
    if let Some(path) = std::env::var_os(CONFIG_ENV) {
        return Ok(PathBuf::from(path));
    }
    Ok(config_dir()?.join("config.toml"))
}

/// Load config from disk, or return default if not found.
pub fn load_config() -> Result<DaemonConfig> {
    let path = config_path()?;
    if path.exists() {
        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config = parse_config(&contents)
            .with_context(|| format!("parsing {}", path.display()))?;
        info!(?path, "Loaded config");
        Ok(config)
    } else {
        info!(?path, "No config found, using defaults");
        Ok(DaemonConfig::default())
    }
}

/// Parse a TOML document. Missing tables and keys take their defaults.
pub fn parse_config(contents: &str) -> Result<DaemonConfig> {
    Ok(toml::from_str(contents)?)
}
