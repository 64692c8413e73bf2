// Configuration source loading.
//
// Priority order:
// 1. Environment variables (SESSLOG_* prefix)
// 2. Config file path from SESSLOG_CONFIG
// 3. Default config file (./sesslog.toml)
// 4. Built-in defaults

use crate::env::{self, EnvSource};
use crate::DeployConfig;
use anyhow::{Context, Result};
use std::path::Path;

const DEFAULT_CONFIG_FILE: &str = "./sesslog.toml";

/// Load configuration using the given environment source.
pub fn load_config<E: EnvSource>(env: &E) -> Result<DeployConfig> {
    let mut config = load_from_file(env)?.unwrap_or_default();
    env::apply_env_overrides(&mut config, env)?;
    Ok(config)
}

/// Load configuration from a specific file path (for a --config flag), then
/// apply environment overrides on top.
pub fn load_from_file_path<E: EnvSource>(path: impl AsRef<Path>, env: &E) -> Result<DeployConfig> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let mut config: DeployConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
    env::apply_env_overrides(&mut config, env)?;
    Ok(config)
}

fn load_from_file<E: EnvSource>(env: &E) -> Result<Option<DeployConfig>> {
    if let Some(path) = env.get("CONFIG") {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path))?;
        let config: DeployConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path))?;
        return Ok(Some(config));
    }

    if Path::new(DEFAULT_CONFIG_FILE).exists() {
        let content = std::fs::read_to_string(DEFAULT_CONFIG_FILE)
            .with_context(|| format!("Failed to read config file: {}", DEFAULT_CONFIG_FILE))?;
        let config: DeployConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", DEFAULT_CONFIG_FILE))?;
        return Ok(Some(config));
    }

    Ok(None)
}
