// src/config/loader.rs

use std::fs;
use std::path::Path;

use crate::config::model::{LaunchConfig, RawLaunchConfig};
use crate::errors::Result;

/// Load a launch file and return the raw `RawLaunchConfig`.
///
/// This only performs TOML deserialization; use [`load_and_validate`] for a
/// config that is safe to spawn from.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawLaunchConfig> {
    let contents = fs::read_to_string(path.as_ref())?;
    load_from_str(&contents)
}

pub fn load_from_str(contents: &str) -> Result<RawLaunchConfig> {
    let config: RawLaunchConfig = toml::from_str(contents)?;
    Ok(config)
}

/// Load a launch file from path and validate it.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<LaunchConfig> {
    let raw_config = load_from_path(&path)?;
    let config = LaunchConfig::try_from(raw_config)?;
    Ok(config)
}
