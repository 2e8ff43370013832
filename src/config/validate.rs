// src/config/validate.rs

use crate::config::model::{LaunchConfig, RawLaunchConfig};
use crate::errors::{ProcessError, Result};

impl TryFrom<RawLaunchConfig> for LaunchConfig {
    type Error = ProcessError;

    fn try_from(raw: RawLaunchConfig) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(LaunchConfig::new_unchecked(raw))
    }
}

fn validate_raw_config(cfg: &RawLaunchConfig) -> Result<()> {
    ensure_has_command(cfg)?;
    validate_env_names(cfg)?;
    validate_no_nul(cfg)?;
    validate_directory(cfg)?;
    Ok(())
}

fn ensure_has_command(cfg: &RawLaunchConfig) -> Result<()> {
    match cfg.command.first() {
        None => Err(ProcessError::ConfigError(
            "command must contain at least the program name".to_string(),
        )),
        Some(program) if program.is_empty() => Err(ProcessError::ConfigError(
            "program name (command[0]) must not be empty".to_string(),
        )),
        Some(_) => Ok(()),
    }
}

fn validate_env_names(cfg: &RawLaunchConfig) -> Result<()> {
    for name in cfg.env.keys().chain(cfg.remove_env.iter()) {
        if name.is_empty() || name.contains('=') || name.contains('\0') {
            return Err(ProcessError::ConfigError(format!(
                "invalid environment variable name {name:?}"
            )));
        }
    }
    Ok(())
}

fn validate_no_nul(cfg: &RawLaunchConfig) -> Result<()> {
    if let Some(arg) = cfg.command.iter().find(|arg| arg.contains('\0')) {
        return Err(ProcessError::ConfigError(format!(
            "command argument {arg:?} contains a NUL byte"
        )));
    }
    if let Some((name, _)) = cfg.env.iter().find(|(_, value)| value.contains('\0')) {
        return Err(ProcessError::ConfigError(format!(
            "value of environment variable {name} contains a NUL byte"
        )));
    }
    Ok(())
}

fn validate_directory(cfg: &RawLaunchConfig) -> Result<()> {
    if let Some(dir) = &cfg.directory {
        if dir.as_os_str().is_empty() {
            return Err(ProcessError::ConfigError(
                "directory must not be empty when given".to_string(),
            ));
        }
    }
    Ok(())
}
