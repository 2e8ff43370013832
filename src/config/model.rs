// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

use crate::errors::Result;
use crate::logging::{self, LogLevel};
use crate::process::ChildProcess;
use crate::spawn::{ProcessBuilder, Spawnable};

/// A launch description as read from TOML.
///
/// ```toml
/// command = ["/bin/sh", "-c", "echo \"$VAR\""]
/// directory = "/tmp"
/// inherit_env = true
/// process_group = true
/// log_level = "debug"
/// remove_env = ["HOME"]
///
/// [env]
/// VAR = "secret"
/// ```
///
/// Only `command` is required.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawLaunchConfig {
    /// Program followed by its arguments, already tokenized.
    pub command: Vec<String>,

    /// Variables set on top of the (possibly inherited) environment.
    #[serde(default)]
    pub env: BTreeMap<String, String>,

    /// Inherited variables to drop.
    #[serde(default)]
    pub remove_env: Vec<String>,

    /// Start from a snapshot of the parent's environment (default) or from
    /// an empty one.
    #[serde(default = "default_true")]
    pub inherit_env: bool,

    #[serde(default)]
    pub directory: Option<PathBuf>,

    /// Put the child in its own process group (default).
    #[serde(default = "default_true")]
    pub process_group: bool,

    /// Level for [`LaunchConfig::init_logging`]; `PIPESPAWN_LOG` applies
    /// when absent.
    #[serde(default)]
    pub log_level: Option<LogLevel>,
}

fn default_true() -> bool {
    true
}

impl RawLaunchConfig {
    pub fn new(command: Vec<String>) -> Self {
        Self {
            command,
            env: BTreeMap::new(),
            remove_env: Vec::new(),
            inherit_env: default_true(),
            directory: None,
            process_group: default_true(),
            log_level: None,
        }
    }
}

/// A validated [`RawLaunchConfig`]. Obtain one with `TryFrom`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchConfig {
    pub command: Vec<String>,
    pub env: BTreeMap<String, String>,
    pub remove_env: Vec<String>,
    pub inherit_env: bool,
    pub directory: Option<PathBuf>,
    pub process_group: bool,
    pub log_level: Option<LogLevel>,
}

impl LaunchConfig {
    pub(crate) fn new_unchecked(raw: RawLaunchConfig) -> Self {
        Self {
            command: raw.command,
            env: raw.env,
            remove_env: raw.remove_env,
            inherit_env: raw.inherit_env,
            directory: raw.directory,
            process_group: raw.process_group,
            log_level: raw.log_level,
        }
    }

    /// Install the global subscriber at this launch's `log_level`.
    pub fn init_logging(&self) -> Result<()> {
        logging::init_logging(self.log_level)
    }

    /// A builder configured from this description. The environment snapshot
    /// is taken now, not when the config was loaded.
    pub fn to_builder(&self) -> Result<ProcessBuilder> {
        let mut builder = ProcessBuilder::new(&self.command)?;
        if !self.inherit_env {
            builder.env_clear();
        }
        for key in &self.remove_env {
            builder.env_remove(key);
        }
        builder.envs(&self.env).process_group(self.process_group);
        if let Some(dir) = &self.directory {
            builder.set_directory(dir.clone());
        }
        Ok(builder)
    }
}

impl Spawnable for LaunchConfig {
    fn spawn(&self) -> Result<ChildProcess> {
        self.to_builder()?.start()
    }
}
