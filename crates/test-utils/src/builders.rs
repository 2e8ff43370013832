#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::PathBuf;

use pipespawn::config::{LaunchConfig, RawLaunchConfig};
use pipespawn::ProcessBuilder;

/// `/bin/sh -c <script>` with the inherited environment.
pub fn sh(script: &str) -> ProcessBuilder {
    ProcessBuilder::new(["/bin/sh", "-c", script]).expect("non-empty command")
}

/// Builder for `LaunchConfig` to simplify test setup.
pub struct LaunchConfigBuilder {
    config: RawLaunchConfig,
}

impl LaunchConfigBuilder {
    pub fn new(command: &[&str]) -> Self {
        Self {
            config: RawLaunchConfig::new(command.iter().map(|s| s.to_string()).collect()),
        }
    }

    pub fn shell(script: &str) -> Self {
        Self::new(&["/bin/sh", "-c", script])
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.config.env.insert(key.to_string(), value.to_string());
        self
    }

    pub fn remove_env(mut self, key: &str) -> Self {
        self.config.remove_env.push(key.to_string());
        self
    }

    pub fn inherit_env(mut self, inherit: bool) -> Self {
        self.config.inherit_env = inherit;
        self
    }

    pub fn directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.directory = Some(dir.into());
        self
    }

    pub fn process_group(mut self, enabled: bool) -> Self {
        self.config.process_group = enabled;
        self
    }

    pub fn raw(self) -> RawLaunchConfig {
        self.config
    }

    pub fn build(self) -> LaunchConfig {
        LaunchConfig::try_from(self.config).expect("Failed to build valid launch config from builder")
    }
}

/// Environment containing only the given pairs plus `PATH`.
pub fn minimal_env(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    let mut env: BTreeMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    if let Ok(path) = std::env::var("PATH") {
        env.insert("PATH".to_string(), path);
    }
    env
}
