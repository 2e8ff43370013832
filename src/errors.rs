// src/errors.rs

//! Crate-wide error type.
//!
//! Signal delivery has no variant: `kill` and friends return
//! `Result<(), Errno>` straight from the platform, where `ESRCH` for an
//! exited child is an ordinary outcome.

use std::io;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProcessError {
    /// Empty command, interior NUL bytes, or a malformed environment name.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Pipe creation failed (descriptor limits, out of memory).
    #[error("Resource exhausted while creating stdio pipes: {0}")]
    ResourceExhausted(#[source] io::Error),

    /// The atomic spawn call failed. Every pipe descriptor has been closed.
    #[error("Failed to spawn '{program}': {source}")]
    SpawnFailed {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("Process {pid} has not yet terminated")]
    NotTerminated { pid: i32 },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),
}

impl ProcessError {
    /// Raw OS error code behind a spawn, pipe or I/O failure, if any.
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            ProcessError::ResourceExhausted(e)
            | ProcessError::SpawnFailed { source: e, .. }
            | ProcessError::Io(e) => e.raw_os_error(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ProcessError>;
