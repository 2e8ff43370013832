// src/spawn/mod.rs

//! Spawn side of the crate.
//!
//! - [`builder`] holds [`ProcessBuilder`], the launch configuration and the
//!   ordered spawn protocol.
//! - [`pipes`] owns the six pipe descriptors of a spawn in flight and
//!   computes the descriptor-remapping file actions.

pub mod builder;
pub mod pipes;

pub use builder::ProcessBuilder;

use crate::errors::Result;
use crate::process::ChildProcess;

/// Anything that can launch a [`ChildProcess`].
pub trait Spawnable {
    fn spawn(&self) -> Result<ChildProcess>;
}

impl Spawnable for ProcessBuilder {
    fn spawn(&self) -> Result<ChildProcess> {
        self.start()
    }
}
