// src/process/mod.rs

//! The parent's view of a spawned child.
//!
//! - [`handle`] holds [`ChildProcess`]: pid, stdio endpoints, wait and
//!   signal operations.
//! - [`endpoint`] holds [`Endpoint`], the pollable wrapper around one pipe
//!   end.

pub mod endpoint;
pub mod handle;

pub use endpoint::Endpoint;
pub use handle::ChildProcess;
