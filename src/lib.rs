// src/lib.rs

//! Child processes with raw, pollable stdio.
//!
//! `pipespawn` launches a program with `posix_spawnp`, wiring its stdin,
//! stdout and stderr to pipes created beforehand, and hands back a
//! [`ChildProcess`] whose three pipe ends are [`Endpoint`]s: plain byte
//! streams that can be made non-blocking and registered with a
//! [`Selector`] or the tokio reactor. Lifecycle control is explicit:
//! [`ChildProcess::wait`], [`ChildProcess::try_wait`],
//! [`ChildProcess::kill`] and [`ChildProcess::kill_process_group`].
//!
//! ```no_run
//! use std::io::Read;
//! use pipespawn::ProcessBuilder;
//!
//! # fn main() -> pipespawn::errors::Result<()> {
//! let child = ProcessBuilder::new(["/bin/sh", "-c", "echo hello"])?.start()?;
//! let mut out = String::new();
//! let mut stdout = child.stdout().expect("stdout endpoint");
//! stdout.read_to_string(&mut out)?;
//! assert_eq!(child.wait()?.code(), Some(0));
//! # Ok(())
//! # }
//! ```
//!
//! Modules:
//! - [`spawn`]: builder and spawn protocol
//! - [`process`]: the child handle and its endpoints
//! - [`poll`]: readiness notification (`mio` selector, tokio)
//! - [`sys`]: the system-call seam, with a mock for tests
//! - [`config`]: TOML launch descriptions
//! - [`logging`]: optional subscriber setup

#[cfg(not(unix))]
compile_error!("pipespawn only supports unix platforms");

pub mod config;
pub mod errors;
pub mod logging;
pub mod poll;
pub mod process;
pub mod spawn;
pub mod sys;
pub mod types;

pub use errors::{ProcessError, Result};
pub use poll::{AsyncEndpoint, Event, Interest, Selector, Token};
pub use process::{ChildProcess, Endpoint};
pub use spawn::{ProcessBuilder, Spawnable};
pub use types::{Direction, ExitStatus};

pub use nix::sys::signal::Signal;
