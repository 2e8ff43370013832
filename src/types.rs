// src/types.rs

use std::fmt;

use nix::sys::signal::Signal;

/// Raw wait status of a reaped child, as returned by `waitpid`.
///
/// The raw word is kept verbatim; the accessors decode it with the
/// platform's `W*` macros.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExitStatus(i32);

impl ExitStatus {
    pub fn from_raw(raw: i32) -> Self {
        ExitStatus(raw)
    }

    pub fn into_raw(self) -> i32 {
        self.0
    }

    /// Exit code if the child called `exit`, `None` if a signal ended it.
    pub fn code(&self) -> Option<i32> {
        if libc::WIFEXITED(self.0) {
            Some(libc::WEXITSTATUS(self.0))
        } else {
            None
        }
    }

    /// Number of the signal that terminated the child.
    pub fn signal(&self) -> Option<i32> {
        if libc::WIFSIGNALED(self.0) {
            Some(libc::WTERMSIG(self.0))
        } else {
            None
        }
    }

    /// Like [`ExitStatus::signal`] but typed; `None` for signals nix does
    /// not know about.
    pub fn terminating_signal(&self) -> Option<Signal> {
        self.signal().and_then(|sig| Signal::try_from(sig).ok())
    }

    pub fn core_dumped(&self) -> bool {
        libc::WIFSIGNALED(self.0) && libc::WCOREDUMP(self.0)
    }

    pub fn success(&self) -> bool {
        self.code() == Some(0)
    }
}

impl From<ExitStatus> for std::process::ExitStatus {
    fn from(status: ExitStatus) -> Self {
        use std::os::unix::process::ExitStatusExt;
        std::process::ExitStatus::from_raw(status.0)
    }
}

impl fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(code) = self.code() {
            write!(f, "exit status: {code}")
        } else if let Some(sig) = self.signal() {
            match Signal::try_from(sig) {
                Ok(name) => write!(f, "signal: {sig} ({name:?})")?,
                Err(_) => write!(f, "signal: {sig}")?,
            }
            if self.core_dumped() {
                write!(f, " (core dumped)")?;
            }
            Ok(())
        } else {
            write!(f, "unrecognised wait status: {:#x}", self.0)
        }
    }
}

/// Which way bytes flow through an endpoint, seen from the parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Parent reads (child's stdout / stderr).
    Read,
    /// Parent writes (child's stdin).
    Write,
}

impl From<Direction> for mio::Interest {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Read => mio::Interest::READABLE,
            Direction::Write => mio::Interest::WRITABLE,
        }
    }
}
