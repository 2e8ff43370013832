// src/spawn/pipes.rs

//! Descriptor bookkeeping for a single spawn.

use std::io;
use std::os::fd::{AsFd, AsRawFd, OwnedFd};

use tracing::debug;

use crate::sys::{FileAction, Posix};

/// Lowest descriptor number a pipe end may occupy. Keeping every end out of
/// 0..=2 means no `dup2` action can clobber a descriptor a later action
/// still needs, and `dup2` always clears close-on-exec on the target.
const FIRST_FREE_FD: i32 = libc::STDERR_FILENO + 1;

/// One unidirectional pipe.
#[derive(Debug)]
pub struct Pipe {
    pub read: OwnedFd,
    pub write: OwnedFd,
}

impl Pipe {
    pub fn create(posix: &dyn Posix) -> io::Result<Self> {
        let (read, write) = posix.pipe()?;
        Ok(Pipe {
            read: above_stdio(posix, read)?,
            write: above_stdio(posix, write)?,
        })
    }
}

fn above_stdio(posix: &dyn Posix, fd: OwnedFd) -> io::Result<OwnedFd> {
    if fd.as_raw_fd() >= FIRST_FREE_FD {
        return Ok(fd);
    }
    let moved = posix.dup_above(fd.as_fd(), FIRST_FREE_FD)?;
    debug!(
        from = fd.as_raw_fd(),
        to = moved.as_raw_fd(),
        "moved pipe end off a standard descriptor slot"
    );
    Ok(moved)
}

/// The three stdio pipes. Owns all six descriptors until the spawn
/// succeeds; dropping it at any point closes whatever it still holds.
#[derive(Debug)]
pub struct PipeSet {
    pub stdin: Pipe,
    pub stdout: Pipe,
    pub stderr: Pipe,
}

/// The ends the parent keeps once the child is running.
#[derive(Debug)]
pub struct ParentEnds {
    /// Write end of the child's stdin.
    pub stdin: OwnedFd,
    /// Read end of the child's stdout.
    pub stdout: OwnedFd,
    /// Read end of the child's stderr.
    pub stderr: OwnedFd,
}

impl PipeSet {
    /// Create stdin, stdout and stderr pipes in that order. A failure drops
    /// (and so closes) the pipes already created.
    pub fn create(posix: &dyn Posix) -> io::Result<Self> {
        let stdin = Pipe::create(posix)?;
        let stdout = Pipe::create(posix)?;
        let stderr = Pipe::create(posix)?;
        debug!(
            stdin = ?(stdin.read.as_raw_fd(), stdin.write.as_raw_fd()),
            stdout = ?(stdout.read.as_raw_fd(), stdout.write.as_raw_fd()),
            stderr = ?(stderr.read.as_raw_fd(), stderr.write.as_raw_fd()),
            "created stdio pipes"
        );
        Ok(PipeSet {
            stdin,
            stdout,
            stderr,
        })
    }

    /// Descriptor remapping executed in the child: wire the child ends onto
    /// 0, 1 and 2, then close the parent ends.
    pub fn file_actions(&self) -> Vec<FileAction> {
        vec![
            FileAction::Dup2 {
                src: self.stdin.read.as_raw_fd(),
                dst: libc::STDIN_FILENO,
            },
            FileAction::Dup2 {
                src: self.stdout.write.as_raw_fd(),
                dst: libc::STDOUT_FILENO,
            },
            FileAction::Dup2 {
                src: self.stderr.write.as_raw_fd(),
                dst: libc::STDERR_FILENO,
            },
            FileAction::Close(self.stdin.write.as_raw_fd()),
            FileAction::Close(self.stdout.read.as_raw_fd()),
            FileAction::Close(self.stderr.read.as_raw_fd()),
        ]
    }

    /// Close the child's ends in the parent and hand back the rest.
    pub fn into_parent_ends(self) -> ParentEnds {
        let PipeSet {
            stdin,
            stdout,
            stderr,
        } = self;
        drop((stdin.read, stdout.write, stderr.write));
        ParentEnds {
            stdin: stdin.write,
            stdout: stdout.read,
            stderr: stderr.read,
        }
    }
}
