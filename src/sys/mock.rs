// src/sys/mock.rs

use std::io;
use std::os::fd::{AsRawFd, BorrowedFd, OwnedFd, RawFd};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use nix::errno::Errno;
use nix::sys::signal::Signal;

use super::{FileAction, Posix, RealPosix, SpawnAttributes, SpawnRequest};

/// What the mock saw of the last spawn request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedSpawn {
    pub program: String,
    pub argv: Vec<String>,
    pub envp: Vec<String>,
    pub actions: Vec<FileAction>,
    pub attributes: SpawnAttributes,
}

#[derive(Debug, Default)]
struct MockState {
    pipe_calls: usize,
    fail_pipe_at: Option<(usize, i32)>,
    spawn_error: Option<i32>,
    spawns: Vec<RecordedSpawn>,
    wait_calls: usize,
    kills: Vec<(i32, Option<Signal>)>,
    kills_at_reap: Option<usize>,
    issued_fds: Vec<RawFd>,
    current_dir: Option<PathBuf>,
}

/// Recording, fault-injecting [`Posix`] implementation.
///
/// Calls that are not told to fail are forwarded to [`RealPosix`], so a
/// child spawned through the mock is a real process.
#[derive(Debug, Clone, Default)]
pub struct MockPosix {
    real: RealPosix,
    state: Arc<Mutex<MockState>>,
}

impl MockPosix {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make the `nth` pipe call (1-based) fail with `errno`.
    pub fn fail_pipe_at(&self, nth: usize, errno: i32) {
        self.state().fail_pipe_at = Some((nth, errno));
    }

    /// Make every spawn fail with `errno` without creating a process.
    pub fn fail_spawn(&self, errno: i32) {
        self.state().spawn_error = Some(errno);
    }

    /// Answer `current_dir` with `dir` instead of asking the OS.
    pub fn set_current_dir(&self, dir: impl Into<PathBuf>) {
        self.state().current_dir = Some(dir.into());
    }

    pub fn pipe_calls(&self) -> usize {
        self.state().pipe_calls
    }

    /// Number of reap attempts, successful or not.
    pub fn wait_calls(&self) -> usize {
        self.state().wait_calls
    }

    pub fn spawns(&self) -> Vec<RecordedSpawn> {
        self.state().spawns.clone()
    }

    pub fn kills(&self) -> Vec<(i32, Option<Signal>)> {
        self.state().kills.clone()
    }

    /// How many signals had been sent when a child was successfully reaped.
    pub fn kills_at_reap(&self) -> Option<usize> {
        self.state().kills_at_reap
    }

    /// Every descriptor number handed out by `pipe` or `dup_above`.
    pub fn issued_fds(&self) -> Vec<RawFd> {
        self.state().issued_fds.clone()
    }
}

impl Posix for MockPosix {
    fn pipe(&self) -> io::Result<(OwnedFd, OwnedFd)> {
        let mut state = self.state();
        state.pipe_calls += 1;
        if let Some((nth, errno)) = state.fail_pipe_at {
            if nth == state.pipe_calls {
                return Err(io::Error::from_raw_os_error(errno));
            }
        }
        let (read, write) = self.real.pipe()?;
        state.issued_fds.push(read.as_raw_fd());
        state.issued_fds.push(write.as_raw_fd());
        Ok((read, write))
    }

    fn dup_above(&self, fd: BorrowedFd<'_>, min: RawFd) -> io::Result<OwnedFd> {
        let dup = self.real.dup_above(fd, min)?;
        self.state().issued_fds.push(dup.as_raw_fd());
        Ok(dup)
    }

    fn spawnp(&self, request: &SpawnRequest<'_>) -> io::Result<i32> {
        let lossy = |s: &std::ffi::CStr| s.to_string_lossy().into_owned();
        let spawn_error = {
            let mut state = self.state();
            state.spawns.push(RecordedSpawn {
                program: lossy(request.program),
                argv: request.argv.iter().map(|a| lossy(a.as_c_str())).collect(),
                envp: request.envp.iter().map(|e| lossy(e.as_c_str())).collect(),
                actions: request.actions.to_vec(),
                attributes: request.attributes,
            });
            state.spawn_error
        };
        match spawn_error {
            Some(errno) => Err(io::Error::from_raw_os_error(errno)),
            None => self.real.spawnp(request),
        }
    }

    fn wait_exited(&self, pid: i32) -> io::Result<()> {
        self.real.wait_exited(pid)
    }

    fn reap(&self, pid: i32) -> io::Result<Option<i32>> {
        // Held across the real call so a reap and a kill are never
        // recorded out of order.
        let mut state = self.state();
        state.wait_calls += 1;
        let reaped = self.real.reap(pid)?;
        if reaped.is_some() {
            state.kills_at_reap = Some(state.kills.len());
        }
        Ok(reaped)
    }

    fn kill(&self, pid: i32, signal: Option<Signal>) -> Result<(), Errno> {
        let mut state = self.state();
        state.kills.push((pid, signal));
        self.real.kill(pid, signal)
    }

    fn current_dir(&self) -> io::Result<PathBuf> {
        match self.state().current_dir.clone() {
            Some(dir) => Ok(dir),
            None => self.real.current_dir(),
        }
    }
}
