// src/process/handle.rs

use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use nix::errno::Errno;
use nix::sys::signal::Signal;
use tracing::{debug, info};

use crate::errors::{ProcessError, Result};
use crate::process::Endpoint;
use crate::spawn::pipes::ParentEnds;
use crate::sys::Posix;
use crate::types::{Direction, ExitStatus};

/// A running (or reaped) child started by
/// [`ProcessBuilder::start`](crate::ProcessBuilder::start).
///
/// The handle owns the parent's ends of the three stdio pipes:
///
/// - [`stdin`](Self::stdin) is the parent's *write* side (the child's stdin),
/// - [`stdout`](Self::stdout) and [`stderr`](Self::stderr) are the parent's
///   *read* sides.
///
/// Lifecycle is `Running -> Terminated(status)`. The only transition is a
/// successful reap in [`wait`](Self::wait) or [`try_wait`](Self::try_wait);
/// afterwards both are pure reads of the captured status.
///
/// Reaping and signalling share a per-handle gate. Blocking waits sleep
/// outside it (the exited child stays a zombie until reaped), so the gate is
/// only ever held briefly. As a result the child is reaped at most once,
/// concurrent waiters all observe the same status, and no signal is sent
/// once the pid has been released.
///
/// Dropping the handle closes the descriptors. It neither kills nor reaps
/// the child.
#[derive(Debug)]
pub struct ChildProcess {
    pid: i32,
    process_group: bool,
    posix: Arc<dyn Posix>,
    stdin: Option<Endpoint>,
    stdout: Option<Endpoint>,
    stderr: Option<Endpoint>,
    status: OnceLock<ExitStatus>,
    reap_gate: Mutex<()>,
}

impl ChildProcess {
    pub(crate) fn new(
        posix: Arc<dyn Posix>,
        pid: i32,
        process_group: bool,
        ends: ParentEnds,
    ) -> Self {
        ChildProcess {
            pid,
            process_group,
            posix,
            stdin: Some(Endpoint::from_owned_fd(ends.stdin, Direction::Write)),
            stdout: Some(Endpoint::from_owned_fd(ends.stdout, Direction::Read)),
            stderr: Some(Endpoint::from_owned_fd(ends.stderr, Direction::Read)),
            status: OnceLock::new(),
            reap_gate: Mutex::new(()),
        }
    }

    pub fn id(&self) -> i32 {
        self.pid
    }

    /// Process group id, when the child was spawned as a group leader.
    pub fn process_group_id(&self) -> Option<i32> {
        self.process_group.then_some(self.pid)
    }

    pub fn stdin(&self) -> Option<&Endpoint> {
        self.stdin.as_ref()
    }

    pub fn stdout(&self) -> Option<&Endpoint> {
        self.stdout.as_ref()
    }

    pub fn stderr(&self) -> Option<&Endpoint> {
        self.stderr.as_ref()
    }

    pub fn stdin_mut(&mut self) -> Option<&mut Endpoint> {
        self.stdin.as_mut()
    }

    pub fn stdout_mut(&mut self) -> Option<&mut Endpoint> {
        self.stdout.as_mut()
    }

    pub fn stderr_mut(&mut self) -> Option<&mut Endpoint> {
        self.stderr.as_mut()
    }

    /// Move the stdin endpoint out. Dropping it delivers EOF to the child.
    pub fn take_stdin(&mut self) -> Option<Endpoint> {
        self.stdin.take()
    }

    pub fn take_stdout(&mut self) -> Option<Endpoint> {
        self.stdout.take()
    }

    pub fn take_stderr(&mut self) -> Option<Endpoint> {
        self.stderr.take()
    }

    fn gate(&self) -> MutexGuard<'_, ()> {
        self.reap_gate
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Block until the child terminates and return its status.
    ///
    /// Once a status has been captured this returns it without a system
    /// call. There is no timeout: combine [`kill`](Self::kill) with your own
    /// timer, or poll [`try_wait`](Self::try_wait).
    pub fn wait(&self) -> Result<ExitStatus> {
        loop {
            if let Some(status) = self.status.get() {
                return Ok(*status);
            }

            debug!(pid = self.pid, "waiting for child to exit");
            let exited = self.posix.wait_exited(self.pid);

            let _gate = self.gate();
            // A concurrent waiter may have reaped it first, in which case
            // `exited` can be ECHILD.
            if let Some(status) = self.status.get() {
                return Ok(*status);
            }
            exited?;
            if let Some(raw) = self.posix.reap(self.pid)? {
                return Ok(self.record(raw));
            }
        }
    }

    /// Reap the child if it has already exited, without blocking.
    pub fn try_wait(&self) -> Result<Option<ExitStatus>> {
        if let Some(status) = self.status.get() {
            return Ok(Some(*status));
        }

        let _gate = self.gate();
        if let Some(status) = self.status.get() {
            return Ok(Some(*status));
        }

        match self.posix.reap(self.pid)? {
            Some(raw) => Ok(Some(self.record(raw))),
            None => Ok(None),
        }
    }

    fn record(&self, raw: i32) -> ExitStatus {
        let status = ExitStatus::from_raw(raw);
        // Only ever reached while holding the reap gate with no status set.
        let _ = self.status.set(status);
        info!(pid = self.pid, %status, "child reaped");
        status
    }

    /// The captured status, or [`ProcessError::NotTerminated`] if the child
    /// has not been reaped yet. Never blocks and makes no system call.
    pub fn exit_value(&self) -> Result<ExitStatus> {
        self.status
            .get()
            .copied()
            .ok_or(ProcessError::NotTerminated { pid: self.pid })
    }

    pub fn is_terminated(&self) -> bool {
        self.status.get().is_some()
    }

    /// Send SIGKILL to the child.
    pub fn kill(&self) -> std::result::Result<(), Errno> {
        self.signal(Signal::SIGKILL)
    }

    /// Send `signal` to the child.
    ///
    /// The platform result is returned as-is: `Err(ESRCH)` for a child that
    /// already exited is normal. Once the child has been reaped its pid may
    /// belong to someone else, so this returns `Err(ESRCH)` without
    /// signalling anything. The check and the signal happen under the reap
    /// gate, so this holds with waiters on other threads too.
    pub fn signal(&self, signal: Signal) -> std::result::Result<(), Errno> {
        self.deliver(self.pid, signal)
    }

    /// Send SIGKILL to the child's whole process group.
    pub fn kill_process_group(&self) -> std::result::Result<(), Errno> {
        self.signal_process_group(Signal::SIGKILL)
    }

    /// Send `signal` to `-pid`, i.e. the process group led by the child.
    /// Only meaningful when the builder placed the child in its own group
    /// (the default).
    pub fn signal_process_group(&self, signal: Signal) -> std::result::Result<(), Errno> {
        self.deliver(-self.pid, signal)
    }

    fn deliver(&self, target: i32, signal: Signal) -> std::result::Result<(), Errno> {
        let _gate = self.gate();
        if self.is_terminated() {
            debug!(pid = self.pid, ?signal, "child already reaped; not signalling");
            return Err(Errno::ESRCH);
        }
        let result = self.posix.kill(target, Some(signal));
        match result {
            Ok(()) => debug!(pid = self.pid, target, ?signal, "signal delivered"),
            Err(errno) => debug!(pid = self.pid, target, ?signal, %errno, "signal not delivered"),
        }
        result
    }
}

impl Drop for ChildProcess {
    fn drop(&mut self) {
        if !self.is_terminated() {
            debug!(pid = self.pid, "dropping handle of unreaped child");
        }
    }
}
