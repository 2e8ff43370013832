// src/sys/mod.rs

//! Narrow seam over the POSIX primitives the launcher needs.
//!
//! Everything the spawn protocol and the process handle do to the operating
//! system goes through [`Posix`]. Production code uses [`RealPosix`], a thin
//! layer over `libc`/`nix`; tests can swap in [`mock::MockPosix`] to inject
//! failures and count calls while still running real processes.
//!
//! Closing a descriptor is not part of the trait: descriptors travel as
//! `OwnedFd` and are closed when dropped.

use std::ffi::{CStr, CString};
use std::fmt::Debug;
use std::io;
use std::mem::MaybeUninit;
use std::os::fd::{AsRawFd, BorrowedFd, FromRawFd, OwnedFd, RawFd};
use std::path::PathBuf;
use std::ptr;

use nix::errno::Errno;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;

pub mod mock;

/// One step executed in the child between creation and `exec`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileAction {
    /// `dup2(src, dst)`.
    Dup2 { src: RawFd, dst: RawFd },
    Close(RawFd),
    /// Change directory before the program starts.
    Chdir(CString),
}

/// Attributes applied to the child as part of the spawn call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpawnAttributes {
    /// Make the child the leader of a new process group.
    pub process_group: bool,
    /// Empty signal mask and SIGPIPE back to its default disposition.
    pub reset_signals: bool,
}

impl Default for SpawnAttributes {
    fn default() -> Self {
        SpawnAttributes {
            process_group: true,
            reset_signals: true,
        }
    }
}

/// Everything `posix_spawnp` needs, already encoded as C strings.
#[derive(Debug)]
pub struct SpawnRequest<'a> {
    pub program: &'a CStr,
    pub argv: &'a [CString],
    pub envp: &'a [CString],
    pub actions: &'a [FileAction],
    pub attributes: SpawnAttributes,
}

/// Abstract system-call layer.
pub trait Posix: Send + Sync + Debug {
    /// Create a close-on-exec pipe, returning `(read_end, write_end)`.
    fn pipe(&self) -> io::Result<(OwnedFd, OwnedFd)>;

    /// Duplicate `fd` onto the lowest free descriptor `>= min`, close-on-exec.
    fn dup_above(&self, fd: BorrowedFd<'_>, min: RawFd) -> io::Result<OwnedFd>;

    /// Atomically create a child running `request.program`, resolved via
    /// `PATH`, after applying the file actions in order.
    fn spawnp(&self, request: &SpawnRequest<'_>) -> io::Result<i32>;

    /// Block until `pid` has exited, leaving it unreaped (a zombie whose pid
    /// cannot be reused).
    fn wait_exited(&self, pid: i32) -> io::Result<()>;

    /// Reap `pid` if it has exited (`waitpid` with `WNOHANG`). `Ok(None)`
    /// while it is still running.
    fn reap(&self, pid: i32) -> io::Result<Option<i32>>;

    /// Deliver `signal`, or only check that `pid` exists when `None`. A
    /// negative pid addresses the process group `-pid`.
    fn kill(&self, pid: i32, signal: Option<Signal>) -> Result<(), Errno>;

    fn current_dir(&self) -> io::Result<PathBuf>;
}

/// The real thing.
#[derive(Debug, Clone, Copy, Default)]
pub struct RealPosix;

#[cfg(any(target_os = "linux", target_os = "macos"))]
unsafe extern "C" {
    fn posix_spawn_file_actions_addchdir_np(
        file_actions: *mut libc::posix_spawn_file_actions_t,
        path: *const libc::c_char,
    ) -> libc::c_int;
}

fn cvt(ret: libc::c_int) -> io::Result<libc::c_int> {
    if ret == -1 {
        Err(io::Error::last_os_error())
    } else {
        Ok(ret)
    }
}

/// The `posix_spawn*` family reports errors as return values, not errno.
fn cvt_nz(ret: libc::c_int) -> io::Result<()> {
    if ret == 0 {
        Ok(())
    } else {
        Err(io::Error::from_raw_os_error(ret))
    }
}

struct FileActionsGuard<'a>(&'a mut MaybeUninit<libc::posix_spawn_file_actions_t>);

impl Drop for FileActionsGuard<'_> {
    fn drop(&mut self) {
        // SAFETY: only constructed after a successful init.
        unsafe {
            libc::posix_spawn_file_actions_destroy(self.0.as_mut_ptr());
        }
    }
}

struct SpawnAttrGuard<'a>(&'a mut MaybeUninit<libc::posix_spawnattr_t>);

impl Drop for SpawnAttrGuard<'_> {
    fn drop(&mut self) {
        // SAFETY: only constructed after a successful init.
        unsafe {
            libc::posix_spawnattr_destroy(self.0.as_mut_ptr());
        }
    }
}

#[cfg(any(target_os = "linux", target_os = "macos"))]
unsafe fn add_chdir(
    actions: *mut libc::posix_spawn_file_actions_t,
    path: &CStr,
) -> io::Result<()> {
    // SAFETY: caller passes an initialised file-actions object.
    cvt_nz(unsafe { posix_spawn_file_actions_addchdir_np(actions, path.as_ptr()) })
}

#[cfg(not(any(target_os = "linux", target_os = "macos")))]
unsafe fn add_chdir(
    _actions: *mut libc::posix_spawn_file_actions_t,
    _path: &CStr,
) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "spawn-time working directory is not supported on this platform",
    ))
}

#[cfg(any(
    target_os = "linux",
    target_os = "android",
    target_os = "freebsd",
    target_os = "netbsd",
    target_os = "openbsd",
    target_os = "dragonfly"
))]
fn cloexec_pipe() -> io::Result<(OwnedFd, OwnedFd)> {
    let mut fds: [libc::c_int; 2] = [-1, -1];
    // SAFETY: `fds` has room for the two descriptors.
    cvt(unsafe { libc::pipe2(fds.as_mut_ptr(), libc::O_CLOEXEC) })?;
    // SAFETY: pipe2 succeeded, both descriptors are fresh and ours.
    Ok(unsafe { (OwnedFd::from_raw_fd(fds[0]), OwnedFd::from_raw_fd(fds[1])) })
}

#[cfg(not(any(
    target_os = "linux",
    target_os = "android",
    target_os = "freebsd",
    target_os = "netbsd",
    target_os = "openbsd",
    target_os = "dragonfly"
)))]
fn cloexec_pipe() -> io::Result<(OwnedFd, OwnedFd)> {
    let mut fds: [libc::c_int; 2] = [-1, -1];
    // SAFETY: `fds` has room for the two descriptors.
    cvt(unsafe { libc::pipe(fds.as_mut_ptr()) })?;
    // SAFETY: pipe succeeded, both descriptors are fresh and ours.
    let (read, write) = unsafe { (OwnedFd::from_raw_fd(fds[0]), OwnedFd::from_raw_fd(fds[1])) };
    for fd in [&read, &write] {
        // SAFETY: fd is open for the duration of the call.
        cvt(unsafe { libc::fcntl(fd.as_raw_fd(), libc::F_SETFD, libc::FD_CLOEXEC) })?;
    }
    Ok((read, write))
}

fn null_terminated(strings: &[CString]) -> Vec<*mut libc::c_char> {
    strings
        .iter()
        .map(|s| s.as_ptr() as *mut libc::c_char)
        .chain(std::iter::once(ptr::null_mut()))
        .collect()
}

impl Posix for RealPosix {
    fn pipe(&self) -> io::Result<(OwnedFd, OwnedFd)> {
        cloexec_pipe()
    }

    fn dup_above(&self, fd: BorrowedFd<'_>, min: RawFd) -> io::Result<OwnedFd> {
        // SAFETY: `fd` is borrowed and therefore open.
        let new_fd = cvt(unsafe { libc::fcntl(fd.as_raw_fd(), libc::F_DUPFD_CLOEXEC, min) })?;
        // SAFETY: F_DUPFD_CLOEXEC returned a fresh descriptor we now own.
        Ok(unsafe { OwnedFd::from_raw_fd(new_fd) })
    }

    fn spawnp(&self, request: &SpawnRequest<'_>) -> io::Result<i32> {
        let argv = null_terminated(request.argv);
        let envp = null_terminated(request.envp);

        let mut raw_actions = MaybeUninit::uninit();
        // SAFETY: init writes a valid object into the uninitialised slot.
        cvt_nz(unsafe { libc::posix_spawn_file_actions_init(raw_actions.as_mut_ptr()) })?;
        let mut actions = FileActionsGuard(&mut raw_actions);

        for action in request.actions {
            // SAFETY: the file-actions object is initialised and the
            // descriptors/paths outlive the spawn call.
            unsafe {
                match action {
                    FileAction::Dup2 { src, dst } => cvt_nz(
                        libc::posix_spawn_file_actions_adddup2(actions.0.as_mut_ptr(), *src, *dst),
                    )?,
                    FileAction::Close(fd) => cvt_nz(libc::posix_spawn_file_actions_addclose(
                        actions.0.as_mut_ptr(),
                        *fd,
                    ))?,
                    FileAction::Chdir(path) => add_chdir(actions.0.as_mut_ptr(), path)?,
                }
            }
        }

        let mut raw_attrs = MaybeUninit::uninit();
        // SAFETY: init writes a valid object into the uninitialised slot.
        cvt_nz(unsafe { libc::posix_spawnattr_init(raw_attrs.as_mut_ptr()) })?;
        let mut attrs = SpawnAttrGuard(&mut raw_attrs);

        let mut flags = 0;
        // SAFETY: the attribute object is initialised; the signal sets are
        // initialised by sigemptyset before use.
        unsafe {
            if request.attributes.process_group {
                cvt_nz(libc::posix_spawnattr_setpgroup(attrs.0.as_mut_ptr(), 0))?;
                flags |= libc::POSIX_SPAWN_SETPGROUP;
            }

            if request.attributes.reset_signals {
                let mut set = MaybeUninit::<libc::sigset_t>::uninit();
                cvt(libc::sigemptyset(set.as_mut_ptr()))?;
                cvt_nz(libc::posix_spawnattr_setsigmask(attrs.0.as_mut_ptr(), set.as_ptr()))?;
                cvt(libc::sigaddset(set.as_mut_ptr(), libc::SIGPIPE))?;
                cvt_nz(libc::posix_spawnattr_setsigdefault(attrs.0.as_mut_ptr(), set.as_ptr()))?;
                flags |= libc::POSIX_SPAWN_SETSIGMASK | libc::POSIX_SPAWN_SETSIGDEF;
            }

            cvt_nz(libc::posix_spawnattr_setflags(
                attrs.0.as_mut_ptr(),
                flags as libc::c_short,
            ))?;
        }

        let mut pid: libc::pid_t = 0;
        // SAFETY: every pointer refers to a live, NUL-terminated buffer or
        // an initialised spawn object owned by this frame.
        cvt_nz(unsafe {
            libc::posix_spawnp(
                &mut pid,
                request.program.as_ptr(),
                actions.0.as_ptr(),
                attrs.0.as_ptr(),
                argv.as_ptr(),
                envp.as_ptr(),
            )
        })?;

        Ok(pid)
    }

    fn wait_exited(&self, pid: i32) -> io::Result<()> {
        let mut info = MaybeUninit::<libc::siginfo_t>::zeroed();
        // SAFETY: `info` is a valid out-pointer; WNOWAIT leaves the child
        // waitable.
        cvt(unsafe {
            libc::waitid(
                libc::P_PID,
                pid as libc::id_t,
                info.as_mut_ptr(),
                libc::WEXITED | libc::WNOWAIT,
            )
        })?;
        Ok(())
    }

    fn reap(&self, pid: i32) -> io::Result<Option<i32>> {
        let mut status: libc::c_int = 0;
        // SAFETY: `status` is a valid out-pointer.
        let ret = cvt(unsafe { libc::waitpid(pid, &mut status, libc::WNOHANG) })?;
        if ret == 0 {
            Ok(None)
        } else {
            Ok(Some(status))
        }
    }

    fn kill(&self, pid: i32, signal: Option<Signal>) -> Result<(), Errno> {
        signal::kill(Pid::from_raw(pid), signal)
    }

    fn current_dir(&self) -> io::Result<PathBuf> {
        std::env::current_dir()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::fd::AsFd;

    fn is_cloexec(fd: RawFd) -> bool {
        // SAFETY: plain flag query on a descriptor the test owns.
        let flags = unsafe { libc::fcntl(fd, libc::F_GETFD) };
        flags >= 0 && flags & libc::FD_CLOEXEC != 0
    }

    #[test]
    fn pipes_are_close_on_exec() {
        let (read, write) = RealPosix.pipe().unwrap();
        assert!(is_cloexec(read.as_raw_fd()));
        assert!(is_cloexec(write.as_raw_fd()));
    }

    #[test]
    fn dup_above_respects_minimum() {
        let (read, _write) = RealPosix.pipe().unwrap();
        let dup = RealPosix.dup_above(read.as_fd(), 100).unwrap();
        assert!(dup.as_raw_fd() >= 100);
        assert!(is_cloexec(dup.as_raw_fd()));
    }

    #[test]
    fn waiting_on_unknown_child_is_echild() {
        // pid 1 is never our child.
        let err = RealPosix.reap(1).unwrap_err();
        assert_eq!(err.raw_os_error(), Some(libc::ECHILD));
        let err = RealPosix.wait_exited(1).unwrap_err();
        assert_eq!(err.raw_os_error(), Some(libc::ECHILD));
    }
}
