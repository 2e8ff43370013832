// src/process/endpoint.rs

//! Pollable wrapper around one of the child's stdio pipes.
//!
//! An [`Endpoint`] owns the parent's end of a pipe. It is the byte stream
//! itself (`Read` for the child's stdout/stderr, `Write` for its stdin) and
//! can be switched to non-blocking mode and registered with a
//! [`Selector`](crate::poll::Selector) or handed to tokio through
//! [`Endpoint::into_async`].
//!
//! Endpoints are not meant to be read or written from several threads at
//! once; share one behind a lock if you must.

use std::fs::File;
use std::io::{self, Read, Write};
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, OwnedFd, RawFd};

use mio::event::Source;
use mio::unix::SourceFd;
use mio::{Interest, Registry, Token};

use crate::poll::{AsyncEndpoint, Selector};
use crate::types::Direction;

#[derive(Debug)]
pub struct Endpoint {
    file: File,
    direction: Direction,
}

impl Endpoint {
    /// Wrap `fd` without copying or duplicating it. The descriptor starts in
    /// whatever blocking mode it already has.
    pub fn from_owned_fd(fd: OwnedFd, direction: Direction) -> Self {
        Endpoint {
            file: File::from(fd),
            direction,
        }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// The readiness this endpoint is normally polled for.
    pub fn interest(&self) -> Interest {
        Interest::from(self.direction)
    }

    pub fn set_nonblocking(&self, nonblocking: bool) -> io::Result<()> {
        let fd = self.as_raw_fd();
        // SAFETY: fcntl on a descriptor this endpoint owns.
        let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
        if flags < 0 {
            return Err(io::Error::last_os_error());
        }
        let wanted = if nonblocking {
            flags | libc::O_NONBLOCK
        } else {
            flags & !libc::O_NONBLOCK
        };
        if wanted != flags {
            // SAFETY: as above.
            if unsafe { libc::fcntl(fd, libc::F_SETFL, wanted) } < 0 {
                return Err(io::Error::last_os_error());
            }
        }
        Ok(())
    }

    pub fn is_nonblocking(&self) -> io::Result<bool> {
        // SAFETY: fcntl on a descriptor this endpoint owns.
        let flags = unsafe { libc::fcntl(self.as_raw_fd(), libc::F_GETFL) };
        if flags < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(flags & libc::O_NONBLOCK != 0)
    }

    /// Register with `selector` for this endpoint's natural interest.
    pub fn register(&self, selector: &Selector, token: Token) -> io::Result<()> {
        selector.register(self, token, self.interest())
    }

    pub fn reregister(&self, selector: &Selector, token: Token) -> io::Result<()> {
        selector.reregister(self, token, self.interest())
    }

    pub fn deregister(&self, selector: &Selector) -> io::Result<()> {
        selector.deregister(self)
    }

    /// Switch to non-blocking mode and register with the tokio reactor.
    /// Must be called from within a tokio runtime.
    pub fn into_async(self) -> io::Result<AsyncEndpoint> {
        AsyncEndpoint::new(self)
    }

    pub fn into_owned_fd(self) -> OwnedFd {
        OwnedFd::from(self.file)
    }

    pub(crate) fn expect_direction(&self, wanted: Direction) -> io::Result<()> {
        if self.direction == wanted {
            Ok(())
        } else {
            Err(io::Error::new(
                io::ErrorKind::Unsupported,
                format!("endpoint is {:?}-only", self.direction),
            ))
        }
    }
}

impl Read for &Endpoint {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.expect_direction(Direction::Read)?;
        (&self.file).read(buf)
    }
}

impl Read for Endpoint {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        (&*self).read(buf)
    }
}

impl Write for &Endpoint {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.expect_direction(Direction::Write)?;
        (&self.file).write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        // Pipes are unbuffered on our side.
        Ok(())
    }
}

impl Write for Endpoint {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        (&*self).write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        (&*self).flush()
    }
}

impl AsFd for Endpoint {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.file.as_fd()
    }
}

impl AsRawFd for Endpoint {
    fn as_raw_fd(&self) -> RawFd {
        self.file.as_raw_fd()
    }
}

/// Lets an endpoint join a caller-owned `mio::Poll` directly.
impl Source for Endpoint {
    fn register(&mut self, registry: &Registry, token: Token, interest: Interest) -> io::Result<()> {
        SourceFd(&self.as_raw_fd()).register(registry, token, interest)
    }

    fn reregister(
        &mut self,
        registry: &Registry,
        token: Token,
        interest: Interest,
    ) -> io::Result<()> {
        SourceFd(&self.as_raw_fd()).reregister(registry, token, interest)
    }

    fn deregister(&mut self, registry: &Registry) -> io::Result<()> {
        SourceFd(&self.as_raw_fd()).deregister(registry)
    }
}

impl From<Endpoint> for OwnedFd {
    fn from(endpoint: Endpoint) -> Self {
        endpoint.into_owned_fd()
    }
}
