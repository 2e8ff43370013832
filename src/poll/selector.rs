// src/poll/selector.rs

//! A small readiness demultiplexer on top of `mio`.
//!
//! The selector never owns descriptors: it registers raw descriptor numbers
//! through [`mio::unix::SourceFd`], so a source must stay open while it is
//! registered and should be deregistered before it is closed.
//!
//! Readiness is edge-triggered, as with `mio` generally: after an event,
//! read or write until `WouldBlock` before selecting again.

use std::collections::BTreeMap;
use std::io;
use std::os::fd::{AsFd, AsRawFd, RawFd};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use mio::unix::SourceFd;
use mio::{Events, Interest, Poll, Registry, Token};
use tracing::trace;

const EVENTS_CAPACITY: usize = 64;

/// Readiness reported for one registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    token: Token,
    readable: bool,
    writable: bool,
    read_closed: bool,
    write_closed: bool,
    error: bool,
}

impl Event {
    fn from_mio(event: &mio::event::Event) -> Self {
        Event {
            token: event.token(),
            readable: event.is_readable(),
            writable: event.is_writable(),
            read_closed: event.is_read_closed(),
            write_closed: event.is_write_closed(),
            error: event.is_error(),
        }
    }

    pub fn token(&self) -> Token {
        self.token
    }

    /// Data is available, or the write side is gone and a read will
    /// return EOF.
    pub fn is_readable(&self) -> bool {
        self.readable || self.read_closed
    }

    pub fn is_writable(&self) -> bool {
        self.writable
    }

    /// The peer closed its end of the pipe.
    pub fn is_hangup(&self) -> bool {
        self.read_closed || self.write_closed
    }

    /// Error condition, e.g. a write end whose reader went away.
    pub fn is_error(&self) -> bool {
        self.error
    }
}

#[derive(Debug)]
pub struct Selector {
    poll: Mutex<Poll>,
    registry: Registry,
    // kqueue accepts a second add and a modify of an unknown descriptor
    // silently; this map keeps the register/reregister errors uniform.
    registrations: Mutex<BTreeMap<RawFd, Token>>,
}

impl Selector {
    pub fn new() -> io::Result<Self> {
        let poll = Poll::new()?;
        let registry = poll.registry().try_clone()?;
        Ok(Selector {
            poll: Mutex::new(poll),
            registry,
            registrations: Mutex::new(BTreeMap::new()),
        })
    }

    fn registrations(&self) -> MutexGuard<'_, BTreeMap<RawFd, Token>> {
        self.registrations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Fails with `AlreadyExists` if the descriptor is registered already.
    pub fn register(&self, source: &impl AsFd, token: Token, interest: Interest) -> io::Result<()> {
        let fd = source.as_fd().as_raw_fd();
        let mut registrations = self.registrations();
        if registrations.contains_key(&fd) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("descriptor {fd} is already registered"),
            ));
        }
        self.registry
            .register(&mut SourceFd(&fd), token, interest)?;
        registrations.insert(fd, token);
        trace!(fd, ?token, ?interest, "registered");
        Ok(())
    }

    /// Replace token and interest. Fails with `NotFound` if the descriptor
    /// is not registered.
    pub fn reregister(
        &self,
        source: &impl AsFd,
        token: Token,
        interest: Interest,
    ) -> io::Result<()> {
        let fd = source.as_fd().as_raw_fd();
        let mut registrations = self.registrations();
        match registrations.get_mut(&fd) {
            Some(registered) => {
                self.registry
                    .reregister(&mut SourceFd(&fd), token, interest)?;
                *registered = token;
                trace!(fd, ?token, ?interest, "reregistered");
                Ok(())
            }
            None => Err(not_registered(fd)),
        }
    }

    pub fn deregister(&self, source: &impl AsFd) -> io::Result<()> {
        let fd = source.as_fd().as_raw_fd();
        let mut registrations = self.registrations();
        if !registrations.contains_key(&fd) {
            return Err(not_registered(fd));
        }
        self.registry.deregister(&mut SourceFd(&fd))?;
        registrations.remove(&fd);
        trace!(fd, "deregistered");
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.registrations().len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations().is_empty()
    }

    /// Wait until at least one registration is ready or `timeout` elapses
    /// (`None` waits indefinitely). An interrupted wait is returned as
    /// `ErrorKind::Interrupted` rather than retried.
    ///
    /// Only one thread selects at a time; registration from other threads
    /// does not wait for a running select.
    pub fn select(&self, timeout: Option<Duration>) -> io::Result<Vec<Event>> {
        let mut poll = self.poll.lock().unwrap_or_else(PoisonError::into_inner);
        let mut events = Events::with_capacity(EVENTS_CAPACITY);
        poll.poll(&mut events, timeout)?;

        let events: Vec<Event> = events.iter().map(Event::from_mio).collect();
        trace!(ready = events.len(), "select returned");
        Ok(events)
    }
}

fn not_registered(fd: RawFd) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("descriptor {fd} is not registered"),
    )
}
