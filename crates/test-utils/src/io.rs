//! Deadline-bounded reads from child endpoints.
//!
//! Tests must never hang on a child that misbehaves, so these helpers switch
//! the endpoint to non-blocking mode and drive it through a `Selector`.

use std::io::{ErrorKind, Read};
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use pipespawn::{Endpoint, Selector, Token};

/// Read until EOF or until `deadline` elapses (an error).
pub fn read_to_end_with_deadline(endpoint: &Endpoint, deadline: Duration) -> Result<Vec<u8>> {
    read_until(endpoint, None, deadline)
}

/// Read until at least `len` bytes arrived, EOF, or `deadline` elapses.
pub fn read_at_least(endpoint: &Endpoint, len: usize, deadline: Duration) -> Result<Vec<u8>> {
    read_until(endpoint, Some(len), deadline)
}

fn read_until(endpoint: &Endpoint, want: Option<usize>, deadline: Duration) -> Result<Vec<u8>> {
    endpoint.set_nonblocking(true)?;
    let selector = Selector::new()?;
    endpoint.register(&selector, Token(0))?;

    let result = drive(endpoint, &selector, want, deadline);
    endpoint.deregister(&selector)?;
    endpoint.set_nonblocking(false)?;
    result
}

fn drive(
    endpoint: &Endpoint,
    selector: &Selector,
    want: Option<usize>,
    deadline: Duration,
) -> Result<Vec<u8>> {
    let started = Instant::now();
    let mut out = Vec::new();
    let mut buf = [0u8; 4096];
    let mut reader = endpoint;

    loop {
        let remaining = deadline.checked_sub(started.elapsed()).ok_or_else(|| {
            anyhow!(
                "timed out after {deadline:?} with {} bytes read: {:?}",
                out.len(),
                String::from_utf8_lossy(&out)
            )
        })?;

        match selector.select(Some(remaining)) {
            Ok(events) if events.is_empty() => continue,
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }

        loop {
            match reader.read(&mut buf) {
                Ok(0) => return Ok(out),
                Ok(n) => {
                    out.extend_from_slice(&buf[..n]);
                    if want.is_some_and(|len| out.len() >= len) {
                        return Ok(out);
                    }
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }
}
