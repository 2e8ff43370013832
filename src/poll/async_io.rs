// src/poll/async_io.rs

//! tokio integration: an [`Endpoint`] registered with the tokio reactor.

use std::io::{self, Read, Write};
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use tokio::io::unix::AsyncFd;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use crate::process::Endpoint;
use crate::types::Direction;

/// Non-blocking endpoint driven by tokio.
///
/// Dropping it (or calling [`AsyncEndpoint::into_inner`]) deregisters the
/// descriptor from the reactor. The descriptor stays in non-blocking mode.
#[derive(Debug)]
pub struct AsyncEndpoint {
    inner: AsyncFd<Endpoint>,
}

impl AsyncEndpoint {
    pub(crate) fn new(endpoint: Endpoint) -> io::Result<Self> {
        endpoint.set_nonblocking(true)?;
        let interest = match endpoint.direction() {
            Direction::Read => tokio::io::Interest::READABLE,
            Direction::Write => tokio::io::Interest::WRITABLE,
        };
        Ok(AsyncEndpoint {
            inner: AsyncFd::with_interest(endpoint, interest)?,
        })
    }

    pub fn get_ref(&self) -> &Endpoint {
        self.inner.get_ref()
    }

    pub fn into_inner(self) -> Endpoint {
        self.inner.into_inner()
    }
}

impl AsyncRead for AsyncEndpoint {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        // The reactor only watches the endpoint's own direction; the other
        // one would never become ready.
        self.inner.get_ref().expect_direction(Direction::Read)?;
        loop {
            let mut guard = ready!(self.inner.poll_read_ready(cx))?;
            let unfilled = buf.initialize_unfilled();
            match guard.try_io(|inner| inner.get_ref().read(unfilled)) {
                Ok(Ok(len)) => {
                    buf.advance(len);
                    return Poll::Ready(Ok(()));
                }
                Ok(Err(err)) => return Poll::Ready(Err(err)),
                Err(_would_block) => continue,
            }
        }
    }
}

impl AsyncWrite for AsyncEndpoint {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.inner.get_ref().expect_direction(Direction::Write)?;
        loop {
            let mut guard = ready!(self.inner.poll_write_ready(cx))?;
            match guard.try_io(|inner| inner.get_ref().write(buf)) {
                Ok(result) => return Poll::Ready(result),
                Err(_would_block) => continue,
            }
        }
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    /// A pipe cannot be half-closed in place; drop the endpoint to send EOF.
    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}
