// src/poll/mod.rs

//! Readiness notification for child stdio.
//!
//! - [`selector`] is a synchronous `mio` demultiplexer with
//!   register / reregister / deregister.
//! - [`async_io`] hands an endpoint to the tokio reactor.

pub mod async_io;
pub mod selector;

pub use async_io::AsyncEndpoint;
pub use selector::{Event, Selector};

pub use mio::{Interest, Token};
