//! Readiness Multiplexer Module
//!
//! This module hides the OS readiness primitive (epoll, kqueue, ...) behind
//! a small interface so the event loop never polls sockets itself.
//!
//! ## Contract
//!
//! - **register**: start monitoring a socket under a [`Handle`]
//! - **reregister**: change the interest of a monitored socket
//! - **deregister**: stop monitoring a socket
//! - **poll**: block until at least one handle is ready or the timeout
//!   elapses, and report which handles are ready
//! - **close**: release the OS object (idempotent)
//!
//! The multiplexer is a pure notification source: it never reads, writes or
//! owns connection state.
//!
//! ## Modules
//!
//! - `poll`: the [`MioMultiplexer`] backed by `mio::Poll`
//!
//! The event loop is generic over [`Multiplexer`], so its dispatch logic can
//! be driven by a scripted implementation in tests.

pub mod poll;

pub use poll::MioMultiplexer;

use mio::event::Source;
use std::fmt;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Identifies a monitored socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(pub usize);

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<mio::Token> for Handle {
    fn from(token: mio::Token) -> Self {
        Handle(token.0)
    }
}

impl From<Handle> for mio::Token {
    fn from(handle: Handle) -> Self {
        mio::Token(handle.0)
    }
}

/// The readiness a handle is monitored for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interest {
    /// Readable only
    Read,
    /// Readable and writable (used while output is pending)
    ReadWrite,
}

impl From<Interest> for mio::Interest {
    fn from(interest: Interest) -> Self {
        match interest {
            Interest::Read => mio::Interest::READABLE,
            Interest::ReadWrite => mio::Interest::READABLE | mio::Interest::WRITABLE,
        }
    }
}

/// One handle reported ready by [`Multiplexer::poll`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadyEvent {
    /// The handle that is ready
    pub handle: Handle,
    /// Data (or EOF) can be read without blocking
    pub readable: bool,
    /// Data can be written without blocking
    pub writable: bool,
    /// The peer closed its side or the socket reported an error
    pub closed: bool,
}

impl ReadyEvent {
    /// A read-readiness event for `handle`.
    pub fn readable(handle: Handle) -> Self {
        Self {
            handle,
            readable: true,
            writable: false,
            closed: false,
        }
    }

    /// A write-readiness event for `handle`.
    pub fn writable(handle: Handle) -> Self {
        Self {
            handle,
            readable: false,
            writable: true,
            closed: false,
        }
    }
}

impl From<&mio::event::Event> for ReadyEvent {
    fn from(event: &mio::event::Event) -> Self {
        Self {
            handle: event.token().into(),
            readable: event.is_readable(),
            writable: event.is_writable(),
            closed: event.is_read_closed() || event.is_error(),
        }
    }
}

/// Errors raised by a multiplexer. Creation and registration failures are
/// fatal to the server; poll failures are not.
#[derive(Debug, Error)]
pub enum MultiplexerError {
    /// The OS readiness object could not be created
    #[error("failed to create readiness poller: {0}")]
    Create(#[source] io::Error),

    /// A socket could not be registered
    #[error("failed to register handle {handle}: {source}")]
    Register {
        handle: Handle,
        #[source]
        source: io::Error,
    },

    /// A socket could not be deregistered
    #[error("failed to deregister socket: {0}")]
    Deregister(#[source] io::Error),

    /// Waiting for readiness failed
    #[error("poll failed: {0}")]
    Poll(#[source] io::Error),

    /// The multiplexer has been closed
    #[error("multiplexer is closed")]
    Closed,
}

/// Wakes a blocked [`Multiplexer::poll`] from another thread.
pub trait Notify: Send + Sync {
    /// Makes the notifier's handle ready.
    fn notify(&self) -> io::Result<()>;
}

impl Notify for mio::Waker {
    fn notify(&self) -> io::Result<()> {
        self.wake()
    }
}

/// A source of readiness notifications.
pub trait Multiplexer {
    /// Starts monitoring `source` under `handle`.
    fn register<S>(
        &mut self,
        source: &mut S,
        handle: Handle,
        interest: Interest,
    ) -> Result<(), MultiplexerError>
    where
        S: Source + ?Sized;

    /// Changes the interest of an already registered `source`.
    fn reregister<S>(
        &mut self,
        source: &mut S,
        handle: Handle,
        interest: Interest,
    ) -> Result<(), MultiplexerError>
    where
        S: Source + ?Sized;

    /// Stops monitoring `source`.
    fn deregister<S>(&mut self, source: &mut S) -> Result<(), MultiplexerError>
    where
        S: Source + ?Sized;

    /// Blocks until a handle is ready or `timeout` elapses (`None` blocks
    /// indefinitely). An interrupted wait returns an empty list.
    fn poll(&mut self, timeout: Option<Duration>) -> Result<Vec<ReadyEvent>, MultiplexerError>;

    /// Creates a notifier that reports `handle` as readable when triggered.
    fn notifier(&mut self, handle: Handle) -> Result<Arc<dyn Notify>, MultiplexerError>;

    /// Releases the OS readiness object. Safe to call more than once.
    fn close(&mut self);
}
