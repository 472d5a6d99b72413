//! `mio`-backed Multiplexer
//!
//! Wraps a `mio::Poll` and its event buffer. Readiness from `mio` is
//! edge-triggered: a handle is reported once when it becomes ready, so
//! callers must drain a socket until it returns `WouldBlock`.

use crate::multiplexer::{Handle, Interest, Multiplexer, MultiplexerError, Notify, ReadyEvent};
use mio::event::Source;
use mio::{Events, Poll, Waker};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;

/// Longest single wait handed to the OS; longer timeouts just poll again.
const MAX_POLL_TIMEOUT: Duration = Duration::from_secs(3600);

/// A [`Multiplexer`] backed by the platform poller.
#[derive(Debug)]
pub struct MioMultiplexer {
    /// `None` once closed
    poll: Option<Poll>,
    events: Events,
}

impl MioMultiplexer {
    /// Creates a multiplexer whose event buffer holds `capacity` events
    /// per poll.
    pub fn new(capacity: usize) -> Result<Self, MultiplexerError> {
        let poll = Poll::new().map_err(MultiplexerError::Create)?;

        Ok(Self {
            poll: Some(poll),
            events: Events::with_capacity(capacity.max(1)),
        })
    }

    /// Returns true once [`Multiplexer::close`] has been called.
    pub fn is_closed(&self) -> bool {
        self.poll.is_none()
    }

    fn poller(&self) -> Result<&Poll, MultiplexerError> {
        self.poll.as_ref().ok_or(MultiplexerError::Closed)
    }
}

impl Multiplexer for MioMultiplexer {
    fn register<S>(
        &mut self,
        source: &mut S,
        handle: Handle,
        interest: Interest,
    ) -> Result<(), MultiplexerError>
    where
        S: Source + ?Sized,
    {
        self.poller()?
            .registry()
            .register(source, handle.into(), interest.into())
            .map_err(|e| MultiplexerError::Register { handle, source: e })
    }

    fn reregister<S>(
        &mut self,
        source: &mut S,
        handle: Handle,
        interest: Interest,
    ) -> Result<(), MultiplexerError>
    where
        S: Source + ?Sized,
    {
        self.poller()?
            .registry()
            .reregister(source, handle.into(), interest.into())
            .map_err(|e| MultiplexerError::Register { handle, source: e })
    }

    fn deregister<S>(&mut self, source: &mut S) -> Result<(), MultiplexerError>
    where
        S: Source + ?Sized,
    {
        self.poller()?
            .registry()
            .deregister(source)
            .map_err(MultiplexerError::Deregister)
    }

    fn poll(&mut self, timeout: Option<Duration>) -> Result<Vec<ReadyEvent>, MultiplexerError> {
        let poll = self.poll.as_mut().ok_or(MultiplexerError::Closed)?;
        let timeout = timeout.map(|t| t.min(MAX_POLL_TIMEOUT));

        match poll.poll(&mut self.events, timeout) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {
                trace!("Poll interrupted, no events this round");
                return Ok(Vec::new());
            }
            Err(e) => return Err(MultiplexerError::Poll(e)),
        }

        let ready: Vec<ReadyEvent> = self.events.iter().map(ReadyEvent::from).collect();
        trace!(events = ready.len(), "Poll returned");
        Ok(ready)
    }

    fn notifier(&mut self, handle: Handle) -> Result<Arc<dyn Notify>, MultiplexerError> {
        let waker = Waker::new(self.poller()?.registry(), handle.into())
            .map_err(|e| MultiplexerError::Register { handle, source: e })?;
        Ok(Arc::new(waker))
    }

    fn close(&mut self) {
        if self.poll.take().is_some() {
            trace!("Multiplexer closed");
        }
    }
}
