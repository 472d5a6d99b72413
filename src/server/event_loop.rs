//! The Event Loop
//!
//! One thread, one poller, many sockets. Each iteration of the loop:
//!
//! ```text
//!  ┌──────────────────────────────────────────────────────────┐
//!  │ 1. sweep expired keys if the interval has elapsed        │
//!  │ 2. poll, bounded by the time left until the next sweep   │
//!  │ 3. for each ready handle, in reported order, once:       │
//!  │      Listening  → accept until WouldBlock, register READ │
//!  │      Connected  → read, execute lines, write replies     │
//!  │      Waker      → nothing (shutdown is checked at 1)     │
//!  └──────────────────────────────────────────────────────────┘
//! ```
//!
//! A connection whose queued replies pass a fixed cap stops being read until
//! the client drains them, so a client that never reads cannot exhaust
//! memory.
//!
//! Every socket is non-blocking, so only the poll ever waits. Commands from
//! different clients and the sweep never overlap, which is why the cache
//! needs no locks.
//!
//! Fatal errors (a socket that cannot be registered, a closed poller) end
//! `start()`. Everything else is contained: a failed poll is retried, a
//! failed accept is logged, and a failed read or write closes only that
//! connection.

use crate::commands::CommandHandler;
use crate::connection::{Connection, ConnectionError, ConnectionRegistry, ConnectionStats};
use crate::multiplexer::{
    Handle, Interest, MioMultiplexer, Multiplexer, MultiplexerError, ReadyEvent,
};
use crate::server::{ServerConfig, ServerError, ShutdownHandle};
use crate::storage::{CacheStore, SweepTimer};
use mio::net::{TcpListener, TcpStream};
use std::collections::HashSet;
use std::io;
use std::net::SocketAddr;
use std::time::Instant;
use tracing::{debug, info, trace, warn};

/// Handle of the listening socket.
pub const LISTENER: Handle = Handle(0);

/// Handle of the shutdown waker.
pub const WAKER: Handle = Handle(1);

/// First handle given to a client connection.
const FIRST_CLIENT: usize = 2;

/// What a handle stands for in the event loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// The listening socket; readiness means connections are waiting
    Listening,
    /// The shutdown waker
    Waker,
    /// A client connection
    Connected,
}

/// Classifies a handle.
pub fn role_of(handle: Handle) -> Role {
    match handle {
        LISTENER => Role::Listening,
        WAKER => Role::Waker,
        _ => Role::Connected,
    }
}

/// The single-threaded cache server.
///
/// Owns the listener, the multiplexer, the command handler (and through it
/// the cache) and every client connection.
pub struct Server<M: Multiplexer = MioMultiplexer> {
    listener: TcpListener,
    local_addr: SocketAddr,
    multiplexer: M,
    handler: CommandHandler,
    connections: ConnectionRegistry,
    sweep: SweepTimer,
    stats: ConnectionStats,
    shutdown: ShutdownHandle,
}

impl Server<MioMultiplexer> {
    /// Binds the listener and creates the platform multiplexer.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use sweepkv::server::{Server, ServerConfig};
    /// use sweepkv::storage::CacheStore;
    ///
    /// let mut server = Server::bind(&ServerConfig::default(), CacheStore::new())?;
    /// server.start()?;
    /// # Ok::<(), sweepkv::server::ServerError>(())
    /// ```
    pub fn bind(config: &ServerConfig, cache: CacheStore) -> Result<Self, ServerError> {
        let multiplexer = MioMultiplexer::new(config.max_connections)?;
        Self::with_multiplexer(config, cache, multiplexer)
    }
}

impl<M: Multiplexer> Server<M> {
    /// Binds the listener and registers it with `multiplexer`.
    pub fn with_multiplexer(
        config: &ServerConfig,
        cache: CacheStore,
        mut multiplexer: M,
    ) -> Result<Self, ServerError> {
        let addr = config.socket_addr()?;
        let mut listener =
            TcpListener::bind(addr).map_err(|e| ServerError::Bind { addr, source: e })?;
        let local_addr = listener.local_addr()?;

        multiplexer.register(&mut listener, LISTENER, Interest::Read)?;
        let notifier = multiplexer.notifier(WAKER)?;

        Ok(Self {
            listener,
            local_addr,
            multiplexer,
            handler: CommandHandler::new(cache),
            connections: ConnectionRegistry::new(FIRST_CLIENT),
            sweep: SweepTimer::new(config.sweep_interval),
            stats: ConnectionStats::new(),
            shutdown: ShutdownHandle::new(notifier),
        })
    }

    /// Returns the address the listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Returns a handle that stops [`start`](Server::start) from another thread.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Returns connection statistics.
    pub fn stats(&self) -> &ConnectionStats {
        &self.stats
    }

    /// Returns the cache store.
    pub fn cache(&self) -> &CacheStore {
        self.handler.cache()
    }

    /// Number of connected clients.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Runs the event loop until a fatal error occurs or shutdown is
    /// requested.
    ///
    /// All client connections are closed and the multiplexer released
    /// before this returns.
    pub fn start(&mut self) -> Result<(), ServerError> {
        info!(
            address = %self.local_addr,
            sweep_ms = self.sweep.interval().as_millis() as u64,
            "Event loop started"
        );

        let result = loop {
            if self.shutdown.is_requested() {
                info!("Shutdown requested, stopping event loop");
                break Ok(());
            }
            if let Err(e) = self.turn() {
                break Err(e);
            }
        };

        self.close_all();
        result
    }

    /// Runs one iteration of the loop: sweep if due, poll once, dispatch.
    pub fn turn(&mut self) -> Result<(), ServerError> {
        self.sweep.run_if_due(self.handler.cache_mut(), Instant::now());
        let timeout = self.sweep.time_until_due(Instant::now());

        let events = match self.multiplexer.poll(Some(timeout)) {
            Ok(events) => events,
            Err(MultiplexerError::Closed) => return Err(MultiplexerError::Closed.into()),
            Err(e) => {
                warn!(error = %e, "Poll failed, retrying");
                return Ok(());
            }
        };

        let mut serviced = HashSet::with_capacity(events.len());
        for event in events {
            // Readiness that arrives again mid-cycle is picked up by the next poll
            if !serviced.insert(event.handle) {
                continue;
            }

            match role_of(event.handle) {
                Role::Listening => self.accept_pending()?,
                Role::Waker => trace!("Event loop woken"),
                Role::Connected => self.service(event),
            }
        }

        Ok(())
    }

    /// Accepts every pending connection.
    ///
    /// Readiness is edge-triggered, so the backlog is drained past errors
    /// that concern a single connection. Anything else (e.g. out of file
    /// descriptors) ends this round.
    fn accept_pending(&mut self) -> Result<(), ServerError> {
        loop {
            match self.listener.accept() {
                Ok((stream, addr)) => self.admit(stream, addr)?,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(()),
                Err(e) if is_per_connection_accept_error(&e) => {
                    debug!(error = %e, "Pending connection failed before accept");
                }
                Err(e) => {
                    warn!(error = %e, "Failed to accept connection");
                    return Ok(());
                }
            }
        }
    }

    /// Tracks a freshly accepted stream and registers it for reads.
    fn admit(&mut self, stream: TcpStream, addr: SocketAddr) -> Result<(), ServerError> {
        let conn = self.connections.insert(stream, addr);
        let handle = conn.handle();

        if let Err(e) = self
            .multiplexer
            .register(conn.stream_mut(), handle, Interest::Read)
        {
            self.connections.remove(handle);
            return Err(e.into());
        }

        self.stats.connection_opened();
        info!(
            client = %addr,
            handle = %handle,
            active = self.connections.len(),
            "Client connected"
        );
        Ok(())
    }

    /// Services one readiness event on a client handle.
    fn service(&mut self, event: ReadyEvent) {
        let handle = event.handle;

        let result = match self.connections.get_mut(handle) {
            Some(conn) => drive(conn, &mut self.handler, &mut self.stats, event)
                .and_then(|()| update_interest(&mut self.multiplexer, conn)),
            None => {
                trace!(handle = %handle, "Event for closed connection ignored");
                return;
            }
        };

        if let Err(e) = result {
            self.close_connection(handle, &e);
        }
    }

    /// Deregisters and drops a connection.
    fn close_connection(&mut self, handle: Handle, reason: &ConnectionError) {
        let Some(mut conn) = self.connections.remove(handle) else {
            return;
        };

        if let Err(e) = self.multiplexer.deregister(conn.stream_mut()) {
            debug!(client = %conn.addr(), error = %e, "Deregister failed");
        }
        self.stats.connection_closed();

        match reason {
            ConnectionError::ClientDisconnected => {
                info!(client = %conn.addr(), active = self.connections.len(), "Client disconnected")
            }
            ConnectionError::IoError(io_err)
                if io_err.kind() == io::ErrorKind::ConnectionReset =>
            {
                debug!(client = %conn.addr(), "Connection reset by client")
            }
            _ => warn!(client = %conn.addr(), error = %reason, "Connection error"),
        }
    }

    /// Closes every connection and releases the multiplexer.
    fn close_all(&mut self) {
        for mut conn in self.connections.drain() {
            if let Err(e) = self.multiplexer.deregister(conn.stream_mut()) {
                debug!(client = %conn.addr(), error = %e, "Deregister failed");
            }
            self.stats.connection_closed();
            debug!(client = %conn.addr(), "Connection closed on shutdown");
        }
        self.multiplexer.close();

        let cache = self.handler.cache().stats();
        info!(
            connections = self.stats.connections_accepted,
            commands = self.stats.commands_processed,
            keys = cache.keys,
            expired = cache.expired,
            "Event loop stopped"
        );
    }
}

impl<M: Multiplexer> Drop for Server<M> {
    fn drop(&mut self) {
        self.multiplexer.close();
    }
}

/// Accept errors that only affect the connection being accepted.
fn is_per_connection_accept_error(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::Interrupted
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
    )
}

/// Reads, executes and writes for one connection.
///
/// Lines are executed only while queued output stays under
/// [`MAX_PENDING_OUTPUT`](crate::connection::MAX_PENDING_OUTPUT). Past that
/// the connection stops reading and is resumed by a later writable event,
/// so a client that never reads its replies cannot grow the buffer.
///
/// Returns an error when the connection must be closed. An orderly close
/// from the client is reported as [`ConnectionError::ClientDisconnected`]
/// after the lines it sent before closing have been answered.
fn drive(
    conn: &mut Connection,
    handler: &mut CommandHandler,
    stats: &mut ConnectionStats,
    event: ReadyEvent,
) -> Result<(), ConnectionError> {
    let mut drained = !(event.readable || event.closed || conn.is_read_paused());

    loop {
        while !conn.output_backlogged() {
            let Some(line) = conn.next_line() else {
                break;
            };
            let response = handler.handle_line(&line);
            stats.command_processed();
            conn.queue_response(&response);
        }

        if conn.output_backlogged() {
            stats.bytes_written(conn.flush()?);
            if conn.output_backlogged() {
                if !conn.is_read_paused() {
                    debug!(
                        client = %conn.addr(),
                        pending = conn.pending_output(),
                        "Output backlogged, pausing reads"
                    );
                }
                conn.set_read_paused(true);
                return Ok(());
            }
            continue;
        }

        if conn.is_read_closed() {
            stats.bytes_written(conn.flush()?);
            return Err(ConnectionError::ClientDisconnected);
        }
        if drained {
            break;
        }

        let outcome = conn.read_available()?;
        stats.bytes_read(outcome.bytes);
        drained = outcome.drained;
    }

    conn.set_read_paused(false);
    if conn.has_pending_output() {
        stats.bytes_written(conn.flush()?);
    }
    Ok(())
}

/// Adds write interest while output is pending and drops it once flushed.
fn update_interest<M: Multiplexer>(
    multiplexer: &mut M,
    conn: &mut Connection,
) -> Result<(), ConnectionError> {
    let wanted = conn.wanted_interest();
    if wanted != conn.interest() {
        let handle = conn.handle();
        multiplexer.reregister(conn.stream_mut(), handle, wanted)?;
        conn.set_interest(wanted);
        trace!(handle = %handle, interest = ?wanted, "Interest updated");
    }
    Ok(())
}
