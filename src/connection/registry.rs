//! Connection Registry
//!
//! Maps each client [`Handle`] to its [`Connection`]. Handles are handed out
//! from a monotonically increasing counter, so a handle is never reused
//! while the server runs and a stale readiness event can never be mistaken
//! for a newer connection.

use crate::connection::handler::Connection;
use crate::multiplexer::Handle;
use mio::net::TcpStream;
use std::collections::HashMap;
use std::net::SocketAddr;

/// The live client connections, owned by the event loop.
#[derive(Debug)]
pub struct ConnectionRegistry {
    connections: HashMap<Handle, Connection>,
    next_handle: usize,
}

impl ConnectionRegistry {
    /// Creates an empty registry whose first handle is `first_handle`.
    ///
    /// Handles below `first_handle` are reserved for the listener and the
    /// shutdown waker.
    pub fn new(first_handle: usize) -> Self {
        Self {
            connections: HashMap::new(),
            next_handle: first_handle,
        }
    }

    /// Allocates a handle and tracks `stream` under it.
    pub fn insert(&mut self, stream: TcpStream, addr: SocketAddr) -> &mut Connection {
        let handle = Handle(self.next_handle);
        self.next_handle += 1;

        self.connections
            .entry(handle)
            .or_insert_with(|| Connection::new(stream, addr, handle))
    }

    /// Returns the connection registered under `handle`.
    pub fn get(&self, handle: Handle) -> Option<&Connection> {
        self.connections.get(&handle)
    }

    /// Returns the connection registered under `handle`, mutably.
    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut Connection> {
        self.connections.get_mut(&handle)
    }

    /// Stops tracking `handle`, returning its connection.
    pub fn remove(&mut self, handle: Handle) -> Option<Connection> {
        self.connections.remove(&handle)
    }

    /// Returns true if `handle` belongs to a live connection.
    pub fn contains(&self, handle: Handle) -> bool {
        self.connections.contains_key(&handle)
    }

    /// Removes and returns every connection.
    pub fn drain(&mut self) -> impl Iterator<Item = Connection> + '_ {
        self.connections.drain().map(|(_, conn)| conn)
    }

    /// Number of live connections.
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Returns true if no client is connected.
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}
