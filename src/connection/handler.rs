//! Connection Handler Module
//!
//! This module holds the per-client state the event loop needs to service a
//! non-blocking socket: the stream itself, a read buffer that accumulates
//! bytes until a full line has arrived, and a write buffer holding replies
//! the socket could not take yet.
//!
//! ## Connection Lifecycle
//!
//! ```text
//! 1. Listener readable, accept()
//!        │
//!        ▼
//! 2. Connection registered for READ
//!        │
//!        ▼
//! 3. ┌──────────────────────────────┐
//!    │   On each readiness event    │
//!    │                              │
//!    │  read until WouldBlock       │
//!    │  split complete lines        │
//!    │  execute, queue replies      │
//!    │  write until WouldBlock      │
//!    │    └─ pending? add WRITE     │
//!    │  backlog? pause reads until  │
//!    │    the client drains it      │
//!    └──────────────────────────────┘
//!        │
//!        ▼
//! 4. EOF / I/O error / line too long
//!        │
//!        ▼
//! 5. Deregistered and dropped
//! ```
//!
//! ## Buffer Management
//!
//! TCP is a stream protocol: one read may carry half a line, or several.
//! Bytes are appended to a `BytesMut` and complete lines are split off the
//! front; a trailing partial line waits for the next readiness event.

use crate::multiplexer::{Handle, Interest, MultiplexerError};
use crate::protocol::{Response, LF};
use bytes::{Buf, BytesMut};
use mio::net::TcpStream;
use std::io::{self, Read, Write};
use std::net::SocketAddr;
use tracing::trace;

/// Maximum length of a single request line (64 KB)
pub const MAX_LINE_LENGTH: usize = 64 * 1024;

/// Queued reply bytes above which a connection stops reading requests
/// until the client catches up (256 KB)
pub const MAX_PENDING_OUTPUT: usize = 256 * 1024;

/// Initial buffer capacity
const INITIAL_BUFFER_SIZE: usize = 4096;

/// Size of each read from the socket
const READ_CHUNK_SIZE: usize = 4096;

/// Statistics for connection handling.
///
/// Only the event loop thread touches these, so they are plain counters.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConnectionStats {
    /// Total number of connections accepted
    pub connections_accepted: u64,
    /// Currently active connections
    pub active_connections: u64,
    /// Total commands processed
    pub commands_processed: u64,
    /// Total bytes read
    pub bytes_read: u64,
    /// Total bytes written
    pub bytes_written: u64,
}

impl ConnectionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection_opened(&mut self) {
        self.connections_accepted += 1;
        self.active_connections += 1;
    }

    pub fn connection_closed(&mut self) {
        self.active_connections = self.active_connections.saturating_sub(1);
    }

    pub fn command_processed(&mut self) {
        self.commands_processed += 1;
    }

    pub fn bytes_read(&mut self, count: usize) {
        self.bytes_read += count as u64;
    }

    pub fn bytes_written(&mut self, count: usize) {
        self.bytes_written += count as u64;
    }
}

/// Errors that end a connection.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// I/O error (network issue)
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),

    /// Client closed its side of the connection
    #[error("Client disconnected")]
    ClientDisconnected,

    /// A line grew past [`MAX_LINE_LENGTH`] without a terminator
    #[error("Line exceeds {} bytes", MAX_LINE_LENGTH)]
    LineTooLong,

    /// The socket's readiness interest could not be updated
    #[error("Registration error: {0}")]
    Registration(#[from] MultiplexerError),
}

/// What a drain of the socket produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadOutcome {
    /// Bytes appended to the read buffer
    pub bytes: usize,
    /// The peer closed its side (read returned 0)
    pub eof: bool,
    /// The socket returned `WouldBlock` or EOF; false means the buffer
    /// filled up first and more data may be waiting
    pub drained: bool,
}

/// A connected client.
#[derive(Debug)]
pub struct Connection {
    /// The non-blocking TCP stream for this connection
    stream: TcpStream,

    /// Client's address (for logging)
    addr: SocketAddr,

    /// The handle this connection is registered under
    handle: Handle,

    /// Bytes read but not yet consumed as lines
    read_buffer: BytesMut,

    /// Encoded replies not yet written
    write_buffer: BytesMut,

    /// Interest currently registered with the multiplexer
    interest: Interest,

    /// Requests are left unread until queued output drains
    read_paused: bool,

    /// The peer has closed its side
    read_closed: bool,
}

impl Connection {
    /// Wraps an accepted stream.
    pub fn new(stream: TcpStream, addr: SocketAddr, handle: Handle) -> Self {
        Self {
            stream,
            addr,
            handle,
            read_buffer: BytesMut::with_capacity(INITIAL_BUFFER_SIZE),
            write_buffer: BytesMut::new(),
            interest: Interest::Read,
            read_paused: false,
            read_closed: false,
        }
    }

    /// Returns the client's address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Returns the handle this connection is registered under.
    pub fn handle(&self) -> Handle {
        self.handle
    }

    /// Returns the underlying stream (for (de)registration).
    pub fn stream_mut(&mut self) -> &mut TcpStream {
        &mut self.stream
    }

    /// Returns the interest currently registered for this connection.
    pub fn interest(&self) -> Interest {
        self.interest
    }

    /// Records the interest registered for this connection.
    pub fn set_interest(&mut self, interest: Interest) {
        self.interest = interest;
    }

    /// Returns true if replies are waiting to be written.
    pub fn has_pending_output(&self) -> bool {
        !self.write_buffer.is_empty()
    }

    /// Returns the number of reply bytes waiting to be written.
    pub fn pending_output(&self) -> usize {
        self.write_buffer.len()
    }

    /// Returns true once queued output reaches [`MAX_PENDING_OUTPUT`].
    pub fn output_backlogged(&self) -> bool {
        self.write_buffer.len() >= MAX_PENDING_OUTPUT
    }

    /// Returns true while reads are held back by a backlog.
    pub fn is_read_paused(&self) -> bool {
        self.read_paused
    }

    pub fn set_read_paused(&mut self, paused: bool) {
        self.read_paused = paused;
    }

    /// Returns true once a read has seen EOF.
    pub fn is_read_closed(&self) -> bool {
        self.read_closed
    }

    /// Returns the interest this connection needs given its pending output.
    pub fn wanted_interest(&self) -> Interest {
        if self.has_pending_output() {
            Interest::ReadWrite
        } else {
            Interest::Read
        }
    }

    /// Reads everything currently available on the socket.
    ///
    /// Stops at `WouldBlock`, at EOF, or once the buffer holds
    /// [`MAX_LINE_LENGTH`] bytes; in the last case `drained` is false and
    /// the caller must consume lines and read again. Bytes read before an
    /// EOF stay in the buffer so complete lines can still be answered.
    pub fn read_available(&mut self) -> Result<ReadOutcome, ConnectionError> {
        let mut total = 0;

        loop {
            if self.read_buffer.len() >= MAX_LINE_LENGTH {
                if !self.read_buffer.contains(&LF) {
                    return Err(ConnectionError::LineTooLong);
                }
                return Ok(ReadOutcome {
                    bytes: total,
                    eof: false,
                    drained: false,
                });
            }

            // Ensure we have some capacity
            if self.read_buffer.capacity() - self.read_buffer.len() < READ_CHUNK_SIZE {
                self.read_buffer.reserve(READ_CHUNK_SIZE);
            }

            let start = self.read_buffer.len();
            self.read_buffer.resize(start + READ_CHUNK_SIZE, 0);

            match self.stream.read(&mut self.read_buffer[start..]) {
                Ok(0) => {
                    self.read_buffer.truncate(start);
                    self.read_closed = true;
                    trace!(client = %self.addr, bytes = total, "Read reached EOF");
                    return Ok(ReadOutcome {
                        bytes: total,
                        eof: true,
                        drained: true,
                    });
                }
                Ok(n) => {
                    self.read_buffer.truncate(start + n);
                    total += n;
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    self.read_buffer.truncate(start);
                    trace!(client = %self.addr, bytes = total, "Read data");
                    return Ok(ReadOutcome {
                        bytes: total,
                        eof: false,
                        drained: true,
                    });
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {
                    self.read_buffer.truncate(start);
                }
                Err(e) => {
                    self.read_buffer.truncate(start);
                    return Err(e.into());
                }
            }
        }
    }

    /// Splits the next complete line (terminator included) off the read buffer.
    pub fn next_line(&mut self) -> Option<BytesMut> {
        let pos = self.read_buffer.iter().position(|&b| b == LF)?;
        Some(self.read_buffer.split_to(pos + 1))
    }

    /// Returns the number of buffered bytes that do not yet form a line.
    pub fn buffered(&self) -> usize {
        self.read_buffer.len()
    }

    /// Queues a reply for writing.
    pub fn queue_response(&mut self, response: &Response) {
        response.serialize_into(&mut self.write_buffer);
    }

    /// Writes as much pending output as the socket accepts.
    ///
    /// # Returns
    ///
    /// The number of bytes written. Anything left over stays queued until
    /// the socket becomes writable again.
    pub fn flush(&mut self) -> Result<usize, ConnectionError> {
        let mut written = 0;

        while !self.write_buffer.is_empty() {
            match self.stream.write(&self.write_buffer) {
                Ok(0) => {
                    return Err(io::Error::from(io::ErrorKind::WriteZero).into());
                }
                Ok(n) => {
                    self.write_buffer.advance(n);
                    written += n;
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }

        trace!(
            client = %self.addr,
            bytes = written,
            pending = self.write_buffer.len(),
            "Sent response"
        );
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mio::net::TcpListener;
    use std::time::Duration;

    /// Builds a connected (server side, client side) pair.
    fn socket_pair() -> (Connection, std::net::TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0".parse().unwrap()).unwrap();
        let client = std::net::TcpStream::connect(listener.local_addr().unwrap()).unwrap();

        loop {
            match listener.accept() {
                Ok((stream, addr)) => return (Connection::new(stream, addr, Handle(2)), client),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    std::thread::sleep(Duration::from_millis(5))
                }
                Err(e) => panic!("accept failed: {}", e),
            }
        }
    }

    /// Reads until `want` bytes have arrived or two seconds pass.
    fn read_until(conn: &mut Connection, want: usize) -> ReadOutcome {
        let mut total = ReadOutcome {
            bytes: 0,
            eof: false,
            drained: true,
        };
        for _ in 0..200 {
            let outcome = conn.read_available().unwrap();
            total.bytes += outcome.bytes;
            total.eof |= outcome.eof;
            if total.bytes >= want || total.eof {
                break;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        total
    }

    #[test]
    fn test_splits_lines() {
        let (mut conn, mut client) = socket_pair();

        client.write_all(b"SET a 1\nGET a\nHAS").unwrap();
        let outcome = read_until(&mut conn, 17);
        assert_eq!(outcome.bytes, 17);

        assert_eq!(&conn.next_line().unwrap()[..], b"SET a 1\n");
        assert_eq!(&conn.next_line().unwrap()[..], b"GET a\n");
        assert!(conn.next_line().is_none());
        assert_eq!(conn.buffered(), 3);

        // The rest of the partial line arrives later
        client.write_all(b" a\n").unwrap();
        read_until(&mut conn, 3);
        assert_eq!(&conn.next_line().unwrap()[..], b"HAS a\n");
    }

    #[test]
    fn test_eof_keeps_buffered_lines() {
        let (mut conn, mut client) = socket_pair();

        client.write_all(b"GET a\n").unwrap();
        client.shutdown(std::net::Shutdown::Write).unwrap();

        let outcome = read_until(&mut conn, usize::MAX);
        assert!(outcome.eof);
        assert!(conn.is_read_closed());
        assert_eq!(&conn.next_line().unwrap()[..], b"GET a\n");
    }

    #[test]
    fn test_line_too_long() {
        let (mut conn, mut client) = socket_pair();

        let writer = std::thread::spawn(move || {
            let chunk = vec![b'x'; 8192];
            for _ in 0..10 {
                if client.write_all(&chunk).is_err() {
                    break;
                }
            }
            client
        });

        let mut result = Ok(ReadOutcome {
            bytes: 0,
            eof: false,
            drained: true,
        });
        for _ in 0..200 {
            result = conn.read_available();
            if result.is_err() {
                break;
            }
            std::thread::sleep(Duration::from_millis(5));
        }

        assert!(matches!(result, Err(ConnectionError::LineTooLong)));
        drop(conn);
        let _ = writer.join();
    }

    #[test]
    fn test_queue_and_flush() {
        let (mut conn, mut client) = socket_pair();

        conn.queue_response(&Response::Success);
        conn.queue_response(&Response::Presence(false));
        assert!(conn.has_pending_output());
        assert_eq!(conn.wanted_interest(), Interest::ReadWrite);

        assert_eq!(conn.pending_output(), b"Success\nNo\n".len());
        assert!(!conn.output_backlogged());

        let written = conn.flush().unwrap();
        assert_eq!(written, b"Success\nNo\n".len());
        assert!(!conn.has_pending_output());
        assert_eq!(conn.wanted_interest(), Interest::Read);

        let mut buf = [0u8; 32];
        client
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();
        let n = client.read(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"Success\nNo\n");
    }

    #[test]
    fn test_connection_stats() {
        let mut stats = ConnectionStats::new();

        stats.connection_opened();
        stats.connection_opened();
        stats.connection_closed();
        stats.command_processed();
        stats.bytes_read(10);
        stats.bytes_written(4);

        assert_eq!(stats.connections_accepted, 2);
        assert_eq!(stats.active_connections, 1);
        assert_eq!(stats.commands_processed, 1);
        assert_eq!(stats.bytes_read, 10);
        assert_eq!(stats.bytes_written, 4);

        stats.connection_closed();
        stats.connection_closed();
        assert_eq!(stats.active_connections, 0);
    }
}
