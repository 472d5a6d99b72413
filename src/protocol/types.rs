//! Line Protocol Data Types
//!
//! Every request and every reply is a single line of text terminated by
//! `\n`. Fields in a request are separated by one or more whitespace
//! characters.
//!
//! ## Requests
//!
//! ```text
//! SET <key> <value>
//! SET <key> <value> <ttlSeconds>
//! GET <key>
//! DEL <key>
//! HAS <key>
//! ```
//!
//! ## Replies
//!
//! - `Success` after `SET` and `DEL`
//! - the stored value after `GET`
//! - `Yes` / `No` after `HAS`
//! - the error message text when a command fails
//!
//! Errors are not framed differently from successful replies; a client tells
//! them apart by content only.

use bytes::{BufMut, Bytes, BytesMut};
use std::fmt;

/// The line terminator used on the wire.
pub const LF: u8 = b'\n';

/// Reply sent after a successful `SET` or `DEL`.
pub const SUCCESS: &str = "Success";

/// A parsed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `SET key value` - store without expiry
    Set { key: String, value: String },

    /// `SET key value ttl` - store with an expiry `ttl_seconds` from now
    SetEx {
        key: String,
        value: String,
        ttl_seconds: i64,
    },

    /// `GET key`
    Get { key: String },

    /// `DEL key`
    Del { key: String },

    /// `HAS key`
    Has { key: String },
}

impl Command {
    /// Returns the command name as it appears on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Set { .. } | Command::SetEx { .. } => "SET",
            Command::Get { .. } => "GET",
            Command::Del { .. } => "DEL",
            Command::Has { .. } => "HAS",
        }
    }

    /// Returns the key this command operates on.
    pub fn key(&self) -> &str {
        match self {
            Command::Set { key, .. }
            | Command::SetEx { key, .. }
            | Command::Get { key }
            | Command::Del { key }
            | Command::Has { key } => key,
        }
    }
}

/// A reply to be written back to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// `Success`
    Success,

    /// A stored value
    Value(String),

    /// `Yes` or `No`
    Presence(bool),

    /// An error message
    Error(String),
}

impl Response {
    /// Creates an error reply from anything displayable.
    pub fn error(err: impl fmt::Display) -> Self {
        Response::Error(err.to_string())
    }

    /// Returns true if this reply carries an error.
    pub fn is_error(&self) -> bool {
        matches!(self, Response::Error(_))
    }

    /// Returns the reply text without the terminator.
    pub fn as_str(&self) -> &str {
        match self {
            Response::Success => SUCCESS,
            Response::Value(value) => value,
            Response::Presence(true) => "Yes",
            Response::Presence(false) => "No",
            Response::Error(message) => message,
        }
    }

    /// Serializes the reply, terminator included.
    pub fn serialize(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.as_str().len() + 1);
        self.serialize_into(&mut buf);
        buf.freeze()
    }

    /// Serializes the reply into an existing buffer.
    pub fn serialize_into(&self, buf: &mut BytesMut) {
        buf.put_slice(self.as_str().as_bytes());
        buf.put_u8(LF);
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
