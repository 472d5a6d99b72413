//! Line Protocol Implementation
//!
//! This module implements the newline-delimited text protocol spoken by
//! sweepkv clients.
//!
//! ## Modules
//!
//! - `types`: Defines `Command`, `Response` and their wire encoding
//! - `parser`: Parses one request line into a `Command`
//!
//! ## Example
//!
//! ```
//! use sweepkv::protocol::{parse_command, Command, Response};
//!
//! let cmd = parse_command("GET name\n").unwrap();
//! assert_eq!(cmd, Command::Get { key: "name".to_string() });
//!
//! let reply = Response::Value("sweepkv".to_string());
//! assert_eq!(&reply.serialize()[..], b"sweepkv\n");
//! ```

pub mod parser;
pub mod types;

// Re-export commonly used types for convenience
pub use parser::{parse_command, parse_line, ParseResult, ProtocolError};
pub use types::{Command, Response, LF, SUCCESS};
