//! # sweepkv - A Single-Threaded In-Memory Key-Value Cache
//!
//! sweepkv is a network-reachable key-value cache with TTL support. Clients
//! open a TCP connection, send newline-delimited text commands and receive
//! newline-delimited text replies.
//!
//! ## Features
//!
//! - **One Thread**: a readiness-driven event loop multiplexes every client
//!   connection over a single thread, so the cache needs no locks
//! - **TTL Support**: keys can expire after a number of seconds
//! - **Lazy + Active Expiry**: expired keys vanish on access and are swept
//!   on a fixed interval
//! - **Line Buffering**: commands split across packets, or several commands
//!   in one packet, are handled correctly
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                              sweepkv                                    │
//! │                                                                         │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐                  │
//! │  │ Multiplexer │───>│ Event Loop  │───>│  Command    │                  │
//! │  │ (mio::Poll) │    │  (Server)   │    │  Handler    │                  │
//! │  └─────────────┘    └──────┬──────┘    └──────┬──────┘                  │
//! │                            │                  │                         │
//! │                            ▼                  ▼                         │
//! │                  ┌──────────────────┐  ┌──────────────────────────┐     │
//! │                  │ Connection       │  │       CacheStore         │     │
//! │                  │ Registry         │  │  HashMap<String, Entry>  │     │
//! │                  └──────────────────┘  └──────────────────────────┘     │
//! │                                                   ▲                     │
//! │                                                   │ every interval      │
//! │                                        ┌──────────┴───────────┐         │
//! │                                        │     SweepTimer       │         │
//! │                                        └──────────────────────┘         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```no_run
//! use sweepkv::server::{Server, ServerConfig};
//! use sweepkv::storage::CacheStore;
//!
//! let config = ServerConfig::default();
//! let mut server = Server::bind(&config, CacheStore::new())?;
//!
//! // Blocks until a fatal error or a shutdown request
//! server.start()?;
//! # Ok::<(), sweepkv::server::ServerError>(())
//! ```
//!
//! ## Supported Commands
//!
//! - `SET key value` - reply `Success`
//! - `SET key value seconds` - reply `Success`
//! - `GET key` - reply with the value
//! - `DEL key` - reply `Success`
//! - `HAS key` - reply `Yes` or `No`
//!
//! Failures are replied with the error message, e.g. `key foo not found`.
//!
//! ## Module Overview
//!
//! - [`multiplexer`]: readiness notification over `mio`
//! - [`storage`]: the cache store and sweep timer
//! - [`protocol`]: the line protocol parser and reply encoding
//! - [`commands`]: command execution
//! - [`connection`]: per-client buffers and the connection registry
//! - [`server`]: the event loop

pub mod commands;
pub mod connection;
pub mod multiplexer;
pub mod protocol;
pub mod server;
pub mod storage;

// Re-export commonly used types for convenience
pub use commands::CommandHandler;
pub use protocol::{parse_command, Command, ProtocolError, Response};
pub use server::{Server, ServerConfig, ServerError, ShutdownHandle};
pub use storage::{CacheError, CacheStore, SweepTimer};

/// The default port sweepkv listens on
pub const DEFAULT_PORT: u16 = 7171;

/// The default host sweepkv binds to
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Version of sweepkv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
