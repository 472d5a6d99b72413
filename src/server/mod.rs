//! Server Module
//!
//! The event loop that ties sweepkv together: it owns the listening socket,
//! the readiness multiplexer, the command handler (and with it the cache)
//! and every client connection, and drives them all from one thread.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                          Server                                 │
//! │                                                                 │
//! │   ┌─────────────┐   poll()   ┌───────────────────────────────┐  │
//! │   │ Multiplexer │───────────>│ dispatch by Role              │  │
//! │   └─────────────┘            │  Listening → accept           │  │
//! │          ▲                   │  Connected → read/exec/write  │  │
//! │          │ register          │  Waker     → shutdown check   │  │
//! │          │                   └──────────────┬────────────────┘  │
//! │   ┌──────┴──────────┐                       │                   │
//! │   │ Connection      │<──────────────────────┘                   │
//! │   │ Registry        │        ┌────────────────────┐             │
//! │   └─────────────────┘        │ CommandHandler     │             │
//! │                              │   └─ CacheStore    │<── sweep    │
//! │                              └────────────────────┘             │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod event_loop;
pub mod shutdown;

pub use config::{ServerConfig, DEFAULT_MAX_CONNECTIONS};
pub use event_loop::{role_of, Role, Server, LISTENER, WAKER};
pub use shutdown::ShutdownHandle;

use crate::multiplexer::MultiplexerError;
use std::io;
use std::net::SocketAddr;
use thiserror::Error;

/// Fatal server errors, returned from [`Server::start`] and the constructors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The configured host/port did not resolve
    #[error("invalid address {address}: {source}")]
    Resolve {
        address: String,
        #[source]
        source: io::Error,
    },

    /// The listener could not be bound
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    /// The multiplexer could not be created or refused a registration
    #[error(transparent)]
    Resource(#[from] MultiplexerError),

    /// Any other I/O error on the listener
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
