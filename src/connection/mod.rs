//! Connection Module
//!
//! This module tracks client connections for the event loop. There is no
//! task per client: every connection is a [`Connection`] record in the
//! [`ConnectionRegistry`], serviced by the single loop thread whenever the
//! multiplexer reports its socket ready.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Event Loop                              │
//! │                    (server module)                          │
//! └──────────────────────┬──────────────────────────────────────┘
//!                        │
//!                        │ readiness(handle)
//!                        ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 ConnectionRegistry                          │
//! │         HashMap<Handle, Connection>                         │
//! │                                                             │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐     │
//! │  │ Read bytes  │───>│ Split lines │───>│ Queue reply │     │
//! │  └─────────────┘    └─────────────┘    └──────┬──────┘     │
//! │                                               ▼             │
//! │                                      ┌─────────────┐        │
//! │                                      │   Flush     │        │
//! │                                      └─────────────┘        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Features
//!
//! - **Non-blocking I/O**: reads and writes stop at `WouldBlock`
//! - **Line Buffering**: partial lines survive across readiness events
//! - **Pipelining**: several lines in one packet are all answered
//! - **Statistics**: connection, command and byte counters

pub mod handler;
pub mod registry;

// Re-export commonly used types
pub use handler::{
    Connection, ConnectionError, ConnectionStats, ReadOutcome, MAX_LINE_LENGTH, MAX_PENDING_OUTPUT,
};
pub use registry::ConnectionRegistry;
