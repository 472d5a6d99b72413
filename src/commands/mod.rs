//! Command Handler Module
//!
//! This module implements the command processing layer for sweepkv.
//! It receives raw request lines, parses them, executes them against the
//! cache store and returns the reply to send back.
//!
//! ## Architecture
//!
//! ```text
//! Client Request Line
//!       │
//!       ▼
//! ┌─────────────────┐
//! │  Line Parser    │  (protocol module)
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ CommandHandler  │  (this module)
//! │                 │
//! │  - Dispatch     │
//! │  - Execute      │
//! │  - Fold errors  │
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │  CacheStore     │  (storage module)
//! └─────────────────┘
//! ```

pub mod handler;

// Re-export the main command handler
pub use handler::{CommandError, CommandHandler};
