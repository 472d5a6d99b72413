//! Storage Module
//!
//! This module provides the key space for sweepkv: a lock-free,
//! single-owner map with TTL support, plus the timer that decides when the
//! event loop should sweep expired keys.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Event Loop Thread                       │
//! │                                                             │
//! │   ┌──────────────┐   commands   ┌────────────────────────┐  │
//! │   │ Connections  │─────────────>│       CacheStore       │  │
//! │   └──────────────┘              │  HashMap<String,Entry> │  │
//! │                                 └────────────────────────┘  │
//! │                                            ▲                │
//! │                          sweep_expired()   │                │
//! │                                 ┌──────────┴─────────────┐  │
//! │                                 │      SweepTimer        │  │
//! │                                 └────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Features
//!
//! - **Single Owner**: no locks; the loop serializes every access
//! - **TTL Support**: keys can carry an absolute expiry instant
//! - **Lazy Expiry**: expired keys are evicted on access
//! - **Active Expiry**: the loop sweeps the key space on an interval
//!
//! ## Example
//!
//! ```
//! use sweepkv::storage::{CacheStore, SweepTimer};
//! use std::time::{Duration, Instant};
//!
//! let mut cache = CacheStore::new();
//! cache.set_with_ttl("session", "token123", 3600).unwrap();
//!
//! let mut timer = SweepTimer::new(Duration::from_secs(1));
//! assert_eq!(timer.run_if_due(&mut cache, Instant::now()), Some(0));
//! ```

pub mod engine;
pub mod expiry;

// Re-export commonly used types
pub use engine::{CacheError, CacheStore, Entry, StoreStats};
pub use expiry::{SweepTimer, DEFAULT_SWEEP_INTERVAL};
