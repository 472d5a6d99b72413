//! Command Handler Module
//!
//! This module executes parsed commands against the cache store and turns
//! every outcome, success or failure, into a [`Response`].
//!
//! ## Supported Commands
//!
//! - `SET key value` - Set a key, clearing any expiry
//! - `SET key value seconds` - Set a key that expires after `seconds`
//! - `GET key` - Get a key's value
//! - `DEL key` - Delete a key
//! - `HAS key` - Check if a key exists (`Yes` / `No`)
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     CommandHandler                          │
//! │                                                             │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐     │
//! │  │ parse_line()│───>│  execute()  │───>│  Response   │     │
//! │  └─────────────┘    └─────────────┘    └─────────────┘     │
//! │                            │                                │
//! │                            ▼                                │
//! │                       CacheStore                            │
//! └─────────────────────────────────────────────────────────────┘
//! ```

use crate::protocol::{parse_line, Command, ProtocolError, Response};
use crate::storage::{CacheError, CacheStore};
use thiserror::Error;
use tracing::{debug, trace};

/// Errors a command can fail with. All of them are recoverable: they are
/// reported to the client and the connection stays open.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// The request line was malformed
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The cache rejected the operation
    #[error(transparent)]
    Cache(#[from] CacheError),
}

/// Executes commands against the cache store it owns.
#[derive(Debug, Default)]
pub struct CommandHandler {
    /// The key space
    cache: CacheStore,
}

impl CommandHandler {
    /// Creates a command handler that takes ownership of `cache`.
    pub fn new(cache: CacheStore) -> Self {
        Self { cache }
    }

    /// Returns the cache store.
    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    /// Returns the cache store mutably (used by the sweep).
    pub fn cache_mut(&mut self) -> &mut CacheStore {
        &mut self.cache
    }

    /// Parses and executes one raw request line.
    ///
    /// Errors are folded into [`Response::Error`]; this never fails.
    pub fn handle_line(&mut self, line: &[u8]) -> Response {
        match parse_line(line)
            .map_err(CommandError::from)
            .and_then(|command| self.execute(command))
        {
            Ok(response) => response,
            Err(e) => {
                debug!(error = %e, "Command failed");
                Response::error(e)
            }
        }
    }

    /// Executes a parsed command.
    pub fn execute(&mut self, command: Command) -> Result<Response, CommandError> {
        trace!(command = command.name(), key = command.key(), "Executing command");

        match command {
            Command::Set { key, value } => self.cmd_set(key, value),
            Command::SetEx {
                key,
                value,
                ttl_seconds,
            } => self.cmd_setex(key, value, ttl_seconds),
            Command::Get { key } => self.cmd_get(&key),
            Command::Del { key } => self.cmd_del(&key),
            Command::Has { key } => Ok(self.cmd_has(&key)),
        }
    }

    fn cmd_set(&mut self, key: String, value: String) -> Result<Response, CommandError> {
        debug!("SET {} {}", key, value);
        self.cache.set(key, value);
        Ok(Response::Success)
    }

    fn cmd_setex(
        &mut self,
        key: String,
        value: String,
        ttl_seconds: i64,
    ) -> Result<Response, CommandError> {
        debug!("SET {} {} exp: {} seconds", key, value, ttl_seconds);
        self.cache.set_with_ttl(key, value, ttl_seconds)?;
        Ok(Response::Success)
    }

    fn cmd_get(&mut self, key: &str) -> Result<Response, CommandError> {
        let value = self.cache.get(key)?;
        debug!("GET {} {}", key, value);
        Ok(Response::Value(value.to_string()))
    }

    fn cmd_del(&mut self, key: &str) -> Result<Response, CommandError> {
        self.cache.delete(key)?;
        debug!("DEL {}", key);
        Ok(Response::Success)
    }

    fn cmd_has(&mut self, key: &str) -> Response {
        let present = self.cache.has(key);
        debug!("HAS {} {}", key, present);
        Response::Presence(present)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_handler() -> CommandHandler {
        CommandHandler::new(CacheStore::new())
    }

    #[test]
    fn test_set_get() {
        let mut handler = create_handler();

        assert_eq!(handler.handle_line(b"SET foo bar\n"), Response::Success);
        assert_eq!(
            handler.handle_line(b"GET foo\n"),
            Response::Value("bar".to_string())
        );
    }

    #[test]
    fn test_get_nonexistent() {
        let mut handler = create_handler();

        let response = handler.handle_line(b"GET nonexistent\n");
        assert_eq!(response, Response::error("key nonexistent not found"));
    }

    #[test]
    fn test_has() {
        let mut handler = create_handler();

        assert_eq!(
            handler.handle_line(b"HAS missingkey\n"),
            Response::Presence(false)
        );
        handler.handle_line(b"SET present 1\n");
        assert_eq!(
            handler.handle_line(b"HAS present\n"),
            Response::Presence(true)
        );
    }

    #[test]
    fn test_del() {
        let mut handler = create_handler();

        let response = handler.handle_line(b"DEL missingkey\n");
        assert!(response.is_error());
        assert!(response.as_str().contains("missingkey"));

        handler.handle_line(b"SET key value\n");
        assert_eq!(handler.handle_line(b"DEL key\n"), Response::Success);
        assert!(handler.handle_line(b"DEL key\n").is_error());
    }

    #[test]
    fn test_set_with_ttl() {
        let mut handler = create_handler();

        assert_eq!(handler.handle_line(b"SET temp v 100\n"), Response::Success);
        let entry = handler.cache_mut().get_entry("temp").unwrap();
        assert!(entry.expires_at.is_some());
    }

    #[test]
    fn test_set_with_zero_ttl() {
        let mut handler = create_handler();

        assert_eq!(handler.handle_line(b"SET temp v 0\n"), Response::Success);
        assert_eq!(handler.handle_line(b"HAS temp\n"), Response::Presence(false));
    }

    #[test]
    fn test_max_ttl_is_accepted() {
        let mut handler = create_handler();

        assert_eq!(
            handler.handle_line(b"SET a b 9223372036854775807\n"),
            Response::Success
        );
        assert_eq!(
            handler.handle_line(b"GET a\n"),
            Response::Value("b".to_string())
        );
    }

    #[test]
    fn test_negative_ttl_is_an_error() {
        let mut handler = create_handler();

        let response = handler.handle_line(b"SET temp v -1\n");
        assert!(matches!(response, Response::Error(ref msg) if msg.starts_with("invalid argument")));
        assert!(handler.cache().is_empty());
    }

    #[test]
    fn test_protocol_errors_become_responses() {
        let mut handler = create_handler();

        assert_eq!(
            handler.handle_line(b"PING\n"),
            Response::error(ProtocolError::MissingKey)
        );
        assert_eq!(
            handler.handle_line(b"SET a\n"),
            Response::error(ProtocolError::SetArity)
        );
        assert_eq!(
            handler.handle_line(b"SET a b c d\n"),
            Response::error(ProtocolError::SetArity)
        );
        assert_eq!(
            handler.handle_line(b"SET a b later\n"),
            Response::error(ProtocolError::InvalidTtl("later".to_string()))
        );
        assert_eq!(
            handler.handle_line(b"FETCH a\n"),
            Response::error("unknown command FETCH")
        );
    }

    #[test]
    fn test_execute_returns_typed_errors() {
        let mut handler = create_handler();

        let err = handler
            .execute(Command::Get {
                key: "k".to_string(),
            })
            .unwrap_err();
        assert_eq!(err, CommandError::Cache(CacheError::NotFound("k".to_string())));
    }
}
