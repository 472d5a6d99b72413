//! Line Protocol Parser
//!
//! Turns one request line into a [`Command`]. The caller is responsible for
//! framing: it hands over exactly one line, with or without its `\n` (and an
//! optional `\r` before it).
//!
//! ## Rules
//!
//! 1. The line is split on runs of whitespace.
//! 2. Fewer than two tokens is an error: every command needs a key.
//! 3. The first token selects the command (case-insensitive).
//! 4. `SET` takes exactly 3 or 4 tokens; the 4th is a TTL in whole seconds.
//! 5. `GET`, `DEL` and `HAS` ignore anything after the key.
//!
//! Keys and values are single tokens. There is no quoting, so a value cannot
//! contain whitespace.

use crate::protocol::types::Command;
use thiserror::Error;

/// Errors that can occur while parsing a request line.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Fewer than two tokens on the line
    #[error("message must at least have command and key")]
    MissingKey,

    /// The leading token is not a known command
    #[error("unknown command {0}")]
    UnknownCommand(String),

    /// `SET` with a token count other than 3 or 4
    #[error("SET message must have key and value, and optionally a TTL")]
    SetArity,

    /// The TTL token is not an integer
    #[error("invalid TTL {0}")]
    InvalidTtl(String),

    /// The line is not valid UTF-8
    #[error("message is not valid UTF-8")]
    InvalidUtf8,
}

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, ProtocolError>;

/// Parses a raw line (as read from the socket) into a [`Command`].
pub fn parse_line(line: &[u8]) -> ParseResult<Command> {
    let text = std::str::from_utf8(line).map_err(|_| ProtocolError::InvalidUtf8)?;
    parse_command(text)
}

/// Parses a request line into a [`Command`].
///
/// # Example
///
/// ```
/// use sweepkv::protocol::{parse_command, Command};
///
/// let cmd = parse_command("SET name sweepkv 60\n").unwrap();
/// assert_eq!(
///     cmd,
///     Command::SetEx {
///         key: "name".to_string(),
///         value: "sweepkv".to_string(),
///         ttl_seconds: 60,
///     }
/// );
/// ```
pub fn parse_command(line: &str) -> ParseResult<Command> {
    let parts: Vec<&str> = line.split_whitespace().collect();

    if parts.len() < 2 {
        return Err(ProtocolError::MissingKey);
    }

    let name = parts[0];
    let key = parts[1].to_string();

    if name.eq_ignore_ascii_case("SET") {
        match parts.len() {
            3 => Ok(Command::Set {
                key,
                value: parts[2].to_string(),
            }),
            4 => {
                let ttl_seconds = parts[3]
                    .parse::<i64>()
                    .map_err(|_| ProtocolError::InvalidTtl(parts[3].to_string()))?;
                Ok(Command::SetEx {
                    key,
                    value: parts[2].to_string(),
                    ttl_seconds,
                })
            }
            _ => Err(ProtocolError::SetArity),
        }
    } else if name.eq_ignore_ascii_case("GET") {
        Ok(Command::Get { key })
    } else if name.eq_ignore_ascii_case("DEL") {
        Ok(Command::Del { key })
    } else if name.eq_ignore_ascii_case("HAS") {
        Ok(Command::Has { key })
    } else {
        Err(ProtocolError::UnknownCommand(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_set() {
        assert_eq!(
            parse_command("SET a b"),
            Ok(Command::Set {
                key: "a".to_string(),
                value: "b".to_string()
            })
        );
    }

    #[test]
    fn test_parse_set_with_ttl() {
        assert_eq!(
            parse_command("SET foo bar 1\n"),
            Ok(Command::SetEx {
                key: "foo".to_string(),
                value: "bar".to_string(),
                ttl_seconds: 1
            })
        );
    }

    #[test]
    fn test_negative_ttl_is_left_to_the_store() {
        // Parsing accepts any integer; the store rejects negative values
        assert!(matches!(
            parse_command("SET foo bar -3"),
            Ok(Command::SetEx { ttl_seconds: -3, .. })
        ));
    }

    #[test]
    fn test_parse_get_del_has() {
        assert_eq!(
            parse_command("GET foo"),
            Ok(Command::Get {
                key: "foo".to_string()
            })
        );
        assert_eq!(
            parse_command("DEL foo"),
            Ok(Command::Del {
                key: "foo".to_string()
            })
        );
        assert_eq!(
            parse_command("HAS foo"),
            Ok(Command::Has {
                key: "foo".to_string()
            })
        );
    }

    #[test]
    fn test_whitespace_runs_and_crlf() {
        assert_eq!(
            parse_command("  SET \t key   value \r\n"),
            Ok(Command::Set {
                key: "key".to_string(),
                value: "value".to_string()
            })
        );
    }

    #[test]
    fn test_case_insensitive_names() {
        assert!(matches!(parse_command("get foo"), Ok(Command::Get { .. })));
        assert!(matches!(parse_command("Has foo"), Ok(Command::Has { .. })));
    }

    #[test]
    fn test_single_token_rejected() {
        assert_eq!(parse_command("GET"), Err(ProtocolError::MissingKey));
        assert_eq!(parse_command("\n"), Err(ProtocolError::MissingKey));
        assert_eq!(parse_command(""), Err(ProtocolError::MissingKey));
    }

    #[test]
    fn test_set_arity() {
        assert_eq!(parse_command("SET a"), Err(ProtocolError::SetArity));
        assert_eq!(parse_command("SET a b c d"), Err(ProtocolError::SetArity));
    }

    #[test]
    fn test_unknown_command() {
        assert_eq!(
            parse_command("PUT a b"),
            Err(ProtocolError::UnknownCommand("PUT".to_string()))
        );
    }

    #[test]
    fn test_invalid_ttl() {
        assert_eq!(
            parse_command("SET a b soon"),
            Err(ProtocolError::InvalidTtl("soon".to_string()))
        );
    }

    #[test]
    fn test_parse_line_rejects_invalid_utf8() {
        assert_eq!(parse_line(b"GET \xff\xfe\n"), Err(ProtocolError::InvalidUtf8));
        assert!(parse_line(b"GET ok\n").is_ok());
    }
}
