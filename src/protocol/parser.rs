//! Incremental RESP Parser
//!
//! This module parses RESP units out of an in-memory buffer. It never blocks
//! and never consumes anything from the buffer itself; the caller decides what
//! to do with the returned byte count.
//!
//! ## How the Parser Works
//!
//! The parser reads from a buffer and returns either:
//! - `Ok(Some((value, consumed)))` - Successfully parsed a value, `consumed` bytes were used
//! - `Ok(None)` - Need more data, the unit is incomplete
//! - `Err(ParseError)` - Invalid protocol data
//!
//! This design allows the caller to:
//! 1. Append incoming data (socket or log file) to a buffer
//! 2. Call `parse()` to attempt parsing
//! 3. If successful, advance the buffer by `consumed` bytes
//! 4. If incomplete, wait for more data
//! 5. If error, give up on the stream
//!
//! ## Recognized Tags
//!
//! `*` arrays and `$` bulk strings carry requests. `+` and `-` lines are
//! recognized so that every value the server writes can be read back. Any
//! other tag produces [`RespValue::Unsupported`]: the rest of that line is
//! skipped and parsing carries on.
//!
//! A line (length header, simple string, error) longer than
//! [`MAX_LINE_LENGTH`] is rejected as soon as that many bytes are buffered
//! without a CRLF.

use crate::protocol::types::{prefix, RespValue, CRLF};
use bytes::Bytes;
use std::num::ParseIntError;
use thiserror::Error;

/// Errors that can occur during RESP parsing.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseError {
    /// Invalid integer format in a length field
    #[error("invalid integer: {0}")]
    InvalidInteger(String),

    /// Invalid UTF-8 in a length field or error message
    #[error("invalid UTF-8: {0}")]
    InvalidUtf8(String),

    /// Bulk string length is negative (but not -1 for null)
    #[error("invalid bulk string length: {0}")]
    InvalidBulkLength(i64),

    /// Array length is negative
    #[error("invalid array length: {0}")]
    InvalidArrayLength(i64),

    /// Protocol violation (missing CRLF, etc.)
    #[error("protocol error: {0}")]
    ProtocolError(String),

    /// The unit exceeds maximum allowed size
    #[error("message too large: {size} bytes (max: {max})")]
    MessageTooLarge { size: usize, max: usize },

    /// No CRLF within the first `max` bytes of a line
    #[error("line too long: no CRLF within {max} bytes")]
    LineTooLong { max: usize },
}

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// Maximum size for a single bulk string (512 MB, same as Redis)
pub const MAX_BULK_SIZE: usize = 512 * 1024 * 1024;

/// Maximum array nesting depth (prevent stack overflow)
pub const MAX_NESTING_DEPTH: usize = 32;

/// Maximum length of a single line, CRLF excluded (64 KB)
pub const MAX_LINE_LENGTH: usize = 64 * 1024;

/// A RESP parser over byte buffers.
///
/// # Example
///
/// ```
/// use emberkv::protocol::{RespParser, RespValue};
///
/// let mut parser = RespParser::new();
/// let buffer = b"*2\r\n$3\r\nGET\r\n$4\r\nname\r\n";
///
/// let (value, consumed) = parser.parse(buffer).unwrap().unwrap();
/// assert_eq!(consumed, buffer.len());
/// assert_eq!(value, RespValue::command(&["GET", "name"]));
/// ```
#[derive(Debug, Default)]
pub struct RespParser {
    /// Current nesting depth (for array parsing)
    depth: usize,
}

impl RespParser {
    /// Creates a new parser instance.
    pub fn new() -> Self {
        Self { depth: 0 }
    }

    /// Attempts to parse one RESP unit from the start of the buffer.
    ///
    /// # Returns
    ///
    /// - `Ok(Some((value, consumed)))` - Successfully parsed a value
    /// - `Ok(None)` - Incomplete data, need more bytes
    /// - `Err(e)` - Parse error
    pub fn parse(&mut self, buf: &[u8]) -> ParseResult<Option<(RespValue, usize)>> {
        self.depth = 0;
        self.parse_value(buf)
    }

    fn parse_value(&mut self, buf: &[u8]) -> ParseResult<Option<(RespValue, usize)>> {
        if buf.is_empty() {
            return Ok(None);
        }

        if self.depth > MAX_NESTING_DEPTH {
            return Err(ParseError::ProtocolError(format!(
                "maximum nesting depth exceeded: {}",
                MAX_NESTING_DEPTH
            )));
        }

        match buf[0] {
            prefix::SIMPLE_STRING => parse_simple_string(buf),
            prefix::ERROR => parse_error(buf),
            prefix::BULK_STRING => self.parse_bulk_string(buf),
            prefix::ARRAY => self.parse_array(buf),
            other => parse_unsupported(buf, other),
        }
    }

    /// Parses a bulk string: `$<length>\r\n<data>\r\n`
    fn parse_bulk_string(&mut self, buf: &[u8]) -> ParseResult<Option<(RespValue, usize)>> {
        debug_assert!(buf[0] == prefix::BULK_STRING);

        let (length, header_len) = match read_length(buf)? {
            Some(parsed) => parsed,
            None => return Ok(None),
        };

        if length == -1 {
            return Ok(Some((RespValue::Null, header_len)));
        }

        if length < 0 {
            return Err(ParseError::InvalidBulkLength(length));
        }

        let length = length as usize;

        if length > MAX_BULK_SIZE {
            return Err(ParseError::MessageTooLarge {
                size: length,
                max: MAX_BULK_SIZE,
            });
        }

        let total_needed = header_len + length + 2;
        if buf.len() < total_needed {
            return Ok(None);
        }

        if &buf[header_len + length..total_needed] != CRLF {
            return Err(ParseError::ProtocolError(
                "bulk string missing trailing CRLF".to_string(),
            ));
        }

        let data = Bytes::copy_from_slice(&buf[header_len..header_len + length]);

        Ok(Some((RespValue::BulkString(data), total_needed)))
    }

    /// Parses an array: `*<count>\r\n<elements...>`
    fn parse_array(&mut self, buf: &[u8]) -> ParseResult<Option<(RespValue, usize)>> {
        debug_assert!(buf[0] == prefix::ARRAY);

        let (count, mut consumed) = match read_length(buf)? {
            Some(parsed) => parsed,
            None => return Ok(None),
        };

        if count < 0 {
            return Err(ParseError::InvalidArrayLength(count));
        }

        let count = count as usize;
        // Cap the preallocation; the declared count is untrusted input.
        let mut elements = Vec::with_capacity(count.min(1024));

        self.depth += 1;
        for _ in 0..count {
            match self.parse_value(&buf[consumed..]) {
                Ok(Some((value, element_consumed))) => {
                    elements.push(value);
                    consumed += element_consumed;
                }
                other => {
                    self.depth -= 1;
                    return other.map(|_| None);
                }
            }
        }
        self.depth -= 1;

        Ok(Some((RespValue::Array(elements), consumed)))
    }
}

/// Parses `+<bytes>\r\n`. The content is kept as raw bytes.
fn parse_simple_string(buf: &[u8]) -> ParseResult<Option<(RespValue, usize)>> {
    Ok(read_line(buf)?.map(|(line, consumed)| {
        (
            RespValue::SimpleString(Bytes::copy_from_slice(line)),
            consumed,
        )
    }))
}

/// Parses `-<message>\r\n`.
fn parse_error(buf: &[u8]) -> ParseResult<Option<(RespValue, usize)>> {
    match read_line(buf)? {
        Some((line, consumed)) => {
            let message = std::str::from_utf8(line)
                .map_err(|e| ParseError::InvalidUtf8(e.to_string()))?;
            Ok(Some((RespValue::Error(message.to_string()), consumed)))
        }
        None => Ok(None),
    }
}

/// Skips the line of a unit with an unknown tag.
fn parse_unsupported(buf: &[u8], tag: u8) -> ParseResult<Option<(RespValue, usize)>> {
    Ok(read_line(buf)?.map(|(_, consumed)| (RespValue::Unsupported(tag), consumed)))
}

/// Reads the CRLF-terminated decimal after a type tag.
///
/// Returns the number and the count of bytes up to and including the CRLF.
fn read_length(buf: &[u8]) -> ParseResult<Option<(i64, usize)>> {
    let (line, consumed) = match read_line(buf)? {
        Some(parsed) => parsed,
        None => return Ok(None),
    };

    let text = std::str::from_utf8(line).map_err(|e| ParseError::InvalidUtf8(e.to_string()))?;

    let n: i64 = text
        .parse()
        .map_err(|e: ParseIntError| ParseError::InvalidInteger(format!("{:?}: {}", text, e)))?;

    Ok(Some((n, consumed)))
}

/// Returns the content of the line after the type tag, and the bytes used by
/// tag, content and CRLF together.
fn read_line(buf: &[u8]) -> ParseResult<Option<(&[u8], usize)>> {
    let body = &buf[1..];
    // Only look as far as the longest allowed line plus its CRLF
    let window = &body[..body.len().min(MAX_LINE_LENGTH + 2)];

    match find_crlf(window) {
        Some(pos) => Ok(Some((&body[..pos], 1 + pos + 2))),
        None if window.len() == MAX_LINE_LENGTH + 2 => Err(ParseError::LineTooLong {
            max: MAX_LINE_LENGTH,
        }),
        None => Ok(None),
    }
}

/// Finds the position of CRLF in the buffer.
///
/// Returns the position of `\r` if found, or None if CRLF is not present.
#[inline]
fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == CRLF)
}

/// Helper function to parse a single RESP unit from bytes.
///
/// This is a convenience function for simple use cases.
pub fn parse_message(buf: &[u8]) -> ParseResult<Option<(RespValue, usize)>> {
    RespParser::new().parse(buf)
}
