//! RESP Value Model
//!
//! This module defines the values carried by EmberKV's wire protocol, a
//! binary-safe subset of RESP (REdis Serialization Protocol).
//!
//! ## Protocol Format
//!
//! Each unit starts with a one-byte type tag:
//! - `+` Simple String
//! - `-` Error
//! - `$` Bulk String
//! - `*` Array
//!
//! All lines are terminated with CRLF (`\r\n`).
//!
//! ## Examples
//!
//! Simple String: `+OK\r\n`
//! Error: `-ERR key not found\r\n`
//! Bulk String: `$5\r\nhello\r\n`
//! Array: `*2\r\n$3\r\nGET\r\n$4\r\nname\r\n`
//! Null Bulk String: `$-1\r\n`
//!
//! Integers exist in the value model but are never put on the wire: like any
//! other unsupported kind they serialize to nothing.
//!
//! Simple strings and errors are single lines, so they can never contain CR
//! or LF. Stored data goes out through [`RespValue::string_reply`], which
//! falls back to a bulk string when a value would break the line.

use bytes::Bytes;
use std::fmt;

/// The CRLF terminator used in RESP protocol
pub const CRLF: &[u8] = b"\r\n";

/// RESP protocol type prefixes
pub mod prefix {
    pub const SIMPLE_STRING: u8 = b'+';
    pub const ERROR: u8 = b'-';
    pub const INTEGER: u8 = b':';
    pub const BULK_STRING: u8 = b'$';
    pub const ARRAY: u8 = b'*';
}

/// The only encoding of a null value this server produces.
pub const NULL_BULK: &[u8] = b"$-1\r\n";

/// Represents a value in the RESP protocol.
///
/// This enum is used both for decoded requests and for outgoing responses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RespValue {
    /// A single line of raw bytes, without CR or LF.
    /// Format: `+<string>\r\n`
    SimpleString(Bytes),

    /// Errors are similar to simple strings but indicate an error condition.
    /// Format: `-<error message>\r\n`
    Error(String),

    /// 64-bit signed integer. Part of the model only; serializes to nothing.
    Integer(i64),

    /// Binary-safe string carrying exactly its declared number of bytes.
    /// Format: `$<length>\r\n<data>\r\n`
    BulkString(Bytes),

    /// Null bulk string: `$-1\r\n`
    Null,

    /// Ordered, possibly empty sequence of values.
    /// Format: `*<count>\r\n<element1><element2>...`
    Array(Vec<RespValue>),

    /// A unit whose type tag the decoder does not support. The rest of its
    /// line has been discarded. Serializes to nothing.
    Unsupported(u8),
}

impl RespValue {
    /// Creates a new simple string response.
    ///
    /// # Example
    /// ```
    /// use emberkv::protocol::types::RespValue;
    /// let ok = RespValue::simple_string("OK");
    /// assert_eq!(ok.serialize(), b"+OK\r\n");
    /// ```
    pub fn simple_string(s: impl Into<Bytes>) -> Self {
        RespValue::SimpleString(s.into())
    }

    /// Reply carrying stored or client-supplied data.
    ///
    /// A simple string when the data fits on one line, otherwise a bulk
    /// string, so the reply always decodes back to exactly one value.
    ///
    /// # Example
    /// ```
    /// use emberkv::protocol::types::RespValue;
    /// assert_eq!(RespValue::string_reply("Ariz").serialize(), b"+Ariz\r\n");
    /// assert_eq!(RespValue::string_reply("a\r\nb").serialize(), b"$4\r\na\r\nb\r\n");
    /// ```
    pub fn string_reply(data: impl Into<Bytes>) -> Self {
        let data = data.into();
        if data.iter().any(|&b| b == b'\r' || b == b'\n') {
            RespValue::BulkString(data)
        } else {
            RespValue::SimpleString(data)
        }
    }

    /// Creates a new error response.
    ///
    /// CR and LF in the message are replaced by spaces.
    ///
    /// # Example
    /// ```
    /// use emberkv::protocol::types::RespValue;
    /// let err = RespValue::error("ERR key not found");
    /// assert!(err.is_error());
    /// ```
    pub fn error(s: impl Into<String>) -> Self {
        let mut message = s.into();
        if message.contains(['\r', '\n']) {
            message = message.replace(['\r', '\n'], " ");
        }
        RespValue::Error(message)
    }

    /// Creates a new bulk string.
    ///
    /// # Example
    /// ```
    /// use emberkv::protocol::types::RespValue;
    /// use bytes::Bytes;
    /// let bulk = RespValue::bulk_string(Bytes::from("hello"));
    /// assert_eq!(bulk.serialize(), b"$5\r\nhello\r\n");
    /// ```
    pub fn bulk_string(data: impl Into<Bytes>) -> Self {
        RespValue::BulkString(data.into())
    }

    /// Creates a null response.
    pub fn null() -> Self {
        RespValue::Null
    }

    /// Creates an array value.
    pub fn array(values: Vec<RespValue>) -> Self {
        RespValue::Array(values)
    }

    /// Builds a request array from string parts, each sent as a bulk string.
    ///
    /// ```
    /// use emberkv::protocol::RespValue;
    /// let request = RespValue::command(&["SET", "name", "Ariz"]);
    /// assert_eq!(request.as_array().map(|a| a.len()), Some(3));
    /// ```
    pub fn command<S: AsRef<str>>(parts: &[S]) -> Self {
        RespValue::Array(
            parts
                .iter()
                .map(|p| RespValue::BulkString(Bytes::copy_from_slice(p.as_ref().as_bytes())))
                .collect(),
        )
    }

    /// Common response for successful operations
    pub fn ok() -> Self {
        RespValue::SimpleString(Bytes::from_static(b"OK"))
    }

    /// Common response for PING
    pub fn pong() -> Self {
        RespValue::SimpleString(Bytes::from_static(b"PONG"))
    }

    /// Serializes the value to its wire format.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.serialize_into(&mut buf);
        buf
    }

    /// Serializes the value into an existing buffer.
    ///
    /// This is more efficient than `serialize()` when you want to reuse a buffer.
    pub fn serialize_into(&self, buf: &mut Vec<u8>) {
        match self {
            RespValue::SimpleString(s) => {
                buf.push(prefix::SIMPLE_STRING);
                buf.extend_from_slice(s);
                buf.extend_from_slice(CRLF);
            }
            RespValue::Error(s) => {
                buf.push(prefix::ERROR);
                buf.extend_from_slice(s.as_bytes());
                buf.extend_from_slice(CRLF);
            }
            RespValue::BulkString(data) => {
                buf.push(prefix::BULK_STRING);
                buf.extend_from_slice(data.len().to_string().as_bytes());
                buf.extend_from_slice(CRLF);
                buf.extend_from_slice(data);
                buf.extend_from_slice(CRLF);
            }
            RespValue::Null => buf.extend_from_slice(NULL_BULK),
            RespValue::Array(values) => {
                buf.push(prefix::ARRAY);
                buf.extend_from_slice(values.len().to_string().as_bytes());
                buf.extend_from_slice(CRLF);
                for value in values {
                    value.serialize_into(buf);
                }
            }
            RespValue::Integer(_) | RespValue::Unsupported(_) => {}
        }
    }

    /// Returns true if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, RespValue::Null)
    }

    /// Returns true if this value is an error.
    pub fn is_error(&self) -> bool {
        matches!(self, RespValue::Error(_))
    }

    /// Attempts to extract the inner string from SimpleString or BulkString.
    ///
    /// Contents that are not valid UTF-8 yield `None`.
    pub fn as_str(&self) -> Option<&str> {
        self.as_bytes().and_then(|b| std::str::from_utf8(b).ok())
    }

    /// Attempts to extract the inner bytes from SimpleString or BulkString.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            RespValue::SimpleString(b) | RespValue::BulkString(b) => Some(b),
            _ => None,
        }
    }

    /// Like [`as_bytes`](Self::as_bytes), but returns a cheap clone of the
    /// shared buffer.
    pub fn to_bytes(&self) -> Option<Bytes> {
        match self {
            RespValue::SimpleString(b) | RespValue::BulkString(b) => Some(b.clone()),
            _ => None,
        }
    }

    /// Attempts to extract the inner array.
    pub fn as_array(&self) -> Option<&[RespValue]> {
        match self {
            RespValue::Array(arr) => Some(arr),
            _ => None,
        }
    }

    /// Consumes self and returns the inner array if this is an Array variant.
    pub fn into_array(self) -> Option<Vec<RespValue>> {
        match self {
            RespValue::Array(arr) => Some(arr),
            _ => None,
        }
    }
}

impl fmt::Display for RespValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RespValue::SimpleString(s) => write!(f, "\"{}\"", String::from_utf8_lossy(s)),
            RespValue::Error(s) => write!(f, "(error) {}", s),
            RespValue::Integer(n) => write!(f, "(integer) {}", n),
            RespValue::BulkString(data) => {
                if let Ok(s) = std::str::from_utf8(data) {
                    write!(f, "\"{}\"", s)
                } else {
                    write!(f, "(binary data, {} bytes)", data.len())
                }
            }
            RespValue::Null => write!(f, "(nil)"),
            RespValue::Array(values) => {
                if values.is_empty() {
                    write!(f, "(empty array)")
                } else {
                    writeln!(f)?;
                    for (i, v) in values.iter().enumerate() {
                        writeln!(f, "{}) {}", i + 1, v)?;
                    }
                    Ok(())
                }
            }
            RespValue::Unsupported(tag) => write!(f, "(unsupported type {:#04x})", tag),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_string_serialize() {
        let value = RespValue::simple_string("OK");
        assert_eq!(value.serialize(), b"+OK\r\n");
    }

    #[test]
    fn test_empty_simple_string_serialize() {
        assert_eq!(RespValue::simple_string("").serialize(), b"+\r\n");
    }

    #[test]
    fn test_error_serialize() {
        let value = RespValue::error("ERR key not found");
        assert_eq!(value.serialize(), b"-ERR key not found\r\n");
    }

    #[test]
    fn test_bulk_string_serialize() {
        let value = RespValue::bulk_string(Bytes::from("hello"));
        assert_eq!(value.serialize(), b"$5\r\nhello\r\n");
    }

    #[test]
    fn test_binary_bulk_string_serialize() {
        let value = RespValue::bulk_string(Bytes::from_static(b"a\r\n\x00b"));
        assert_eq!(value.serialize(), b"$5\r\na\r\n\x00b\r\n");
    }

    #[test]
    fn test_null_serialize() {
        assert_eq!(RespValue::null().serialize(), b"$-1\r\n");
    }

    #[test]
    fn test_array_serialize() {
        let value = RespValue::command(&["GET", "name"]);
        assert_eq!(value.serialize(), b"*2\r\n$3\r\nGET\r\n$4\r\nname\r\n");
    }

    #[test]
    fn test_empty_array_serialize() {
        assert_eq!(RespValue::array(vec![]).serialize(), b"*0\r\n");
    }

    #[test]
    fn test_nested_array_serialize() {
        let value = RespValue::array(vec![
            RespValue::simple_string("a"),
            RespValue::array(vec![RespValue::null()]),
        ]);
        assert_eq!(value.serialize(), b"*2\r\n+a\r\n*1\r\n$-1\r\n");
    }

    #[test]
    fn test_unsupported_kinds_serialize_to_nothing() {
        assert!(RespValue::Integer(42).serialize().is_empty());
        assert!(RespValue::Unsupported(b':').serialize().is_empty());
    }

    #[test]
    fn test_ok_and_pong() {
        assert_eq!(RespValue::ok().serialize(), b"+OK\r\n");
        assert_eq!(RespValue::pong().serialize(), b"+PONG\r\n");
    }

    #[test]
    fn test_string_reply_keeps_framing() {
        assert_eq!(
            RespValue::string_reply("plain"),
            RespValue::simple_string("plain")
        );

        let reply = RespValue::string_reply("x\r\n-ERR injected");
        assert_eq!(reply.serialize(), b"$16\r\nx\r\n-ERR injected\r\n");

        let lone_lf = RespValue::string_reply("a\nb");
        assert!(matches!(lone_lf, RespValue::BulkString(_)));
    }

    #[test]
    fn test_binary_simple_string() {
        let value = RespValue::string_reply(Bytes::from_static(&[0xff, 0x00, 0x80]));
        assert_eq!(value.serialize(), b"+\xff\x00\x80\r\n");
        assert_eq!(value.as_str(), None);
        assert_eq!(value.as_bytes(), Some(&[0xff, 0x00, 0x80][..]));
    }

    #[test]
    fn test_error_message_stays_on_one_line() {
        let err = RespValue::error("ERR unknown command 'A\r\n+OK'");
        assert_eq!(err.serialize(), b"-ERR unknown command 'A  +OK'\r\n");
    }

    #[test]
    fn test_as_str_rejects_invalid_utf8() {
        let value = RespValue::bulk_string(Bytes::from_static(&[0xff, 0xfe]));
        assert_eq!(value.as_str(), None);
        assert_eq!(value.as_bytes(), Some(&[0xff, 0xfe][..]));
    }
}
