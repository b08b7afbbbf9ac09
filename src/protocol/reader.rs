//! Stream Decoding
//!
//! [`RespReader`] pulls bytes from any async byte stream (a client socket or
//! the append-only log file) and hands back one RESP unit at a time. It keeps
//! a `BytesMut` buffer because the stream may deliver a unit in pieces, or
//! several units at once.
//!
//! Three outcomes are kept apart:
//!
//! - `Ok(Some(value))`: one complete unit was decoded
//! - `Ok(None)`: the stream ended cleanly between units
//! - `Err(DecodeError::UnexpectedEof)`: the stream ended inside a unit
//!
//! The buffer never grows past a fixed limit: a unit that needs more than
//! that is rejected with [`DecodeError::BufferFull`].

use crate::protocol::parser::{ParseError, RespParser, MAX_BULK_SIZE};
use crate::protocol::types::RespValue;
use bytes::{Buf, BytesMut};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Initial buffer capacity
const INITIAL_BUFFER_SIZE: usize = 4096;

/// Maximum bytes buffered for one unit: the largest bulk string plus 1 MB of
/// headers and smaller arguments
pub const MAX_BUFFER_SIZE: usize = MAX_BULK_SIZE + 1024 * 1024;

/// Errors returned while decoding from a stream.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The bytes on the stream are not valid RESP
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// The underlying stream failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream ended part-way through a unit
    #[error("unexpected end of stream ({buffered} bytes of an incomplete unit)")]
    UnexpectedEof { buffered: usize },

    /// An incomplete unit filled the buffer
    #[error("buffer limit exceeded: {size} bytes buffered (max: {max})")]
    BufferFull { size: usize, max: usize },
}

/// Decodes RESP units from an async byte stream.
///
/// # Example
///
/// ```
/// use emberkv::protocol::{RespReader, RespValue};
///
/// # tokio_test::block_on(async {
/// let mut reader = RespReader::new(&b"*1\r\n$4\r\nPING\r\n"[..]);
/// let value = reader.read_value().await.unwrap();
/// assert_eq!(value, Some(RespValue::command(&["PING"])));
/// assert_eq!(reader.read_value().await.unwrap(), None);
/// # });
/// ```
#[derive(Debug)]
pub struct RespReader<R> {
    inner: R,
    buffer: BytesMut,
    parser: RespParser,
    /// Total bytes pulled from `inner`
    bytes_read: u64,
    /// Largest incomplete unit allowed in `buffer`
    max_buffered: usize,
}

impl<R: AsyncRead + Unpin> RespReader<R> {
    /// Wraps a stream.
    pub fn new(inner: R) -> Self {
        Self::with_limit(inner, MAX_BUFFER_SIZE)
    }

    /// Wraps a stream, buffering at most `max_buffered` bytes of an
    /// incomplete unit.
    pub fn with_limit(inner: R, max_buffered: usize) -> Self {
        Self {
            inner,
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_SIZE.min(max_buffered)),
            parser: RespParser::new(),
            bytes_read: 0,
            max_buffered,
        }
    }

    /// Decodes exactly one unit, reading from the stream as needed.
    ///
    /// Blocks until a whole unit is buffered, the stream closes, or the
    /// stream fails. Returns `Ok(None)` only when the stream closed with no
    /// partial unit buffered.
    pub async fn read_value(&mut self) -> Result<Option<RespValue>, DecodeError> {
        loop {
            if let Some((value, consumed)) = self.parser.parse(&self.buffer)? {
                self.buffer.advance(consumed);
                return Ok(Some(value));
            }

            let room = self.max_buffered.saturating_sub(self.buffer.len());
            if room == 0 {
                return Err(DecodeError::BufferFull {
                    size: self.buffer.len(),
                    max: self.max_buffered,
                });
            }

            if self.buffer.capacity() - self.buffer.len() < 1024 {
                self.buffer.reserve(INITIAL_BUFFER_SIZE);
            }

            let mut limited = (&mut self.inner).take(room as u64);
            let n = limited.read_buf(&mut self.buffer).await?;
            self.bytes_read += n as u64;
            if n == 0 {
                return if self.buffer.is_empty() {
                    Ok(None)
                } else {
                    Err(DecodeError::UnexpectedEof {
                        buffered: self.buffer.len(),
                    })
                };
            }
        }
    }

    /// Total number of bytes read from the stream so far.
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::parser::MAX_LINE_LENGTH;
    use tokio_test::io::Builder;

    #[tokio::test]
    async fn test_reads_units_in_order() {
        let data: &[u8] = b"*1\r\n$4\r\nPING\r\n*2\r\n$3\r\nGET\r\n$1\r\na\r\n";
        let mut reader = RespReader::new(data);

        assert_eq!(
            reader.read_value().await.unwrap(),
            Some(RespValue::command(&["PING"]))
        );
        assert_eq!(
            reader.read_value().await.unwrap(),
            Some(RespValue::command(&["GET", "a"]))
        );
        assert_eq!(reader.read_value().await.unwrap(), None);
        assert_eq!(reader.bytes_read(), data.len() as u64);
    }

    #[tokio::test]
    async fn test_unit_split_across_reads() {
        let mock = Builder::new()
            .read(b"*2\r\n$3\r")
            .read(b"\nGET\r\n$5\r\nhel")
            .read(b"lo\r\n")
            .build();
        let mut reader = RespReader::new(mock);

        assert_eq!(
            reader.read_value().await.unwrap(),
            Some(RespValue::command(&["GET", "hello"]))
        );
        assert_eq!(reader.read_value().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_empty_stream_is_end_of_input() {
        let mut reader = RespReader::new(&b""[..]);
        assert_eq!(reader.read_value().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_eof_inside_unit() {
        let mut reader = RespReader::new(&b"*2\r\n$3\r\nSET\r\n"[..]);
        let err = reader.read_value().await.unwrap_err();
        assert!(matches!(err, DecodeError::UnexpectedEof { buffered: 13 }));
    }

    #[tokio::test]
    async fn test_malformed_length() {
        let mut reader = RespReader::new(&b"*x\r\n"[..]);
        let err = reader.read_value().await.unwrap_err();
        assert!(matches!(err, DecodeError::Parse(ParseError::InvalidInteger(_))));
    }

    #[tokio::test]
    async fn test_unterminated_header_is_cut_off() {
        // A length line that never ends fails once the line limit is buffered,
        // long before the stream itself runs out
        let mut data = vec![b'*'];
        data.extend(std::iter::repeat(b'1').take(4 * MAX_LINE_LENGTH));
        let mut reader = RespReader::new(&data[..]);

        let err = reader.read_value().await.unwrap_err();
        assert!(matches!(
            err,
            DecodeError::Parse(ParseError::LineTooLong { .. })
        ));
        assert!(reader.bytes_read() < data.len() as u64);
    }

    #[tokio::test]
    async fn test_buffer_limit() {
        // Header fits, but the declared bulk is bigger than the reader allows
        let data: &[u8] = b"*1\r\n$100\r\naaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
        let mut reader = RespReader::with_limit(data, 32);

        let err = reader.read_value().await.unwrap_err();
        assert!(matches!(err, DecodeError::BufferFull { size: 32, max: 32 }));
    }

    #[tokio::test]
    async fn test_io_error_is_surfaced() {
        let mock = Builder::new()
            .read(b"*1\r\n")
            .read_error(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "reset",
            ))
            .build();
        let mut reader = RespReader::new(mock);
        let err = reader.read_value().await.unwrap_err();
        assert!(matches!(err, DecodeError::Io(ref e) if e.kind() == std::io::ErrorKind::ConnectionReset));
    }
}
