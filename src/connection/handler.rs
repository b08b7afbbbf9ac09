//! Connection Handler Module
//!
//! This module handles individual client connections to EmberKV.
//! Each client gets its own handler task that runs in a loop,
//! reading requests and sending responses.
//!
//! ## Connection Lifecycle
//!
//! ```text
//! 1. Client connects (TCP handshake)
//!        │
//!        ▼
//! 2. ConnectionHandler spawned
//!        │
//!        ▼
//! 3. ┌──────────────────────────────┐
//!    │      Main Loop               │
//!    │                              │
//!    │  ┌─────────────────────────┐ │
//!    │  │ Decode one request      │ │
//!    │  └───────────┬─────────────┘ │
//!    │              ▼               │
//!    │  ┌─────────────────────────┐ │
//!    │  │ Execute command         │ │
//!    │  └───────────┬─────────────┘ │
//!    │              ▼               │
//!    │  ┌─────────────────────────┐ │
//!    │  │ Encode + send response  │ │
//!    │  └───────────┬─────────────┘ │
//!    │              ▼               │
//!    │         [Loop back]          │
//!    └──────────────────────────────┘
//!        │
//!        ▼
//! 4. Client disconnects / protocol error
//!        │
//!        ▼
//! 5. Handler task ends
//! ```
//!
//! The handler works over any duplex byte stream, not only TCP, which keeps
//! it testable with `tokio::io::duplex`.

use crate::commands::CommandHandler;
use crate::protocol::{DecodeError, RespReader, RespValue};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufWriter, ReadHalf, WriteHalf};
use tokio::net::TcpStream;
use tracing::{debug, info, trace, warn};

/// Statistics for connection handling
#[derive(Debug, Default)]
pub struct ConnectionStats {
    /// Total number of connections accepted
    pub connections_accepted: AtomicU64,
    /// Currently active connections
    pub active_connections: AtomicU64,
    /// Total commands processed
    pub commands_processed: AtomicU64,
    /// Total bytes read
    pub bytes_read: AtomicU64,
    /// Total bytes written
    pub bytes_written: AtomicU64,
}

impl ConnectionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection_opened(&self) {
        self.connections_accepted.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn command_processed(&self) {
        self.commands_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn bytes_read(&self, count: u64) {
        self.bytes_read.fetch_add(count, Ordering::Relaxed);
    }

    pub fn bytes_written(&self, count: usize) {
        self.bytes_written
            .fetch_add(count as u64, Ordering::Relaxed);
    }
}

/// Handles a single client connection.
pub struct ConnectionHandler<S> {
    /// Request side of the stream
    reader: RespReader<ReadHalf<S>>,

    /// Response side of the stream
    writer: BufWriter<WriteHalf<S>>,

    /// Client's address (for logging)
    peer: String,

    /// The command handler (shared across connections)
    command_handler: CommandHandler,

    /// Connection statistics (shared)
    stats: Arc<ConnectionStats>,

    /// Bytes already reported to `stats`
    reported_read: u64,
}

impl<S: AsyncRead + AsyncWrite + Unpin> ConnectionHandler<S> {
    /// Creates a new connection handler.
    ///
    /// # Arguments
    ///
    /// * `stream` - The duplex stream for this connection
    /// * `peer` - How the client is named in logs
    /// * `command_handler` - The command handler for executing commands
    /// * `stats` - Shared connection statistics
    pub fn new(
        stream: S,
        peer: impl Into<String>,
        command_handler: CommandHandler,
        stats: Arc<ConnectionStats>,
    ) -> Self {
        stats.connection_opened();

        let (read_half, write_half) = tokio::io::split(stream);
        Self {
            reader: RespReader::new(read_half),
            writer: BufWriter::new(write_half),
            peer: peer.into(),
            command_handler,
            stats,
            reported_read: 0,
        }
    }

    /// Runs the main connection loop.
    ///
    /// Reads requests, executes them and sends back responses until the
    /// client disconnects or sends something that cannot be decoded.
    pub async fn run(mut self) -> Result<(), ConnectionError> {
        info!(client = %self.peer, "Client connected");

        let result = self.main_loop().await;

        match &result {
            Ok(()) => info!(client = %self.peer, "Client disconnected"),
            Err(e) if e.is_reset() => debug!(client = %self.peer, "Connection reset by client"),
            Err(e) => warn!(client = %self.peer, error = %e, "Connection error"),
        }

        self.stats.connection_closed();
        result
    }

    /// The main read-execute-respond loop.
    async fn main_loop(&mut self) -> Result<(), ConnectionError> {
        loop {
            let request = self.reader.read_value().await;
            self.report_bytes_read();

            let request = match request? {
                Some(request) => request,
                None => return Ok(()),
            };
            trace!(client = %self.peer, request = %request, "Received request");

            let response = self.command_handler.execute(request).await;
            self.stats.command_processed();

            self.send_response(&response).await?;
        }
    }

    fn report_bytes_read(&mut self) {
        let total = self.reader.bytes_read();
        self.stats.bytes_read(total - self.reported_read);
        self.reported_read = total;
    }

    /// Sends a response to the client.
    async fn send_response(&mut self, response: &RespValue) -> Result<(), ConnectionError> {
        let bytes = response.serialize();
        self.writer.write_all(&bytes).await?;
        self.writer.flush().await?;
        self.stats.bytes_written(bytes.len());
        trace!(client = %self.peer, bytes = bytes.len(), "Sent response");
        Ok(())
    }
}

/// Errors that end a connection.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// Writing the response failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The request stream could not be decoded
    #[error("{0}")]
    Decode(#[from] DecodeError),
}

impl ConnectionError {
    /// True if the peer reset the connection.
    pub fn is_reset(&self) -> bool {
        let io_err = match self {
            ConnectionError::Io(e) => e,
            ConnectionError::Decode(DecodeError::Io(e)) => e,
            _ => return false,
        };
        io_err.kind() == std::io::ErrorKind::ConnectionReset
    }
}

/// Handles a TCP client connection.
///
/// This is a convenience function that creates a ConnectionHandler
/// and runs it to completion.
pub async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    command_handler: CommandHandler,
    stats: Arc<ConnectionStats>,
) {
    let handler = ConnectionHandler::new(stream, addr.to_string(), command_handler, stats);
    // Errors have already been logged by `run`
    let _ = handler.run().await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Store;
    use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt, DuplexStream};
    use tokio::task::JoinHandle;

    fn spawn_handler(
        stats: Arc<ConnectionStats>,
    ) -> (DuplexStream, JoinHandle<Result<(), ConnectionError>>) {
        let (client, server) = duplex(4096);
        let handler = CommandHandler::new(Arc::new(Store::new()));
        let conn = ConnectionHandler::new(server, "test-client", handler, stats);
        (client, tokio::spawn(conn.run()))
    }

    async fn roundtrip(client: &mut DuplexStream, request: &[u8], expected: &[u8]) {
        client.write_all(request).await.unwrap();
        let mut buf = vec![0u8; expected.len()];
        client.read_exact(&mut buf).await.unwrap();
        assert_eq!(buf, expected, "{}", String::from_utf8_lossy(&buf));
    }

    #[tokio::test]
    async fn test_ping_pong() {
        let (mut client, _task) = spawn_handler(Arc::new(ConnectionStats::new()));
        roundtrip(&mut client, b"*1\r\n$4\r\nPING\r\n", b"+PONG\r\n").await;
    }

    #[tokio::test]
    async fn test_set_get() {
        let (mut client, _task) = spawn_handler(Arc::new(ConnectionStats::new()));

        roundtrip(
            &mut client,
            b"*3\r\n$3\r\nSET\r\n$4\r\nname\r\n$4\r\nAriz\r\n",
            b"+OK\r\n",
        )
        .await;
        roundtrip(&mut client, b"*2\r\n$3\r\nGET\r\n$4\r\nname\r\n", b"+Ariz\r\n").await;
        roundtrip(
            &mut client,
            b"*2\r\n$3\r\nGET\r\n$4\r\nnope\r\n",
            b"-ERR key not found\r\n",
        )
        .await;
    }

    #[tokio::test]
    async fn test_unknown_command_gets_empty_string() {
        let (mut client, _task) = spawn_handler(Arc::new(ConnectionStats::new()));
        roundtrip(&mut client, b"*1\r\n$5\r\nHELLO\r\n", b"+\r\n").await;
        // The connection stays usable
        roundtrip(&mut client, b"*1\r\n$4\r\nPING\r\n", b"+PONG\r\n").await;
    }

    #[tokio::test]
    async fn test_arity_error_keeps_connection_open() {
        let (mut client, _task) = spawn_handler(Arc::new(ConnectionStats::new()));
        roundtrip(
            &mut client,
            b"*2\r\n$3\r\nSET\r\n$1\r\na\r\n",
            b"-ERR wrong number of arguments for 'SET' command\r\n",
        )
        .await;
        roundtrip(&mut client, b"*1\r\n$4\r\nPING\r\n", b"+PONG\r\n").await;
    }

    #[tokio::test]
    async fn test_request_split_across_writes() {
        let (mut client, _task) = spawn_handler(Arc::new(ConnectionStats::new()));

        client.write_all(b"*2\r\n$4\r\nPI").await.unwrap();
        tokio::task::yield_now().await;
        roundtrip(&mut client, b"NG\r\n$2\r\nhi\r\n", b"+hi\r\n").await;
    }

    #[tokio::test]
    async fn test_clean_disconnect() {
        let stats = Arc::new(ConnectionStats::new());
        let (mut client, task) = spawn_handler(Arc::clone(&stats));

        roundtrip(&mut client, b"*1\r\n$4\r\nPING\r\n", b"+PONG\r\n").await;
        drop(client);

        assert!(task.await.unwrap().is_ok());
        assert_eq!(stats.connections_accepted.load(Ordering::Relaxed), 1);
        assert_eq!(stats.active_connections.load(Ordering::Relaxed), 0);
        assert_eq!(stats.commands_processed.load(Ordering::Relaxed), 1);
        assert_eq!(stats.bytes_read.load(Ordering::Relaxed), 14);
        assert_eq!(stats.bytes_written.load(Ordering::Relaxed), 7);
    }

    #[tokio::test]
    async fn test_protocol_error_closes_connection() {
        let (mut client, task) = spawn_handler(Arc::new(ConnectionStats::new()));

        client.write_all(b"*oops\r\n").await.unwrap();
        let result = task.await.unwrap();
        assert!(matches!(
            result,
            Err(ConnectionError::Decode(DecodeError::Parse(_)))
        ));

        let mut buf = Vec::new();
        client.read_to_end(&mut buf).await.unwrap();
        assert!(buf.is_empty());
    }

    #[tokio::test]
    async fn test_stored_crlf_cannot_forge_replies() {
        let (mut client, _task) = spawn_handler(Arc::new(ConnectionStats::new()));

        roundtrip(
            &mut client,
            b"*3\r\n$3\r\nSET\r\n$1\r\nk\r\n$16\r\nx\r\n-ERR injected\r\n",
            b"+OK\r\n",
        )
        .await;
        roundtrip(
            &mut client,
            b"*2\r\n$3\r\nGET\r\n$1\r\nk\r\n",
            b"$16\r\nx\r\n-ERR injected\r\n",
        )
        .await;
        // The next reply is still the answer to the next request
        roundtrip(&mut client, b"*1\r\n$4\r\nPING\r\n", b"+PONG\r\n").await;
    }

    #[tokio::test]
    async fn test_binary_value_roundtrip() {
        let (mut client, _task) = spawn_handler(Arc::new(ConnectionStats::new()));

        roundtrip(
            &mut client,
            b"*3\r\n$3\r\nSET\r\n$1\r\nk\r\n$3\r\n\xff\x00\x80\r\n",
            b"+OK\r\n",
        )
        .await;
        roundtrip(
            &mut client,
            b"*2\r\n$3\r\nGET\r\n$1\r\nk\r\n",
            b"+\xff\x00\x80\r\n",
        )
        .await;
    }

    #[test]
    fn test_reset_detection() {
        let reset = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        assert!(ConnectionError::Io(reset).is_reset());

        let reset = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        assert!(ConnectionError::from(DecodeError::Io(reset)).is_reset());

        let eof = ConnectionError::from(DecodeError::UnexpectedEof { buffered: 3 });
        assert!(!eof.is_reset());
    }

    #[tokio::test]
    async fn test_disconnect_mid_request() {
        let (mut client, task) = spawn_handler(Arc::new(ConnectionStats::new()));

        client.write_all(b"*2\r\n$3\r\nGET\r\n").await.unwrap();
        client.shutdown().await.unwrap();

        let result = task.await.unwrap();
        assert!(matches!(
            result,
            Err(ConnectionError::Decode(DecodeError::UnexpectedEof { .. }))
        ));
    }
}
