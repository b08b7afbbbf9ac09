//! Append-Only File (AOF)
//!
//! Every mutating command is written to the log, in RESP form, before it
//! is applied to the store. At startup the log is read back from the first
//! byte and each entry is applied again, rebuilding the store exactly as it
//! was.
//!
//! ## File Format
//!
//! No header, no checksums, no separators: the file is the concatenation of
//! the encoded request arrays, in commit order.
//!
//! ```text
//! *3\r\n$3\r\nSET\r\n$4\r\nname\r\n$4\r\nAriz\r\n*4\r\n$4\r\nHSET\r\n...
//! ```
//!
//! ## Locking
//!
//! One async mutex guards the file. Appends, replay and the periodic flush
//! all take it, so none of them ever interleave. [`AppendOnlyLog::append_with`]
//! also runs the in-memory mutation while holding it, so two clients
//! writing the same key are applied in the same order they were logged.

use crate::persistence::flush::FlushTask;
use crate::protocol::{DecodeError, RespReader, RespValue};
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncSeekExt, AsyncWriteExt};
use tokio::sync::Mutex;
use tracing::{debug, error, info};

/// How often the log is synced to disk unless configured otherwise.
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(1);

/// Errors from the append-only log.
#[derive(Debug, Error)]
pub enum AofError {
    /// Opening, writing, seeking or syncing the file failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Replay hit bytes that do not decode
    #[error("corrupt log entry #{entry}: {source}")]
    Corrupt {
        entry: usize,
        #[source]
        source: DecodeError,
    },

    /// The log has been closed
    #[error("append-only log is closed")]
    Closed,
}

/// The open file plus the length of its last complete entry.
#[derive(Debug)]
pub(crate) struct LogFile {
    pub(crate) file: File,
    len: u64,
}

impl LogFile {
    /// Writes one encoded entry and hands it to the OS.
    ///
    /// `len` only moves once the whole entry is out.
    async fn append(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        self.file.write_all(bytes).await?;
        // tokio::fs::File buffers internally; flush hands the bytes to the OS
        self.file.flush().await?;
        self.len += bytes.len() as u64;
        Ok(())
    }

    /// Cuts the file back to the end of the last complete entry.
    async fn rollback(&mut self) -> std::io::Result<()> {
        self.file.set_len(self.len).await
    }
}

/// The file slot shared between the log and its flush task.
/// `None` once the log is closed.
pub(crate) type SharedLogFile = Arc<Mutex<Option<LogFile>>>;

/// Durable, ordered record of every mutating command.
///
/// # Example
///
/// ```no_run
/// use emberkv::persistence::{AppendOnlyLog, DEFAULT_FLUSH_INTERVAL};
/// use emberkv::protocol::RespValue;
///
/// # async fn demo() -> Result<(), emberkv::persistence::AofError> {
/// let log = AppendOnlyLog::open("appendonly.aof", DEFAULT_FLUSH_INTERVAL).await?;
/// log.write_command(&RespValue::command(&["SET", "name", "Ariz"])).await?;
///
/// let replayed = log.replay(|entry| println!("{}", entry)).await?;
/// assert_eq!(replayed, 1);
/// log.close().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct AppendOnlyLog {
    path: PathBuf,
    file: SharedLogFile,
    flusher: FlushTask,
}

impl AppendOnlyLog {
    /// Opens (or creates) the log file and starts the background flush task.
    ///
    /// Must be called from within a Tokio runtime.
    pub async fn open(path: impl AsRef<Path>, flush_interval: Duration) -> Result<Self, AofError> {
        let path = path.as_ref().to_path_buf();

        let file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(&path)
            .await?;
        let len = file.metadata().await?.len();

        let file = Arc::new(Mutex::new(Some(LogFile { file, len })));
        let flusher = FlushTask::start(Arc::clone(&file), flush_interval);

        info!(path = %path.display(), bytes = len, "Append-only log opened");

        Ok(Self {
            path,
            file,
            flusher,
        })
    }

    /// Appends one command to the log.
    pub async fn write_command(&self, command: &RespValue) -> Result<(), AofError> {
        self.append_with(command, || ()).await
    }

    /// Appends `command`, then runs `apply` while still holding the log lock.
    ///
    /// `apply` only runs if the append succeeded. On failure, any bytes of the
    /// partial entry are truncated away so the log stays replayable.
    pub async fn append_with<T>(
        &self,
        command: &RespValue,
        apply: impl FnOnce() -> T,
    ) -> Result<T, AofError> {
        let bytes = command.serialize();

        let mut guard = self.file.lock().await;
        let log = guard.as_mut().ok_or(AofError::Closed)?;

        if let Err(e) = log.append(&bytes).await {
            error!(path = %self.path.display(), error = %e, "Failed to append to log");
            if let Err(trunc) = log.rollback().await {
                error!(error = %trunc, "Failed to roll back partial log entry");
            }
            return Err(e.into());
        }

        Ok(apply())
    }

    /// Reads the whole log from the start, calling `apply` for every entry in
    /// file order.
    ///
    /// Returns the number of entries replayed. Stops at the first entry that
    /// fails to decode, including one cut short by the end of the file.
    /// `apply` runs under the log lock and must not write to this log.
    pub async fn replay<F>(&self, mut apply: F) -> Result<usize, AofError>
    where
        F: FnMut(RespValue),
    {
        let mut guard = self.file.lock().await;
        let log = guard.as_mut().ok_or(AofError::Closed)?;

        log.file.seek(SeekFrom::Start(0)).await?;
        let mut reader = RespReader::new(&mut log.file);

        let mut entries = 0;
        loop {
            match reader.read_value().await {
                Ok(Some(value)) => {
                    apply(value);
                    entries += 1;
                }
                Ok(None) => break,
                Err(source) => {
                    return Err(AofError::Corrupt {
                        entry: entries + 1,
                        source,
                    })
                }
            }
        }

        debug!(path = %self.path.display(), entries, "Append-only log replayed");
        Ok(entries)
    }

    /// Forces everything written so far down to stable storage.
    pub async fn sync(&self) -> Result<(), AofError> {
        let mut guard = self.file.lock().await;
        let log = guard.as_mut().ok_or(AofError::Closed)?;
        log.file.sync_data().await?;
        Ok(())
    }

    /// Stops the flush task, syncs the file one last time and closes it.
    ///
    /// Closing an already closed log does nothing.
    pub async fn close(&self) -> Result<(), AofError> {
        self.flusher.shutdown().await;

        let mut guard = self.file.lock().await;
        if let Some(mut log) = guard.take() {
            log.file.flush().await?;
            log.file.sync_all().await?;
            info!(path = %self.path.display(), bytes = log.len, "Append-only log closed");
        }
        Ok(())
    }

    /// Size of the log in bytes.
    pub async fn size(&self) -> Result<u64, AofError> {
        let guard = self.file.lock().await;
        guard.as_ref().map(|log| log.len).ok_or(AofError::Closed)
    }

    /// Returns true once `close` has run.
    pub async fn is_closed(&self) -> bool {
        self.file.lock().await.is_none()
    }

    /// Path of the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The background flush task.
    pub fn flusher(&self) -> &FlushTask {
        &self.flusher
    }
}
