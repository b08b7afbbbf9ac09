//! Background Log Flusher
//!
//! Appends hand their bytes to the operating system straight away, but the
//! OS is free to keep them in its page cache. This task periodically forces
//! the log file down to stable storage with `sync_data`.
//!
//! ## Design
//!
//! The flusher runs as a Tokio task and:
//! 1. Sleeps for a fixed interval (default: 1s)
//! 2. Takes the log lock, so a flush never lands in the middle of an append
//!    or of replay
//! 3. Syncs the file and releases the lock
//!
//! It keeps running until [`FlushTask::stop`] is called, the handle is
//! dropped, or the log is closed underneath it.

use crate::persistence::aof::SharedLogFile;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, trace, warn};

/// Smallest accepted flush interval.
const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// A handle to the running flush task.
///
/// When this handle is dropped, the task will be stopped.
#[derive(Debug)]
pub struct FlushTask {
    /// Sender to signal shutdown
    shutdown_tx: watch::Sender<bool>,
    /// The spawned task, taken by `shutdown`
    handle: Mutex<Option<JoinHandle<()>>>,
    /// Completed flushes
    flushes: Arc<AtomicU64>,
}

impl FlushTask {
    /// Starts flushing `file` every `interval`.
    pub(crate) fn start(file: SharedLogFile, interval: Duration) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let flushes = Arc::new(AtomicU64::new(0));

        let handle = tokio::spawn(flush_loop(
            file,
            interval.max(MIN_INTERVAL),
            shutdown_rx,
            Arc::clone(&flushes),
        ));

        debug!(interval_ms = interval.as_millis(), "Log flush task started");

        Self {
            shutdown_tx,
            handle: Mutex::new(Some(handle)),
            flushes,
        }
    }

    /// Signals the task to stop without waiting for it.
    ///
    /// This is called automatically when the handle is dropped.
    pub fn stop(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// Stops the task and waits until it has exited.
    pub async fn shutdown(&self) {
        self.stop();
        let handle = self.handle.lock().unwrap().take();
        if let Some(handle) = handle {
            match handle.await {
                Ok(()) => debug!("Log flush task stopped"),
                Err(e) => warn!(error = %e, "Log flush task failed"),
            }
        }
    }

    /// Returns true while the task is alive.
    pub fn is_running(&self) -> bool {
        self.handle
            .lock()
            .unwrap()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Number of successful flushes so far.
    pub fn flush_count(&self) -> u64 {
        self.flushes.load(Ordering::Relaxed)
    }
}

impl Drop for FlushTask {
    fn drop(&mut self) {
        self.stop();
    }
}

/// The main flush loop.
async fn flush_loop(
    file: SharedLogFile,
    interval: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
    flushes: Arc<AtomicU64>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            result = shutdown_rx.changed() => {
                if result.is_err() || *shutdown_rx.borrow() {
                    debug!("Log flush task received shutdown signal");
                    return;
                }
            }
        }

        let mut guard = file.lock().await;
        let Some(log) = guard.as_mut() else {
            debug!("Append-only log closed, flush task exiting");
            return;
        };

        match log.file.sync_data().await {
            Ok(()) => {
                flushes.fetch_add(1, Ordering::Relaxed);
                trace!("Append-only log flushed");
            }
            Err(e) => warn!(error = %e, "Periodic log flush failed"),
        }
    }
}
