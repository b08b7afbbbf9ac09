//! Server Supervisor
//!
//! Owns the listener, the store and the append-only log, and ties their
//! lifetimes together:
//!
//! 1. open the log
//! 2. replay it into an empty store
//! 3. bind the listener
//! 4. accept clients until the shutdown future resolves
//! 5. close the log, then stop the connection tasks
//!
//! Clients are never accepted before replay has finished.

use crate::commands::CommandHandler;
use crate::config::ServerConfig;
use crate::connection::{handle_connection, ConnectionStats};
use crate::persistence::AppendOnlyLog;
use crate::protocol::RespValue;
use crate::storage::Store;
use anyhow::Context;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

/// A bound, fully restored server that has not started accepting yet.
#[derive(Debug)]
pub struct Server {
    listener: TcpListener,
    store: Arc<Store>,
    aof: Arc<AppendOnlyLog>,
    handler: CommandHandler,
    stats: Arc<ConnectionStats>,
}

impl Server {
    /// Opens and replays the log, then binds the listening socket.
    pub async fn bind(config: &ServerConfig) -> anyhow::Result<Self> {
        let aof = AppendOnlyLog::open(&config.aof_path, config.flush_interval)
            .await
            .with_context(|| {
                format!(
                    "failed to open append-only log at {}",
                    config.aof_path.display()
                )
            })?;
        let aof = Arc::new(aof);

        let store = Arc::new(Store::new());
        let handler = CommandHandler::with_aof(Arc::clone(&store), Arc::clone(&aof));

        let mut rejected = 0usize;
        let entries = aof
            .replay(|entry| {
                if let RespValue::Error(message) = handler.replay(entry) {
                    warn!(error = %message, "Logged command failed during replay");
                    rejected += 1;
                }
            })
            .await
            .with_context(|| {
                format!(
                    "failed to replay append-only log at {}",
                    config.aof_path.display()
                )
            })?;
        info!(
            path = %aof.path().display(),
            entries,
            rejected,
            keys = store.len(),
            hashes = store.hash_count(),
            "Store restored from append-only log"
        );

        let listener = TcpListener::bind(config.bind_address())
            .await
            .with_context(|| format!("failed to bind {}", config.bind_address()))?;
        info!(addr = %config.bind_address(), "Listening");

        Ok(Self {
            listener,
            store,
            aof,
            handler,
            stats: Arc::new(ConnectionStats::new()),
        })
    }

    /// The address the listener is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// The store shared by every connection.
    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    pub fn stats(&self) -> &Arc<ConnectionStats> {
        &self.stats
    }

    /// Accepts clients until `shutdown` resolves.
    ///
    /// On shutdown the listener is dropped, the log is closed (with a final
    /// sync) and only then are the remaining connection tasks aborted and
    /// joined.
    pub async fn run(self, shutdown: impl Future<Output = ()>) -> anyhow::Result<()> {
        let Server {
            listener,
            aof,
            handler,
            stats,
            ..
        } = self;

        let mut connections = JoinSet::new();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                accepted = listener.accept() => match accepted {
                    Ok((stream, addr)) => {
                        connections.spawn(handle_connection(
                            stream,
                            addr,
                            handler.clone(),
                            Arc::clone(&stats),
                        ));
                    }
                    Err(e) => error!(error = %e, "Failed to accept connection"),
                },
                Some(joined) = connections.join_next(), if !connections.is_empty() => {
                    if let Err(e) = joined {
                        if e.is_panic() {
                            error!(error = %e, "Connection task panicked");
                        }
                    }
                }
            }
        }

        info!("Shutdown signal received, stopping server...");
        drop(listener);

        let closed = aof.close().await;
        if let Err(e) = &closed {
            error!(path = %aof.path().display(), error = %e, "Failed to close append-only log");
        }

        connections.shutdown().await;

        info!(
            connections = stats.connections_accepted.load(Ordering::Relaxed),
            commands = stats.commands_processed.load(Ordering::Relaxed),
            bytes_read = stats.bytes_read.load(Ordering::Relaxed),
            bytes_written = stats.bytes_written.load(Ordering::Relaxed),
            "Server shutdown complete"
        );

        closed.context("failed to close append-only log")
    }
}
