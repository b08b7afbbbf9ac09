//! Server configuration.

use crate::persistence::DEFAULT_FLUSH_INTERVAL;
use crate::{DEFAULT_AOF_PATH, DEFAULT_HOST, DEFAULT_PORT};
use std::path::PathBuf;
use std::time::Duration;

/// Everything the server needs to start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on (0 picks a free port)
    pub port: u16,
    /// Location of the append-only log
    pub aof_path: PathBuf,
    /// How often the log is synced to disk
    pub flush_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            aof_path: PathBuf::from(DEFAULT_AOF_PATH),
            flush_interval: DEFAULT_FLUSH_INTERVAL,
        }
    }
}

impl ServerConfig {
    /// Returns the bind address as a string
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
