//! # EmberKV - A Durable In-Memory Key-Value Server
//!
//! EmberKV is a small Redis-style key-value server written in Rust. It keeps
//! binary-safe strings and hashes in memory, speaks a subset of the RESP
//! protocol, and survives restarts by writing every mutation to an
//! append-only log that is replayed at startup.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                              EmberKV                                    │
//! │                                                                         │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐                  │
//! │  │   Server    │───>│ Connection  │───>│  Command    │                  │
//! │  │ (Listener)  │    │  Handler    │    │  Handler    │                  │
//! │  └─────────────┘    └──────┬──────┘    └──────┬──────┘                  │
//! │                            │                  │ SET / HSET             │
//! │                            ▼                  ▼                         │
//! │                     ┌─────────────┐    ┌─────────────┐                  │
//! │                     │    RESP     │    │  AppendOnly │──> disk          │
//! │                     │   Codec     │    │     Log     │   (FlushTask)    │
//! │                     └─────────────┘    └──────┬──────┘                  │
//! │                                               ▼                         │
//! │                     ┌──────────────────────────────────────────────┐    │
//! │                     │                   Store                      │    │
//! │                     │   strings: RwLock       hashes: RwLock       │    │
//! │                     └──────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```no_run
//! use emberkv::{Server, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let server = Server::bind(&ServerConfig::default()).await?;
//!     server
//!         .run(async {
//!             let _ = tokio::signal::ctrl_c().await;
//!         })
//!         .await
//! }
//! ```
//!
//! ## Supported Commands
//!
//! - `PING [message]`
//! - `SET key value` / `GET key`
//! - `HSET hash field value` / `HGET hash field` / `HGETALL hash`
//!
//! ## Module Overview
//!
//! - [`protocol`]: RESP value model, buffer parser and stream reader
//! - [`storage`]: Thread-safe string and hash maps
//! - [`persistence`]: Append-only log and its background flush task
//! - [`commands`]: Command parsing and dispatch
//! - [`connection`]: Client connection management
//! - [`server`]: Startup, accept loop and shutdown
//!
//! ## Durability
//!
//! `SET` and `HSET` are appended to the log before they touch memory, under
//! the same lock, so the log and the store always agree on the order of
//! writes. If the append fails the client gets an error and nothing changes.
//! The log is synced to disk on a fixed interval and once more on shutdown.

pub mod commands;
pub mod config;
pub mod connection;
pub mod persistence;
pub mod protocol;
pub mod server;
pub mod storage;

pub use commands::CommandHandler;
pub use config::ServerConfig;
pub use connection::{handle_connection, ConnectionStats};
pub use persistence::{AofError, AppendOnlyLog};
pub use protocol::{ParseError, RespParser, RespReader, RespValue};
pub use server::Server;
pub use storage::Store;

/// The default port EmberKV listens on (same as Redis)
pub const DEFAULT_PORT: u16 = 6379;

/// The default host EmberKV binds to
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// The default location of the append-only log
pub const DEFAULT_AOF_PATH: &str = "appendonly.aof";

/// Version of EmberKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
