//! Connection Handler Module
//!
//! This module manages individual client connections to EmberKV.
//! Each client connection is handled by its own async task; all of them
//! share one store and one append-only log.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     TCP Listener                            │
//! │                    (server.rs)                              │
//! └──────────────────────┬──────────────────────────────────────┘
//!                        │
//!                        │ accept()
//!                        ▼
//!           ┌────────────────────────┐
//!           │   For each client...   │
//!           └────────────┬───────────┘
//!                        │
//!                        │ spawn task
//!                        ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 ConnectionHandler                           │
//! │                                                             │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐      │
//! │  │ RespReader  │───>│ Execute cmd │───>│ Send resp   │      │
//! │  └─────────────┘    └─────────────┘    └─────────────┘      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each request gets exactly one response, in the order requests arrive.
//! A request that cannot be decoded ends the connection.
//!
//! ## Example
//!
//! ```ignore
//! use emberkv::connection::{handle_connection, ConnectionStats};
//! use emberkv::commands::CommandHandler;
//! use emberkv::storage::Store;
//! use std::sync::Arc;
//!
//! let store = Arc::new(Store::new());
//! let stats = Arc::new(ConnectionStats::new());
//! let handler = CommandHandler::new(store);
//!
//! // For each accepted connection...
//! let (stream, addr) = listener.accept().await?;
//! tokio::spawn(handle_connection(stream, addr, handler.clone(), stats));
//! ```

pub mod handler;

pub use handler::{handle_connection, ConnectionError, ConnectionHandler, ConnectionStats};
