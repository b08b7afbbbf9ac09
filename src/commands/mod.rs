//! Command Handler Module
//!
//! This module implements the command processing layer for EmberKV.
//! It receives decoded RESP requests, executes them against the store, writes
//! the mutating ones through to the append-only log, and returns responses.
//!
//! ## Architecture
//!
//! ```text
//! Client Request
//!       │
//!       ▼
//! ┌─────────────────┐
//! │  RESP Reader    │  (protocol module)
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ CommandHandler  │  (this module)
//! │                 │
//! │  - Validate     │
//! │  - Log          │
//! │  - Execute      │
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │     Store       │  (storage module)
//! └─────────────────┘
//! ```
//!
//! ## Supported Commands
//!
//! - `PING [message]`
//! - `SET key value`, `GET key`
//! - `HSET hash key value`, `HGET hash key`, `HGETALL hash`
//!
//! `SET` and `HSET` are the only commands written to the log.

pub mod command;
pub mod handler;

pub use command::{Command, CommandError};
pub use handler::{requires_logging, CommandHandler, LOGGED_COMMANDS};
