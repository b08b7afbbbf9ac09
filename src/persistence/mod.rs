//! Persistence Module
//!
//! Crash recovery through an append-only command log.
//!
//! ```text
//!   CommandHandler ──SET/HSET──> AppendOnlyLog ──write──> appendonly.aof
//!                                     ▲                        │
//!                                     │ sync_data every 1s     │ replay at startup
//!                              ┌──────┴──────┐                 ▼
//!                              │  FlushTask  │          CommandHandler::replay
//!                              └─────────────┘
//! ```
//!
//! - `aof`: open, append, replay, close
//! - `flush`: the periodic background sync task

pub mod aof;
pub mod flush;

pub use aof::{AofError, AppendOnlyLog, DEFAULT_FLUSH_INTERVAL};
pub use flush::FlushTask;
