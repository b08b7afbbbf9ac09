//! Command Dispatcher
//!
//! Turns request arrays into [`Command`]s, decides which of them must be
//! written through to the append-only log, and runs them against the store.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     CommandHandler                          │
//! │                                                             │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐      │
//! │  │  execute()  │───>│ dispatch()  │───>│   apply()   │      │
//! │  └─────────────┘    └──────┬──────┘    └──────┬──────┘      │
//! │                            │ SET/HSET          │            │
//! │                            ▼                   ▼            │
//! │                     AppendOnlyLog            Store          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! A mutating command is appended to the log first and applied to the store
//! only if the append succeeded, both under the log lock. The log therefore
//! never misses a mutation that a client saw acknowledged, and never orders
//! two writes differently from memory.

use crate::commands::command::{Command, CommandError};
use crate::persistence::AppendOnlyLog;
use crate::protocol::RespValue;
use crate::storage::Store;
use bytes::Bytes;
use std::sync::Arc;
use tracing::{debug, error};

/// Commands that change state and therefore go through the log.
pub const LOGGED_COMMANDS: &[&str] = &["SET", "HSET"];

/// Returns true if `name` (already uppercase) must be written to the log.
pub fn requires_logging(name: &str) -> bool {
    LOGGED_COMMANDS.contains(&name)
}

/// Dispatches requests to command implementations.
///
/// Cheap to clone; every connection task gets its own copy sharing the same
/// store and log.
#[derive(Clone, Debug)]
pub struct CommandHandler {
    /// The shared store
    store: Arc<Store>,
    /// Write-through log, if persistence is enabled
    aof: Option<Arc<AppendOnlyLog>>,
}

impl CommandHandler {
    /// Creates a handler without persistence.
    pub fn new(store: Arc<Store>) -> Self {
        Self { store, aof: None }
    }

    /// Creates a handler that writes mutating commands to `aof`.
    pub fn with_aof(store: Arc<Store>, aof: Arc<AppendOnlyLog>) -> Self {
        Self {
            store,
            aof: Some(aof),
        }
    }

    /// The store this handler operates on.
    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    /// Executes a client request and returns the response.
    ///
    /// An unknown command is answered with an empty simple string and
    /// touches nothing.
    pub async fn execute(&self, request: RespValue) -> RespValue {
        let (name, args) = match split_request(&request) {
            Ok(parts) => parts,
            Err(reply) => return reply,
        };

        match Command::parse(&name, args) {
            Ok(command) => self.run(command, &request).await,
            Err(CommandError::UnknownCommand(name)) => {
                debug!(command = %name, "Unknown command");
                RespValue::simple_string("")
            }
            Err(e) => e.into_resp(),
        }
    }

    /// Dispatches a command by name.
    ///
    /// Unlike [`execute`](Self::execute), an unknown name produces an error
    /// value.
    pub async fn dispatch(&self, name: &str, args: &[RespValue]) -> RespValue {
        match Command::parse(name, args) {
            Ok(command) => {
                let mut parts = Vec::with_capacity(args.len() + 1);
                parts.push(RespValue::bulk_string(Bytes::copy_from_slice(name.as_bytes())));
                parts.extend_from_slice(args);
                self.run(command, &RespValue::array(parts)).await
            }
            Err(e) => e.into_resp(),
        }
    }

    /// Applies a request read back from the log.
    ///
    /// Same effect on the store as [`execute`](Self::execute), but nothing is
    /// written to the log. Unknown commands come back as an error value so
    /// replay can report them.
    pub fn replay(&self, request: RespValue) -> RespValue {
        let (name, args) = match split_request(&request) {
            Ok(parts) => parts,
            Err(reply) => return reply,
        };

        match Command::parse(&name, args) {
            Ok(command) => command.apply(&self.store),
            Err(e) => e.into_resp(),
        }
    }

    async fn run(&self, command: Command, request: &RespValue) -> RespValue {
        let aof = match &self.aof {
            Some(aof) if requires_logging(command.name()) => aof,
            _ => return command.apply(&self.store),
        };

        let store = &self.store;
        match aof.append_with(request, || command.apply(store)).await {
            Ok(reply) => reply,
            Err(e) => {
                error!(error = %e, "Rejected write, log append failed");
                RespValue::error(format!("ERR persistence failure: {}", e))
            }
        }
    }
}

/// Splits a request array into its command name and arguments.
fn split_request(request: &RespValue) -> Result<(String, &[RespValue]), RespValue> {
    let parts = match request {
        RespValue::Array(parts) => parts,
        _ => return Err(RespValue::error("ERR invalid request, expected an array")),
    };

    let (first, args) = match parts.split_first() {
        Some(split) => split,
        None => return Err(RespValue::error("ERR empty command")),
    };

    let name = match first {
        RespValue::BulkString(_) | RespValue::SimpleString(_) => match first.as_str() {
            Some(s) => s.to_ascii_uppercase(),
            None => return Err(RespValue::error("ERR invalid command name")),
        },
        _ => return Err(RespValue::error("ERR invalid command name")),
    };

    Ok((name, args))
}
