//! Parsed Commands
//!
//! Every supported command is a variant of [`Command`]. Parsing checks the
//! name, the argument count and that every argument is a string, so
//! executing a `Command` cannot fail for protocol reasons. Arguments are kept
//! as raw bytes.

use crate::protocol::RespValue;
use crate::storage::Store;
use bytes::Bytes;
use thiserror::Error;

/// Why a request could not be turned into a [`Command`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// No command with this name exists
    #[error("ERR unknown command '{0}'")]
    UnknownCommand(String),

    /// The command exists but got the wrong number of arguments
    #[error("ERR wrong number of arguments for '{0}' command")]
    WrongArity(&'static str),

    /// An argument is not a string (for example a null bulk string)
    #[error("ERR invalid {what} for '{command}' command")]
    InvalidArgument {
        command: &'static str,
        what: &'static str,
    },
}

impl CommandError {
    /// The error as it is sent to the client.
    pub fn into_resp(self) -> RespValue {
        RespValue::error(self.to_string())
    }
}

/// A validated command, ready to run against a [`Store`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `PING [message]`
    Ping(Option<Bytes>),
    /// `SET key value`
    Set { key: Bytes, value: Bytes },
    /// `GET key`
    Get { key: Bytes },
    /// `HSET hash field value`
    HSet {
        hash: Bytes,
        field: Bytes,
        value: Bytes,
    },
    /// `HGET hash field`
    HGet { hash: Bytes, field: Bytes },
    /// `HGETALL hash`
    HGetAll { hash: Bytes },
}

impl Command {
    /// Builds a command from its name and arguments.
    ///
    /// The name is matched case-insensitively.
    pub fn parse(name: &str, args: &[RespValue]) -> Result<Command, CommandError> {
        let name = name.to_ascii_uppercase();
        let command = match name.as_str() {
            "PING" => {
                // Anything after the first argument is ignored
                let message = match args.first() {
                    Some(arg) => Some(bytes_arg(arg, "PING", "message")?),
                    None => None,
                };
                Command::Ping(message)
            }
            "SET" => {
                let [key, value] = exact_args::<2>(args, "SET")?;
                Command::Set {
                    key: bytes_arg(key, "SET", "key")?,
                    value: bytes_arg(value, "SET", "value")?,
                }
            }
            "GET" => {
                let [key] = exact_args::<1>(args, "GET")?;
                Command::Get {
                    key: bytes_arg(key, "GET", "key")?,
                }
            }
            "HSET" => {
                let [hash, field, value] = exact_args::<3>(args, "HSET")?;
                Command::HSet {
                    hash: bytes_arg(hash, "HSET", "hash")?,
                    field: bytes_arg(field, "HSET", "key")?,
                    value: bytes_arg(value, "HSET", "value")?,
                }
            }
            "HGET" => {
                let [hash, field] = exact_args::<2>(args, "HGET")?;
                Command::HGet {
                    hash: bytes_arg(hash, "HGET", "hash")?,
                    field: bytes_arg(field, "HGET", "key")?,
                }
            }
            "HGETALL" => {
                let [hash] = exact_args::<1>(args, "HGETALL")?;
                Command::HGetAll {
                    hash: bytes_arg(hash, "HGETALL", "hash")?,
                }
            }
            _ => return Err(CommandError::UnknownCommand(name)),
        };
        Ok(command)
    }

    /// The uppercase command name.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Ping(_) => "PING",
            Command::Set { .. } => "SET",
            Command::Get { .. } => "GET",
            Command::HSet { .. } => "HSET",
            Command::HGet { .. } => "HGET",
            Command::HGetAll { .. } => "HGETALL",
        }
    }

    /// Runs the command against the store and returns the reply.
    pub fn apply(self, store: &Store) -> RespValue {
        match self {
            Command::Ping(None) => RespValue::pong(),
            Command::Ping(Some(message)) => RespValue::string_reply(message),
            Command::Set { key, value } => {
                store.set(key, value);
                RespValue::ok()
            }
            Command::Get { key } => match store.get(&key) {
                Some(value) => RespValue::string_reply(value),
                None => RespValue::error("ERR key not found"),
            },
            Command::HSet { hash, field, value } => {
                store.hset(hash, field, value);
                RespValue::ok()
            }
            Command::HGet { hash, field } => match store.hget(&hash, &field) {
                Some(value) => RespValue::string_reply(value),
                None => RespValue::error("ERR key not found"),
            },
            Command::HGetAll { hash } => match store.hgetall(&hash) {
                Some(pairs) => RespValue::array(
                    pairs
                        .into_iter()
                        .flat_map(|(field, value)| {
                            [
                                RespValue::bulk_string(field),
                                RespValue::bulk_string(value),
                            ]
                        })
                        .collect(),
                ),
                None => RespValue::error("ERR hash not found"),
            },
        }
    }
}

fn exact_args<'a, const N: usize>(
    args: &'a [RespValue],
    command: &'static str,
) -> Result<&'a [RespValue; N], CommandError> {
    args.try_into()
        .map_err(|_| CommandError::WrongArity(command))
}

fn bytes_arg(
    value: &RespValue,
    command: &'static str,
    what: &'static str,
) -> Result<Bytes, CommandError> {
    value
        .to_bytes()
        .ok_or(CommandError::InvalidArgument { command, what })
}
