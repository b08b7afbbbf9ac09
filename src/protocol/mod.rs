//! RESP Protocol Implementation
//!
//! The wire codec shared by client connections and the append-only log.
//!
//! ## Modules
//!
//! - `types`: Defines the `RespValue` enum and its serialization (encode)
//! - `parser`: Incremental parser over byte buffers
//! - `reader`: Decodes one unit at a time from an async byte stream
//!
//! ## Example
//!
//! ```
//! use emberkv::protocol::{parse_message, RespValue};
//! use bytes::Bytes;
//!
//! // Parsing incoming data
//! let data = b"*2\r\n$3\r\nGET\r\n$4\r\nname\r\n";
//! let (value, consumed) = parse_message(data).unwrap().unwrap();
//! assert_eq!(consumed, data.len());
//!
//! // Encoding it again gives back the same bytes
//! assert_eq!(value.serialize(), data);
//!
//! // Creating responses
//! let response = RespValue::bulk_string(Bytes::from("Ariz"));
//! assert_eq!(response.serialize(), b"$4\r\nAriz\r\n");
//! ```

pub mod parser;
pub mod reader;
pub mod types;

pub use parser::{parse_message, ParseError, ParseResult, RespParser};
pub use reader::{DecodeError, RespReader};
pub use types::RespValue;
