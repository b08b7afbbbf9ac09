//! The Key-Value Store
//!
//! Two independent maps, each behind its own `RwLock`:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                          Store                              │
//! │  ┌───────────────────────┐   ┌────────────────────────────┐ │
//! │  │ strings (RwLock)      │   │ hashes (RwLock)            │ │
//! │  │ key -> value          │   │ hash -> { field -> value } │ │
//! │  └───────────────────────┘   └────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Readers take the shared lock, writers the exclusive one. The two maps are
//! never locked together, so there is no ordering between them. Nothing in
//! here performs I/O.
//!
//! Keys, fields and values are arbitrary bytes.

use bytes::Bytes;
use std::collections::HashMap;
use std::sync::RwLock;

/// In-memory state of the server.
///
/// Designed to be wrapped in an `Arc` and shared by every connection task and
/// by log replay. Each `Store` is independent, so tests can create as many as
/// they like.
///
/// # Example
///
/// ```
/// use emberkv::storage::Store;
///
/// let store = Store::new();
/// store.set("name", "Ariz");
/// assert_eq!(store.get("name").as_deref(), Some(&b"Ariz"[..]));
///
/// store.hset("user:1", "lang", "rust");
/// assert_eq!(store.hget("user:1", "lang").as_deref(), Some(&b"rust"[..]));
/// ```
#[derive(Debug, Default)]
pub struct Store {
    /// Flat string map
    strings: RwLock<HashMap<Bytes, Bytes>>,
    /// Hash of hashes
    hashes: RwLock<HashMap<Bytes, HashMap<Bytes, Bytes>>>,
}

impl Store {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a string value.
    ///
    /// Returns `true` if the key was new.
    pub fn set(&self, key: impl Into<Bytes>, value: impl Into<Bytes>) -> bool {
        let mut strings = self.strings.write().unwrap();
        strings.insert(key.into(), value.into()).is_none()
    }

    /// Gets a string value.
    pub fn get(&self, key: impl AsRef<[u8]>) -> Option<Bytes> {
        let strings = self.strings.read().unwrap();
        strings.get(key.as_ref()).cloned()
    }

    /// Sets a field of a hash, creating the hash if needed.
    ///
    /// An existing hash is updated in place. Returns `true` if the field was new.
    pub fn hset(
        &self,
        hash: impl Into<Bytes>,
        field: impl Into<Bytes>,
        value: impl Into<Bytes>,
    ) -> bool {
        let mut hashes = self.hashes.write().unwrap();
        hashes
            .entry(hash.into())
            .or_default()
            .insert(field.into(), value.into())
            .is_none()
    }

    /// Gets one field of a hash.
    ///
    /// `None` if either the hash or the field is missing.
    pub fn hget(&self, hash: impl AsRef<[u8]>, field: impl AsRef<[u8]>) -> Option<Bytes> {
        let hashes = self.hashes.read().unwrap();
        hashes
            .get(hash.as_ref())
            .and_then(|fields| fields.get(field.as_ref()))
            .cloned()
    }

    /// Returns every field/value pair of a hash, in no particular order.
    ///
    /// `None` if the hash does not exist. The pairs are copied out under a
    /// single read lock, so they form a consistent snapshot.
    pub fn hgetall(&self, hash: impl AsRef<[u8]>) -> Option<Vec<(Bytes, Bytes)>> {
        let hashes = self.hashes.read().unwrap();
        hashes.get(hash.as_ref()).map(|fields| {
            fields
                .iter()
                .map(|(f, v)| (f.clone(), v.clone()))
                .collect()
        })
    }

    /// Number of keys in the flat map.
    pub fn len(&self) -> usize {
        self.strings.read().unwrap().len()
    }

    /// Returns true if the flat map is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of hashes.
    pub fn hash_count(&self) -> usize {
        self.hashes.read().unwrap().len()
    }
}
