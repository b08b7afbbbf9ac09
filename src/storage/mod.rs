//! Storage Module
//!
//! The in-memory state of EmberKV: a flat string map and a hash-of-hashes,
//! each guarded by its own `RwLock`. The store is never written to disk;
//! durability comes from the append-only log in [`crate::persistence`].

pub mod store;

pub use store::Store;
