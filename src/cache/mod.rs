//! Local Cache Store
//!
//! Persists what the data service learned about the backend so later
//! sessions can skip probing and still show data while offline:
//!
//! - **kv**: string key/value backends (SQLite file or in-memory)
//! - **store**: typed access to table mappings, snapshots and sync time
//! - **error**: error types
//!
//! No schema versioning: values are JSON documents.

pub mod error;
pub mod kv;
pub mod store;

pub use error::{CacheError, CacheResult};
pub use kv::{KeyValueStore, MemoryStore, SqliteStore};
pub use store::CacheStore;
