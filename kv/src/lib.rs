//! KvStore - single-blob key/value storage
//!
//! The timer engine persists its whole registry as one serialized blob
//! under a single logical key. This crate provides the storage seam for
//! that contract: a small synchronous [`Storage`] trait plus file-backed
//! and in-memory implementations, so any backend (file, embedded KV,
//! in-memory) can substitute without touching the engine.
//!
//! # Example
//!
//! ```ignore
//! use kvstore::{FileStorage, Storage};
//!
//! let mut storage = FileStorage::open(".tasktimer")?;
//! storage.set("task_timers", "[]")?;
//! let blob = storage.get("task_timers")?;
//! ```

mod store;

pub use store::{FileStorage, MemoryStorage, Storage, StorageError, StorageResult};
