//! Storage trait and backends

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

/// Errors from storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Synchronous key/value storage holding one serialized blob per key.
///
/// A missing key reads as `Ok(None)`; backends must never fail on a
/// well-formed empty result.
pub trait Storage: Send {
    /// Read the blob stored under `key`
    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Write `value` under `key`, replacing any previous blob
    fn set(&mut self, key: &str, value: &str) -> StorageResult<()>;
}

/// File-backed storage: one file per key under a base directory
pub struct FileStorage {
    base_path: PathBuf,
}

impl FileStorage {
    /// Open or create file storage rooted at the given directory
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let base_path = path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path)?;
        debug!(?base_path, "Opened file storage");
        Ok(Self { base_path })
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.base_path.join(format!("{}.json", key))
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let path = self.key_path(key);
        if !path.exists() {
            debug!(%key, "get: no blob on disk");
            return Ok(None);
        }
        let blob = fs::read_to_string(&path)?;
        Ok(Some(blob))
    }

    fn set(&mut self, key: &str, value: &str) -> StorageResult<()> {
        let path = self.key_path(key);
        // Write through a sibling temp file so a crash mid-write cannot
        // leave a truncated blob behind.
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        debug!(%key, bytes = value.len(), "set: blob written");
        Ok(())
    }
}

/// In-memory storage for tests and embedding
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: HashMap<String, String>,
}

impl MemoryStorage {
    /// Create an empty in-memory store
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> StorageResult<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
