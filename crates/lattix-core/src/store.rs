//! Pluggable partition blob storage.
//!
//! Evicted partitions are serialized and handed to a `PartitionStore`; the
//! manager never assumes anything about the backing medium beyond the
//! store/retrieve/delete contract. Two implementations ship with the crate:
//! an in-memory store (tests, ephemeral sessions) and a directory-backed
//! file store (one blob file per partition).

use dashmap::DashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised by partition stores.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error storing partition '{partition_id}': {source}")]
    Io {
        partition_id: String,
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    pub(crate) fn io(partition_id: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            partition_id: partition_id.into(),
            source,
        }
    }
}

/// Key/value blob storage for serialized partitions.
///
/// Implementations must be safe to call from concurrent partition loads;
/// the manager serializes operations per partition id but not across ids.
pub trait PartitionStore: Send + Sync {
    /// Persist the serialized form of a partition
    fn store(&self, partition_id: &str, bytes: Vec<u8>) -> Result<(), StoreError>;

    /// Retrieve a previously stored partition, or None if absent
    fn retrieve(&self, partition_id: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Delete a stored partition (absent ids are not an error)
    fn delete(&self, partition_id: &str) -> Result<(), StoreError>;
}

// ============================================================================
// In-Memory Store
// ============================================================================

/// Partition store backed by a concurrent hash map.
#[derive(Debug, Default)]
pub struct MemoryStore {
    blobs: DashMap<String, Vec<u8>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored partitions
    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}

impl PartitionStore for MemoryStore {
    fn store(&self, partition_id: &str, bytes: Vec<u8>) -> Result<(), StoreError> {
        self.blobs.insert(partition_id.to_string(), bytes);
        Ok(())
    }

    fn retrieve(&self, partition_id: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.blobs.get(partition_id).map(|b| b.clone()))
    }

    fn delete(&self, partition_id: &str) -> Result<(), StoreError> {
        self.blobs.remove(partition_id);
        Ok(())
    }
}

// ============================================================================
// File Store
// ============================================================================

/// Partition store writing one blob file per partition under a directory.
#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Create a store rooted at `dir`, creating the directory if needed
    pub fn new(dir: &Path) -> Result<Self, StoreError> {
        std::fs::create_dir_all(dir).map_err(|e| StoreError::io(dir.to_string_lossy(), e))?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    /// Blob file path for a partition id
    fn blob_path(&self, partition_id: &str) -> PathBuf {
        // Sanitize partition ID for use as filename
        let safe_name = partition_id.replace(['/', '\\', ':'], "_");
        self.dir.join(format!("{}.bin", safe_name))
    }
}

impl PartitionStore for FileStore {
    fn store(&self, partition_id: &str, bytes: Vec<u8>) -> Result<(), StoreError> {
        std::fs::write(self.blob_path(partition_id), bytes)
            .map_err(|e| StoreError::io(partition_id, e))
    }

    fn retrieve(&self, partition_id: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let path = self.blob_path(partition_id);
        if !path.exists() {
            return Ok(None);
        }
        std::fs::read(&path)
            .map(Some)
            .map_err(|e| StoreError::io(partition_id, e))
    }

    fn delete(&self, partition_id: &str) -> Result<(), StoreError> {
        let path = self.blob_path(partition_id);
        if path.exists() {
            std::fs::remove_file(&path).map_err(|e| StoreError::io(partition_id, e))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_round_trip() {
        let store = MemoryStore::new();
        store.store("p1", vec![1, 2, 3]).unwrap();

        assert_eq!(store.retrieve("p1").unwrap(), Some(vec![1, 2, 3]));
        assert_eq!(store.retrieve("missing").unwrap(), None);

        store.delete("p1").unwrap();
        assert_eq!(store.retrieve("p1").unwrap(), None);
        // Deleting again is not an error
        store.delete("p1").unwrap();
    }

    #[test]
    fn test_file_store_round_trip() {
        let temp = tempfile::tempdir().unwrap();
        let store = FileStore::new(temp.path()).unwrap();

        store.store("src/core", b"payload".to_vec()).unwrap();
        assert_eq!(
            store.retrieve("src/core").unwrap(),
            Some(b"payload".to_vec())
        );

        // Partition ids with separators map to sanitized filenames
        assert!(temp.path().join("src_core.bin").exists());

        store.delete("src/core").unwrap();
        assert_eq!(store.retrieve("src/core").unwrap(), None);
    }
}
