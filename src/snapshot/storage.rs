//! Storage abstraction for room snapshots.
//!
//! The engine only needs a byte-valued key/value store with prefix
//! listing. Production backends sit behind this trait; tests use the
//! in-memory implementation.

use std::sync::Mutex;

use async_trait::async_trait;
use rustc_hash::FxHashMap;
use thiserror::Error;

/// A failed storage operation.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("storage error: {0}")]
pub struct StorageError(pub String);

impl StorageError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Async byte-valued key/value storage.
///
/// Keys are namespaced by room by the caller; implementations do not need
/// any room awareness. Operations may suspend the calling task.
#[async_trait]
pub trait SnapshotStorage: Send + Sync {
    async fn put(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError>;

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    async fn delete(&self, key: &str) -> Result<(), StorageError>;

    /// All keys starting with `prefix`, in unspecified order.
    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError>;
}

/// In-memory storage for tests and single-process rooms.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<FxHashMap<String, Vec<u8>>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys (test helper).
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().expect("storage lock").len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl SnapshotStorage for MemoryStorage {
    async fn put(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
        self.entries
            .lock()
            .map_err(|_| StorageError::new("poisoned"))?
            .insert(key.to_string(), value);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self
            .entries
            .lock()
            .map_err(|_| StorageError::new("poisoned"))?
            .get(key)
            .cloned())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.entries
            .lock()
            .map_err(|_| StorageError::new("poisoned"))?
            .remove(key);
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        Ok(self
            .entries
            .lock()
            .map_err(|_| StorageError::new("poisoned"))?
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_storage_round_trip() {
        let storage = MemoryStorage::new();

        storage.put("a/1", vec![1, 2, 3]).await.unwrap();
        storage.put("a/2", vec![4]).await.unwrap();
        storage.put("b/1", vec![5]).await.unwrap();

        assert_eq!(storage.get("a/1").await.unwrap(), Some(vec![1, 2, 3]));
        assert_eq!(storage.get("missing").await.unwrap(), None);

        let mut keys = storage.list("a/").await.unwrap();
        keys.sort();
        assert_eq!(keys, vec!["a/1".to_string(), "a/2".to_string()]);

        storage.delete("a/1").await.unwrap();
        assert_eq!(storage.get("a/1").await.unwrap(), None);
        assert_eq!(storage.len(), 2);
    }
}
