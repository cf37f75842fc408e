use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::RwLock;

use crate::errors::StorageError;

/// One buffered mutation: `Some` writes the value, `None` deletes the key.
pub type BatchEntry = (Vec<u8>, Option<Vec<u8>>);

/// The seam to the underlying ordered key-value engine.
///
/// A backend must apply a whole batch atomically: either every entry is visible afterwards
/// or none is. Range scans return entries in key order and are taken against a consistent
/// view of the data.
pub trait StorageBackend: Send + Sync + 'static {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError>;

    /// Returns all entries with `start <= key < end`, in ascending key order.
    fn scan(
        &self,
        start: Bound<&[u8]>,
        end: Bound<&[u8]>,
    ) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StorageError>;

    /// Applies the batch atomically.
    fn commit(&self, batch: Vec<BatchEntry>) -> Result<(), StorageError>;
}

// MEMORY BACKEND
// ================================================================================================

/// An ordered in-memory backend.
///
/// The node's transaction layer serializes writers above this type, so the inner lock is
/// uncontended in practice; it exists to make the backend safe to share across read tasks.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.read().expect("storage lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns a full copy of the stored entries. Test-support: lets suites compare
    /// database states byte for byte.
    pub fn dump(&self) -> BTreeMap<Vec<u8>, Vec<u8>> {
        self.entries.read().expect("storage lock poisoned").clone()
    }
}

impl StorageBackend for MemoryBackend {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        let entries = self.entries.read().expect("storage lock poisoned");
        Ok(entries.get(key).cloned())
    }

    fn scan(
        &self,
        start: Bound<&[u8]>,
        end: Bound<&[u8]>,
    ) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StorageError> {
        let entries = self.entries.read().expect("storage lock poisoned");
        Ok(entries
            .range::<[u8], (Bound<&[u8]>, Bound<&[u8]>)>((start, end))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect())
    }

    fn commit(&self, batch: Vec<BatchEntry>) -> Result<(), StorageError> {
        let mut entries = self.entries.write().expect("storage lock poisoned");
        for (key, value) in batch {
            match value {
                Some(value) => {
                    entries.insert(key, value);
                },
                None => {
                    entries.remove(&key);
                },
            }
        }
        Ok(())
    }
}
