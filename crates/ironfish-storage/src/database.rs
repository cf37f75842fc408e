use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::Arc;

use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

use crate::backend::{BatchEntry, MemoryBackend, StorageBackend};
use crate::errors::StorageError;

/// Whether a transaction may write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionMode {
    Read,
    ReadWrite,
}

/// A handle to one logical database.
///
/// All access goes through transactions. A [`TransactionMode::ReadWrite`] transaction holds
/// the database's writer lock exclusively for its whole lifetime, so there is at most one
/// writer and its view cannot shift under it. Read transactions share the lock and see the
/// last committed state.
#[derive(Debug)]
pub struct Database<B: StorageBackend = MemoryBackend> {
    backend: Arc<B>,
    lock: Arc<RwLock<()>>,
}

impl<B: StorageBackend> Clone for Database<B> {
    fn clone(&self) -> Self {
        Self { backend: self.backend.clone(), lock: self.lock.clone() }
    }
}

impl Default for Database<MemoryBackend> {
    fn default() -> Self {
        Self::new(MemoryBackend::new())
    }
}

impl<B: StorageBackend> Database<B> {
    pub fn new(backend: B) -> Self {
        Self { backend: Arc::new(backend), lock: Arc::new(RwLock::new(())) }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Begins a transaction in the given mode, waiting for the writer lock as needed.
    pub async fn begin(&self, mode: TransactionMode) -> DbTransaction<'_, B> {
        let guard = match mode {
            TransactionMode::Read => TxGuard::Read { _guard: self.lock.read().await },
            TransactionMode::ReadWrite => TxGuard::Write { _guard: self.lock.write().await },
        };
        DbTransaction { backend: &self.backend, overlay: BTreeMap::new(), guard }
    }

    /// Runs `f` inside an exclusive transaction, committing on `Ok` and rolling back on
    /// `Err`.
    ///
    /// Nested units of work reuse the outer transaction by taking `&mut DbTransaction`
    /// parameters rather than opening their own.
    pub async fn with_write<T, E>(
        &self,
        f: impl FnOnce(&mut DbTransaction<'_, B>) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<StorageError>,
    {
        let mut tx = self.begin(TransactionMode::ReadWrite).await;
        let value = f(&mut tx)?;
        tx.commit()?;
        Ok(value)
    }

    /// Runs `f` inside a shared read transaction.
    pub async fn with_read<T, E>(
        &self,
        f: impl FnOnce(&DbTransaction<'_, B>) -> Result<T, E>,
    ) -> Result<T, E> {
        let tx = self.begin(TransactionMode::Read).await;
        f(&tx)
    }
}

enum TxGuard<'db> {
    Read { _guard: RwLockReadGuard<'db, ()> },
    Write { _guard: RwLockWriteGuard<'db, ()> },
}

// TRANSACTION
// ================================================================================================

/// A unit of atomic work against a [`Database`].
///
/// Writes are buffered in an overlay and applied to the backend in one batch on
/// [`DbTransaction::commit`]; until then they are visible only to reads made through this
/// transaction (read-your-own-writes). Dropping the transaction without committing rolls
/// everything back.
pub struct DbTransaction<'db, B: StorageBackend> {
    backend: &'db B,
    /// `None` marks a pending delete.
    overlay: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
    guard: TxGuard<'db>,
}

impl<B: StorageBackend> DbTransaction<'_, B> {
    pub fn mode(&self) -> TransactionMode {
        match self.guard {
            TxGuard::Read { .. } => TransactionMode::Read,
            TxGuard::Write { .. } => TransactionMode::ReadWrite,
        }
    }

    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        if let Some(pending) = self.overlay.get(key) {
            return Ok(pending.clone());
        }
        self.backend.get(key)
    }

    pub fn put(&mut self, key: Vec<u8>, value: Vec<u8>) -> Result<(), StorageError> {
        self.require_writable()?;
        self.overlay.insert(key, Some(value));
        Ok(())
    }

    pub fn delete(&mut self, key: Vec<u8>) -> Result<(), StorageError> {
        self.require_writable()?;
        self.overlay.insert(key, None);
        Ok(())
    }

    /// Scans `start <= key < end` (or to the end of the keyspace when `end` is `None`),
    /// merging committed state with this transaction's own pending writes. Entries come
    /// back in ascending key order.
    pub fn scan(
        &self,
        start: &[u8],
        end: Option<&[u8]>,
    ) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StorageError> {
        let end_bound = end.map_or(Bound::Unbounded, Bound::Excluded);
        let committed = self.backend.scan(Bound::Included(start), end_bound)?;

        if self.overlay.is_empty() {
            return Ok(committed);
        }

        let mut merged: BTreeMap<Vec<u8>, Vec<u8>> = committed.into_iter().collect();
        for (key, value) in self
            .overlay
            .range::<[u8], (Bound<&[u8]>, Bound<&[u8]>)>((Bound::Included(start), end_bound))
        {
            match value {
                Some(value) => {
                    merged.insert(key.clone(), value.clone());
                },
                None => {
                    merged.remove(key);
                },
            }
        }
        Ok(merged.into_iter().collect())
    }

    /// Number of buffered mutations.
    pub fn pending_writes(&self) -> usize {
        self.overlay.len()
    }

    /// Applies every buffered write atomically.
    pub fn commit(self) -> Result<(), StorageError> {
        if self.overlay.is_empty() {
            return Ok(());
        }
        let batch: Vec<BatchEntry> = self.overlay.into_iter().collect();
        debug!(target: "ironfish::storage", entries = batch.len(), "committing batch");
        self.backend.commit(batch)
    }

    /// Discards every buffered write.
    pub fn rollback(mut self) {
        self.overlay.clear();
    }

    fn require_writable(&self) -> Result<(), StorageError> {
        match self.guard {
            TxGuard::Write { .. } => Ok(()),
            TxGuard::Read { .. } => Err(StorageError::ReadOnlyTransaction),
        }
    }
}

// TESTS
// ================================================================================================
