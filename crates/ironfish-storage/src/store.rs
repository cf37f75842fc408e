use std::marker::PhantomData;

use crate::backend::StorageBackend;
use crate::codec::{KeyCodec, ValueCodec};
use crate::database::DbTransaction;
use crate::errors::StorageError;

/// A named, typed sub-keyspace of a database.
///
/// Every key in the store is prefixed with the store's one-byte id, so stores never
/// collide and a full-store scan is a single contiguous range. Store ids are part of the
/// on-disk schema; renaming or renumbering one requires a migration.
#[derive(Debug)]
pub struct Store<K, V> {
    id: u8,
    _marker: PhantomData<fn() -> (K, V)>,
}

impl<K, V> Clone for Store<K, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K, V> Copy for Store<K, V> {}

impl<K: KeyCodec, V: ValueCodec> Store<K, V> {
    pub const fn new(id: u8) -> Self {
        Self { id, _marker: PhantomData }
    }

    pub const fn id(&self) -> u8 {
        self.id
    }

    fn raw_key(&self, key: &K) -> Vec<u8> {
        let mut bytes = vec![self.id];
        bytes.extend_from_slice(&key.encode_key());
        bytes
    }

    pub fn get<B: StorageBackend>(
        &self,
        tx: &DbTransaction<'_, B>,
        key: &K,
    ) -> Result<Option<V>, StorageError> {
        match tx.get(&self.raw_key(key))? {
            Some(bytes) => Ok(Some(V::decode_value(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Like [`Store::get`] but treats absence as [`StorageError::NotFound`].
    pub fn must_get<B: StorageBackend>(
        &self,
        tx: &DbTransaction<'_, B>,
        key: &K,
    ) -> Result<V, StorageError> {
        self.get(tx, key)?.ok_or(StorageError::NotFound)
    }

    pub fn has<B: StorageBackend>(
        &self,
        tx: &DbTransaction<'_, B>,
        key: &K,
    ) -> Result<bool, StorageError> {
        Ok(tx.get(&self.raw_key(key))?.is_some())
    }

    pub fn put<B: StorageBackend>(
        &self,
        tx: &mut DbTransaction<'_, B>,
        key: &K,
        value: &V,
    ) -> Result<(), StorageError> {
        tx.put(self.raw_key(key), value.encode_value())
    }

    pub fn delete<B: StorageBackend>(
        &self,
        tx: &mut DbTransaction<'_, B>,
        key: &K,
    ) -> Result<(), StorageError> {
        tx.delete(self.raw_key(key))
    }

    /// Returns every entry in the store in ascending key order.
    pub fn iter<B: StorageBackend>(
        &self,
        tx: &DbTransaction<'_, B>,
    ) -> Result<Vec<(K, V)>, StorageError> {
        self.scan_raw(tx, &[])
    }

    /// Returns every entry in the store in descending key order.
    pub fn iter_rev<B: StorageBackend>(
        &self,
        tx: &DbTransaction<'_, B>,
    ) -> Result<Vec<(K, V)>, StorageError> {
        let mut entries = self.iter(tx)?;
        entries.reverse();
        Ok(entries)
    }

    /// Returns every entry whose encoded key starts with `prefix`, in ascending key order.
    ///
    /// The scan covers exactly `[prefix, prefix + 1)` in key space.
    pub fn iter_prefix<B: StorageBackend, P: KeyCodec>(
        &self,
        tx: &DbTransaction<'_, B>,
        prefix: &P,
    ) -> Result<Vec<(K, V)>, StorageError> {
        self.scan_raw(tx, &prefix.encode_key())
    }

    /// Returns every entry under `prefix` in descending key order.
    pub fn iter_prefix_rev<B: StorageBackend, P: KeyCodec>(
        &self,
        tx: &DbTransaction<'_, B>,
        prefix: &P,
    ) -> Result<Vec<(K, V)>, StorageError> {
        let mut entries = self.iter_prefix(tx, prefix)?;
        entries.reverse();
        Ok(entries)
    }

    /// Deletes every entry in the store.
    pub fn clear<B: StorageBackend>(
        &self,
        tx: &mut DbTransaction<'_, B>,
    ) -> Result<(), StorageError> {
        for (key, _) in self.iter(tx)? {
            self.delete(tx, &key)?;
        }
        Ok(())
    }

    fn scan_raw<B: StorageBackend>(
        &self,
        tx: &DbTransaction<'_, B>,
        prefix: &[u8],
    ) -> Result<Vec<(K, V)>, StorageError> {
        let mut start = vec![self.id];
        start.extend_from_slice(prefix);
        let end = prefix_upper_bound(&start);

        let mut entries = Vec::new();
        for (raw_key, raw_value) in tx.scan(&start, end.as_deref())? {
            let key = K::decode_key(&raw_key[1..])?;
            let value = V::decode_value(&raw_value)?;
            entries.push((key, value));
        }
        Ok(entries)
    }
}

/// Returns the smallest byte string strictly greater than every string starting with
/// `prefix`, or `None` when the prefix is all 0xff and no finite bound exists.
///
/// Increments the last non-0xff byte and truncates after it.
pub fn prefix_upper_bound(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut bound = prefix.to_vec();
    while let Some(last) = bound.last_mut() {
        if *last < 0xff {
            *last += 1;
            return Some(bound);
        }
        bound.pop();
    }
    None
}

// PREFIX KEY
// ================================================================================================

/// A composite key scoping `key` under `prefix`, e.g. account-scoped note commitments.
///
/// The prefix component must be fixed-width so the two parts can be split on decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PrefixKey<P, K> {
    pub prefix: P,
    pub key: K,
}

impl<P, K> PrefixKey<P, K> {
    pub fn new(prefix: P, key: K) -> Self {
        Self { prefix, key }
    }
}

impl<P: KeyCodec, K: KeyCodec> KeyCodec for PrefixKey<P, K> {
    const WIDTH: Option<usize> = match (P::WIDTH, K::WIDTH) {
        (Some(p), Some(k)) => Some(p + k),
        _ => None,
    };

    fn encode_key(&self) -> Vec<u8> {
        let mut bytes = self.prefix.encode_key();
        bytes.extend_from_slice(&self.key.encode_key());
        bytes
    }

    fn decode_key(bytes: &[u8]) -> Result<Self, StorageError> {
        let split = P::WIDTH
            .ok_or_else(|| StorageError::corrupt("prefix component must be fixed-width"))?;
        if bytes.len() < split {
            return Err(StorageError::corrupt("prefixed key shorter than its prefix"));
        }
        Ok(Self {
            prefix: P::decode_key(&bytes[..split])?,
            key: K::decode_key(&bytes[split..])?,
        })
    }
}

// TESTS
// ================================================================================================

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use ironfish_protocol::hash::BlockHash;
    use ironfish_protocol::sequence::Sequence;

    use super::*;
    use crate::database::{Database, TransactionMode};

    const HEADERS: Store<BlockHash, u64> = Store::new(1);
    const SEQUENCES: Store<Sequence, BlockHash> = Store::new(2);
    const SCOPED: Store<PrefixKey<u32, Sequence>, u64> = Store::new(3);

    #[tokio::test]
    async fn stores_do_not_collide() {
        let db = Database::default();
        let hash = BlockHash::new([7u8; 32]);
        db.with_write::<_, StorageError>(|tx| {
            HEADERS.put(tx, &hash, &11)?;
            SEQUENCES.put(tx, &Sequence::new(1), &hash)?;
            Ok(())
        })
        .await
        .unwrap();

        let tx = db.begin(TransactionMode::Read).await;
        assert_eq!(HEADERS.get(&tx, &hash).unwrap(), Some(11));
        assert_eq!(SEQUENCES.get(&tx, &Sequence::new(1)).unwrap(), Some(hash));
        assert_eq!(HEADERS.iter(&tx).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn must_get_maps_absence_to_not_found() {
        let db = Database::default();
        let tx = db.begin(TransactionMode::Read).await;
        assert_matches!(
            HEADERS.must_get(&tx, &BlockHash::new([1u8; 32])).unwrap_err(),
            StorageError::NotFound
        );
    }

    #[tokio::test]
    async fn prefix_scan_is_scoped() {
        let db = Database::default();
        db.with_write::<_, StorageError>(|tx| {
            for account in [1u32, 2] {
                for seq in 1..=3u32 {
                    let key = PrefixKey::new(account, Sequence::new(seq));
                    SCOPED.put(tx, &key, &(account as u64 * 100 + seq as u64))?;
                }
            }
            Ok(())
        })
        .await
        .unwrap();

        let tx = db.begin(TransactionMode::Read).await;
        let entries = SCOPED.iter_prefix(&tx, &1u32).unwrap();
        assert_eq!(entries.len(), 3);
        assert!(entries.iter().all(|(key, _)| key.prefix == 1));
        // ordering follows the inner key
        let seqs: Vec<u32> = entries.iter().map(|(key, _)| key.key.as_u32()).collect();
        assert_eq!(seqs, vec![1, 2, 3]);

        let reversed = SCOPED.iter_prefix_rev(&tx, &1u32).unwrap();
        let seqs: Vec<u32> = reversed.iter().map(|(key, _)| key.key.as_u32()).collect();
        assert_eq!(seqs, vec![3, 2, 1]);
    }

    #[test]
    fn upper_bound_increments_and_truncates() {
        assert_eq!(prefix_upper_bound(&[1, 2, 3]), Some(vec![1, 2, 4]));
        assert_eq!(prefix_upper_bound(&[1, 0xff]), Some(vec![2]));
        assert_eq!(prefix_upper_bound(&[0xff, 0xff]), None);
    }
}
