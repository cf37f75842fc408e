use std::collections::{HashSet, VecDeque};

use ironfish_protocol::hash::TransactionHash;

/// A bounded memory of transactions evicted for being underpriced.
///
/// Evicted transactions tend to be re-gossiped immediately by peers that still hold them;
/// remembering them lets admission refuse the retry without re-running verification.
#[derive(Debug)]
pub struct RecentlyEvictedCache {
    order: VecDeque<TransactionHash>,
    members: HashSet<TransactionHash>,
    capacity: usize,
}

impl RecentlyEvictedCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            order: VecDeque::with_capacity(capacity),
            members: HashSet::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    pub fn contains(&self, hash: &TransactionHash) -> bool {
        self.members.contains(hash)
    }

    pub fn insert(&mut self, hash: TransactionHash) {
        if !self.members.insert(hash) {
            return;
        }
        self.order.push_back(hash);
        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.members.remove(&oldest);
            }
        }
    }

    /// Drops a hash, letting a transaction re-enter ahead of cache expiry. Used when a
    /// reorg returns a previously-evicted transaction to circulation.
    pub fn remove(&mut self, hash: &TransactionHash) {
        if self.members.remove(hash) {
            self.order.retain(|entry| entry != hash);
        }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

// TESTS
// ================================================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn hash(tag: u8) -> TransactionHash {
        TransactionHash::new([tag; 32])
    }

    #[test]
    fn evicts_oldest_first() {
        let mut cache = RecentlyEvictedCache::new(2);
        cache.insert(hash(1));
        cache.insert(hash(2));
        cache.insert(hash(3));
        assert!(!cache.contains(&hash(1)));
        assert!(cache.contains(&hash(2)));
        assert!(cache.contains(&hash(3)));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn duplicate_inserts_do_not_grow() {
        let mut cache = RecentlyEvictedCache::new(2);
        cache.insert(hash(1));
        cache.insert(hash(1));
        assert_eq!(cache.len(), 1);
    }
}
