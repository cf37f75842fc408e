use std::cmp::Reverse;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use ironfish_chain::{Blockchain, ChainError, ChainEvent, ValidationReason};
use ironfish_protocol::block::Block;
use ironfish_protocol::hash::{Nullifier, TransactionHash};
use ironfish_protocol::provider::CryptoProvider;
use ironfish_protocol::sequence::Sequence;
use ironfish_protocol::serde::Serializable;
use ironfish_protocol::transaction::Transaction;
use ironfish_storage::{MemoryBackend, StorageBackend};
use thiserror::Error;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, warn};

use crate::fee_rate::FeeRate;
use crate::recently_evicted::RecentlyEvictedCache;

// ERRORS
// ================================================================================================

#[derive(Debug, Error)]
pub enum MempoolAcceptError {
    #[error("transaction is already in the mempool")]
    Duplicate,

    #[error("transaction failed validation: {0}")]
    Invalid(ValidationReason),

    #[error("nullifier {nullifier} is already used by a pending transaction")]
    DoubleSpendMempool { nullifier: Nullifier },

    #[error("transaction expired at or before sequence {0}")]
    Expired(Sequence),

    #[error("transaction fee rate is below the eviction floor")]
    Underpriced,

    #[error("transaction of {size} bytes exceeds the mempool capacity")]
    TooLarge { size: usize },

    #[error(transparent)]
    Chain(#[from] ChainError),
}

// CONFIG
// ================================================================================================

#[derive(Debug, Clone)]
pub struct MemPoolConfig {
    /// Total serialized size the pool may hold before evicting.
    pub max_size_bytes: usize,
    /// How many evicted hashes to remember for fast re-refusal.
    pub recently_evicted_capacity: usize,
}

impl Default for MemPoolConfig {
    fn default() -> Self {
        Self { max_size_bytes: 60 * 1024 * 1024, recently_evicted_capacity: 1024 }
    }
}

// ENTRIES
// ================================================================================================

/// Ascending order puts the least attractive transaction first: lowest fee rate, then the
/// latest arrival, hash as the final disambiguator.
type PriorityKey = (FeeRate, Reverse<u64>, TransactionHash);

struct MempoolEntry {
    transaction: Arc<Transaction>,
    fee_rate: FeeRate,
    arrival: u64,
    size: usize,
}

impl MempoolEntry {
    fn priority_key(&self, hash: TransactionHash) -> PriorityKey {
        (self.fee_rate, Reverse(self.arrival), hash)
    }
}

#[derive(Default)]
struct Inner {
    transactions: HashMap<TransactionHash, MempoolEntry>,
    priority: BTreeSet<PriorityKey>,
    nullifiers: HashMap<Nullifier, TransactionHash>,
    size_bytes: usize,
    next_arrival: u64,
}

impl Inner {
    fn insert(&mut self, hash: TransactionHash, entry: MempoolEntry) {
        for spend in entry.transaction.spends() {
            self.nullifiers.insert(spend.nullifier, hash);
        }
        self.priority.insert(entry.priority_key(hash));
        self.size_bytes += entry.size;
        self.transactions.insert(hash, entry);
    }

    fn remove(&mut self, hash: &TransactionHash) -> Option<MempoolEntry> {
        let entry = self.transactions.remove(hash)?;
        self.priority.remove(&entry.priority_key(*hash));
        for spend in entry.transaction.spends() {
            // only clear index entries this transaction owns
            if self.nullifiers.get(&spend.nullifier) == Some(hash) {
                self.nullifiers.remove(&spend.nullifier);
            }
        }
        self.size_bytes -= entry.size;
        Some(entry)
    }

    fn lowest_priority(&self) -> Option<TransactionHash> {
        self.priority.first().map(|(_, _, hash)| *hash)
    }
}

/// A snapshot of the pool's contents for consumers computing pending effects, such as
/// wallet balances.
#[derive(Debug, Clone, Default)]
pub struct PendingEffects {
    pub transactions: Vec<Arc<Transaction>>,
    pub nullifiers: HashSet<Nullifier>,
}

// MEMPOOL
// ================================================================================================

/// The bounded priority set of unconfirmed transactions.
///
/// All mutation is serialized behind one internal monitor; reads hand out snapshots so
/// template assembly never observes a half-applied update. Admission enforces pairwise
/// nullifier disjointness against both the nullifier tree and the pool's own inverted
/// index.
pub struct MemPool<P: CryptoProvider, B: StorageBackend = MemoryBackend> {
    chain: Arc<Blockchain<P, B>>,
    config: MemPoolConfig,
    inner: Mutex<Inner>,
    recently_evicted: Mutex<RecentlyEvictedCache>,
    evictions: std::sync::Mutex<Vec<mpsc::Sender<TransactionHash>>>,
}

impl<P: CryptoProvider, B: StorageBackend> MemPool<P, B> {
    pub fn new(chain: Arc<Blockchain<P, B>>, config: MemPoolConfig) -> Self {
        let recently_evicted = RecentlyEvictedCache::new(config.recently_evicted_capacity);
        Self {
            chain,
            config,
            inner: Mutex::new(Inner::default()),
            recently_evicted: Mutex::new(recently_evicted),
            evictions: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Registers for eviction notifications.
    pub fn subscribe_evictions(&self, capacity: usize) -> mpsc::Receiver<TransactionHash> {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        self.evictions.lock().expect("eviction lock poisoned").push(sender);
        receiver
    }

    // ADMISSION
    // --------------------------------------------------------------------------------------------

    /// Verifies and admits a transaction, evicting lower-priority entries if the pool
    /// overflows.
    pub async fn accept_transaction(
        &self,
        transaction: Transaction,
    ) -> Result<TransactionHash, MempoolAcceptError> {
        let hash = self.chain.transaction_hash(&transaction);
        let head = self.chain.head().await?;

        if transaction.is_expired_at(head.sequence()) {
            return Err(MempoolAcceptError::Expired(head.sequence()));
        }
        if let Err(reason) = self.chain.verifier().verify_transaction(&transaction) {
            warn!(target: "ironfish::mempool", %hash, %reason, "rejecting transaction");
            return Err(MempoolAcceptError::Invalid(reason));
        }
        for spend in transaction.spends() {
            if self.chain.contains_nullifier(&spend.nullifier).await? {
                return Err(MempoolAcceptError::Invalid(ValidationReason::DoubleSpend {
                    nullifier: spend.nullifier,
                }));
            }
        }

        let size = transaction.serialized_size();
        if size > self.config.max_size_bytes {
            return Err(MempoolAcceptError::TooLarge { size });
        }

        if self.recently_evicted.lock().await.contains(&hash) {
            return Err(MempoolAcceptError::Underpriced);
        }

        let mut inner = self.inner.lock().await;
        if inner.transactions.contains_key(&hash) {
            return Err(MempoolAcceptError::Duplicate);
        }
        for spend in transaction.spends() {
            if inner.nullifiers.contains_key(&spend.nullifier) {
                return Err(MempoolAcceptError::DoubleSpendMempool {
                    nullifier: spend.nullifier,
                });
            }
        }

        let fee_rate = FeeRate::compute(&transaction, size);
        let arrival = inner.next_arrival;
        inner.next_arrival += 1;
        inner.insert(
            hash,
            MempoolEntry { transaction: Arc::new(transaction), fee_rate, arrival, size },
        );

        let evicted = self.evict_overflow(&mut inner).await;
        drop(inner);

        self.notify_evictions(&evicted).await;
        if evicted.contains(&hash) {
            return Err(MempoolAcceptError::Underpriced);
        }

        debug!(target: "ironfish::mempool", %hash, rate = fee_rate.as_ore_per_kb(), "accepted transaction");
        Ok(hash)
    }

    // CHAIN EVENTS
    // --------------------------------------------------------------------------------------------

    /// Applies one chain event: connects remove included and conflicting transactions and
    /// prune expirations, disconnects return a block's transactions to the pool.
    pub async fn process_event(&self, event: &ChainEvent) -> Result<(), ChainError> {
        match event {
            ChainEvent::Connect { block, .. } => {
                self.on_chain_connect(block).await;
                Ok(())
            },
            ChainEvent::Disconnect { block, .. } => self.on_chain_disconnect(block).await,
            ChainEvent::Fork { .. } => Ok(()),
        }
    }

    /// Handles a block joining the canonical chain.
    pub async fn on_chain_connect(&self, block: &Block) {
        let head_sequence = block.header.sequence;
        let mut inner = self.inner.lock().await;

        // included transactions leave the pool
        for transaction in block.transactions.iter().skip(1) {
            let hash = self.chain.transaction_hash(transaction);
            inner.remove(&hash);
        }

        // so does anything now conflicting with a connected nullifier
        let connected: HashSet<Nullifier> = block
            .transactions
            .iter()
            .flat_map(|tx| tx.spends().iter().map(|spend| spend.nullifier))
            .collect();
        let conflicting: Vec<TransactionHash> = connected
            .iter()
            .filter_map(|nullifier| inner.nullifiers.get(nullifier).copied())
            .collect();
        for hash in conflicting {
            debug!(target: "ironfish::mempool", %hash, "dropping transaction conflicting with connected block");
            inner.remove(&hash);
        }

        // and anything that just expired
        let expired: Vec<TransactionHash> = inner
            .transactions
            .iter()
            .filter(|(_, entry)| entry.transaction.is_expired_at(head_sequence))
            .map(|(hash, _)| *hash)
            .collect();
        for hash in expired {
            debug!(target: "ironfish::mempool", %hash, "pruning expired transaction");
            inner.remove(&hash);
        }
    }

    /// Handles a block leaving the canonical chain: its transactions are re-admitted
    /// unless they now conflict or expired.
    pub async fn on_chain_disconnect(&self, block: &Block) -> Result<(), ChainError> {
        let head = self.chain.head().await?;
        let mut inner = self.inner.lock().await;
        let mut recently_evicted = self.recently_evicted.lock().await;

        for transaction in block.transactions.iter().skip(1) {
            let hash = self.chain.transaction_hash(transaction);
            if transaction.is_expired_at(head.sequence()) {
                continue;
            }
            if inner.transactions.contains_key(&hash) {
                continue;
            }
            let conflicts = transaction
                .spends()
                .iter()
                .any(|spend| inner.nullifiers.contains_key(&spend.nullifier));
            if conflicts {
                continue;
            }

            recently_evicted.remove(&hash);
            let size = transaction.serialized_size();
            let fee_rate = FeeRate::compute(transaction, size);
            let arrival = inner.next_arrival;
            inner.next_arrival += 1;
            inner.insert(
                hash,
                MempoolEntry {
                    transaction: Arc::new(transaction.clone()),
                    fee_rate,
                    arrival,
                    size,
                },
            );
        }
        drop(recently_evicted);

        let evicted = self.evict_overflow(&mut inner).await;
        drop(inner);
        self.notify_evictions(&evicted).await;
        Ok(())
    }

    // READS
    // --------------------------------------------------------------------------------------------

    /// A snapshot of the pool ordered by descending priority, for block-template assembly.
    pub async fn iterate_by_priority(&self) -> Vec<Arc<Transaction>> {
        let inner = self.inner.lock().await;
        inner
            .priority
            .iter()
            .rev()
            .filter_map(|(_, _, hash)| inner.transactions.get(hash))
            .map(|entry| entry.transaction.clone())
            .collect()
    }

    /// A snapshot of the pool's contents and spent-nullifier set.
    pub async fn pending_effects(&self) -> PendingEffects {
        let inner = self.inner.lock().await;
        PendingEffects {
            transactions: inner.transactions.values().map(|e| e.transaction.clone()).collect(),
            nullifiers: inner.nullifiers.keys().copied().collect(),
        }
    }

    pub async fn contains(&self, hash: &TransactionHash) -> bool {
        self.inner.lock().await.transactions.contains_key(hash)
    }

    pub async fn get(&self, hash: &TransactionHash) -> Option<Arc<Transaction>> {
        self.inner.lock().await.transactions.get(hash).map(|entry| entry.transaction.clone())
    }

    pub async fn count(&self) -> usize {
        self.inner.lock().await.transactions.len()
    }

    pub async fn size_bytes(&self) -> usize {
        self.inner.lock().await.size_bytes
    }

    // HELPERS
    // --------------------------------------------------------------------------------------------

    async fn evict_overflow(&self, inner: &mut Inner) -> Vec<TransactionHash> {
        let mut evicted = Vec::new();
        while inner.size_bytes > self.config.max_size_bytes {
            let Some(lowest) = inner.lowest_priority() else {
                break;
            };
            inner.remove(&lowest);
            evicted.push(lowest);
        }

        if !evicted.is_empty() {
            let mut cache = self.recently_evicted.lock().await;
            for hash in &evicted {
                warn!(target: "ironfish::mempool", %hash, "evicting underpriced transaction");
                cache.insert(*hash);
            }
        }
        evicted
    }

    async fn notify_evictions(&self, evicted: &[TransactionHash]) {
        if evicted.is_empty() {
            return;
        }
        let senders: Vec<_> = self.evictions.lock().expect("eviction lock poisoned").clone();
        for sender in senders {
            for hash in evicted {
                let _ = sender.send(*hash).await;
            }
        }
    }
}
