use std::collections::HashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use ironfish_protocol::asset::{AssetId, AssetRecord};
use ironfish_protocol::block::{Block, BlockHeader, TreeCommitment};
use ironfish_protocol::consensus::{ConsensusParameters, NetworkDefinition};
use ironfish_protocol::hash::{BlockHash, Nullifier, TransactionHash};
use ironfish_protocol::provider::CryptoProvider;
use ironfish_protocol::sequence::Sequence;
use ironfish_protocol::transaction::Transaction;
use ironfish_protocol::TREE_DEPTH;
use ironfish_storage::{
    Database,
    DbTransaction,
    MemoryBackend,
    StorageBackend,
    StorageError,
    TransactionMode,
};
use tracing::{debug, info, warn};

use crate::errors::{ChainError, TreeError, ValidationReason};
use crate::events::{ChainEvent, EventHub};
use crate::merkle::{MerkleTree, NoteTreeHasher, NullifierTreeHasher, Witness};
use crate::schema::{
    ASSET_UNDO,
    ASSETS,
    BLOCK_TRANSACTIONS,
    HEADERS,
    MAIN_CHAIN,
    META,
    NOTE_TREE,
    NULLIFIER_POSITIONS,
    NULLIFIER_TREE,
    SEQUENCE_TO_HASHES,
    SEQUENCE_TX,
    TX_LOCATIONS,
    TransactionLocation,
    meta_key,
};
use crate::verifier::Verifier;

// RESULTS
// ================================================================================================

/// A header paired with its identity hash, as tracked on some branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainHeader {
    pub hash: BlockHash,
    pub header: BlockHeader,
}

impl ChainHeader {
    pub fn sequence(&self) -> Sequence {
        self.header.sequence
    }
}

/// Why [`Blockchain::add_block`] did not connect a block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddBlockReason {
    /// The block is already stored; nothing was done.
    AlreadyKnown,
    /// The parent is unknown. Orphans are not persisted; resubmit after the parent.
    Orphan,
    /// The block failed a validation rule.
    Invalid(ValidationReason),
}

/// The outcome of [`Blockchain::add_block`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddBlockResult {
    pub is_added: bool,
    pub is_fork: bool,
    pub reason: Option<AddBlockReason>,
    /// Peer-scoring delta for whoever submitted the block.
    pub score: i32,
}

impl AddBlockResult {
    fn connected(is_fork: bool) -> Self {
        Self { is_added: true, is_fork, reason: None, score: 0 }
    }

    fn forked() -> Self {
        Self { is_added: true, is_fork: true, reason: None, score: 0 }
    }

    fn already_known() -> Self {
        Self { is_added: false, is_fork: false, reason: Some(AddBlockReason::AlreadyKnown), score: 0 }
    }

    fn orphaned() -> Self {
        Self { is_added: false, is_fork: false, reason: Some(AddBlockReason::Orphan), score: -10 }
    }

    fn invalid(reason: ValidationReason) -> Self {
        Self { is_added: false, is_fork: false, reason: Some(AddBlockReason::Invalid(reason)), score: -100 }
    }
}

/// Internal error split: validation outcomes roll the transaction back and surface as a
/// typed reason; storage trouble aborts and is fatal to the caller.
enum ConnectError {
    Invalid(ValidationReason),
    Fatal(ChainError),
}

impl From<ValidationReason> for ConnectError {
    fn from(reason: ValidationReason) -> Self {
        Self::Invalid(reason)
    }
}

impl From<StorageError> for ConnectError {
    fn from(err: StorageError) -> Self {
        Self::Fatal(err.into())
    }
}

impl From<TreeError> for ConnectError {
    fn from(err: TreeError) -> Self {
        Self::Fatal(err.into())
    }
}

impl From<ChainError> for ConnectError {
    fn from(err: ChainError) -> Self {
        Self::Fatal(err)
    }
}

// BLOCKCHAIN
// ================================================================================================

/// The single-writer state machine over the canonical chain.
///
/// All mutation funnels through [`Blockchain::add_block`], which runs inside one exclusive
/// storage transaction: stateless validation, ancestry, fork choice, the disconnect and
/// connect walks of a reorganization, and every tree append are atomic with the head
/// update. Events are emitted only after the transaction committed, in commit order.
///
/// Readers take snapshot read transactions and never block the writer beyond the storage
/// lock handoff.
pub struct Blockchain<P: CryptoProvider, B: StorageBackend = MemoryBackend> {
    db: Database<B>,
    provider: Arc<P>,
    verifier: Verifier<P>,
    note_tree: MerkleTree<NoteTreeHasher<P>>,
    nullifier_tree: MerkleTree<NullifierTreeHasher<P>>,
    events: EventHub,
    /// Held from just before a commit until its events are emitted, so emission order
    /// always matches commit order even when writers race on the storage lock.
    emit_lock: tokio::sync::Mutex<()>,
    clock: Box<dyn Fn() -> u64 + Send + Sync>,
}

impl<P: CryptoProvider, B: StorageBackend> Blockchain<P, B> {
    /// Opens the chain database, writing the genesis block on first open and verifying it
    /// on every later one.
    pub async fn open(
        db: Database<B>,
        provider: Arc<P>,
        network: &NetworkDefinition,
    ) -> Result<Self, ChainError> {
        let chain = Self {
            db,
            provider: provider.clone(),
            verifier: Verifier::new(provider.clone(), network.consensus.clone()),
            note_tree: MerkleTree::new(NoteTreeHasher::new(provider.clone()), TREE_DEPTH, NOTE_TREE),
            nullifier_tree: MerkleTree::new(
                NullifierTreeHasher::new(provider),
                TREE_DEPTH,
                NULLIFIER_TREE,
            ),
            events: EventHub::new(),
            emit_lock: tokio::sync::Mutex::new(()),
            clock: Box::new(|| {
                SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .map(|elapsed| elapsed.as_millis() as u64)
                    .unwrap_or(0)
            }),
        };
        chain.bootstrap(&network.genesis).await?;
        Ok(chain)
    }

    /// Replaces the wall clock, letting tests pin "now".
    pub fn with_clock(mut self, clock: impl Fn() -> u64 + Send + Sync + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn verifier(&self) -> &Verifier<P> {
        &self.verifier
    }

    pub fn consensus(&self) -> &ConsensusParameters {
        self.verifier.consensus()
    }

    pub fn provider(&self) -> &Arc<P> {
        &self.provider
    }

    /// Registers a chain-event subscriber.
    pub fn subscribe(&self, capacity: usize) -> tokio::sync::mpsc::Receiver<ChainEvent> {
        self.events.subscribe(capacity)
    }

    /// Computes a block's identity hash.
    pub fn block_hash(&self, header: &BlockHeader) -> BlockHash {
        header.hash_with(|bytes| self.provider.hash_header(bytes))
    }

    /// Computes a transaction's identity hash.
    pub fn transaction_hash(&self, transaction: &Transaction) -> TransactionHash {
        transaction.hash_with(|bytes| self.provider.hash_transaction(bytes))
    }

    // WRITES
    // --------------------------------------------------------------------------------------------

    /// Validates and attaches a block, reorganizing the canonical chain if the block's
    /// branch now carries the most work.
    pub async fn add_block(&self, block: Block) -> Result<AddBlockResult, ChainError> {
        let hash = self.block_hash(&block.header);
        let mut tx = self.db.begin(TransactionMode::ReadWrite).await;

        if HEADERS.has(&tx, &hash)? {
            return Ok(AddBlockResult::already_known());
        }

        // stateless validation
        let now_ms = (self.clock)();
        if let Err(reason) = self.verifier.verify_header(&block.header, &hash, now_ms) {
            warn!(target: "ironfish::chain", %hash, %reason, "rejecting block header");
            return Ok(AddBlockResult::invalid(reason));
        }
        if let Err(reason) = self.verifier.verify_block(&block) {
            warn!(target: "ironfish::chain", %hash, %reason, "rejecting block");
            return Ok(AddBlockResult::invalid(reason));
        }

        // ancestry
        let Some(parent) = HEADERS.get(&tx, &block.header.previous_block_hash)? else {
            debug!(target: "ironfish::chain", %hash, "orphan block; parent unknown");
            return Ok(AddBlockResult::orphaned());
        };
        if let Err(reason) = self.verifier.verify_against_parent(&block.header, &parent) {
            warn!(target: "ironfish::chain", %hash, %reason, "rejecting block against parent");
            return Ok(AddBlockResult::invalid(reason));
        }

        // cumulative work
        let mut header = block.header.clone();
        header.work = parent.work.saturating_add(header.difficulty());
        let attached = ChainHeader { hash, header: header.clone() };

        let head = self.head_in(&tx)?;
        let extends_head = block.header.previous_block_hash == head.hash;

        // the chain below the last checkpoint is final; forks there are dead on arrival
        if !extends_head {
            if let Some(checkpoint) = self.consensus().max_checkpoint_sequence() {
                if attached.sequence() <= checkpoint {
                    return Ok(AddBlockResult::invalid(ValidationReason::BehindCheckpoint));
                }
            }
        }

        // record the block on its branch
        HEADERS.put(&mut tx, &hash, &header)?;
        BLOCK_TRANSACTIONS.put(&mut tx, &hash, &block.transactions)?;
        let mut at_sequence =
            SEQUENCE_TO_HASHES.get(&tx, &header.sequence)?.unwrap_or_default();
        at_sequence.push(hash);
        SEQUENCE_TO_HASHES.put(&mut tx, &header.sequence, &at_sequence)?;

        let block = Arc::new(Block::new(header, block.transactions));

        if extends_head {
            match self.connect_block(&mut tx, &attached, &block.transactions, false) {
                Ok(()) => {},
                Err(ConnectError::Invalid(reason)) => {
                    warn!(target: "ironfish::chain", %hash, %reason, "rejecting block during connect");
                    return Ok(AddBlockResult::invalid(reason));
                },
                Err(ConnectError::Fatal(err)) => return Err(err),
            }
            let _emit = self.emit_lock.lock().await;
            tx.commit()?;
            info!(target: "ironfish::chain", %hash, sequence = %attached.sequence(), "connected block");
            self.events.emit(ChainEvent::Connect { hash, block }).await;
            return Ok(AddBlockResult::connected(false));
        }

        let takes_over = attached.header.work > head.header.work
            || (attached.header.work == head.header.work && attached.hash < head.hash);

        if !takes_over {
            let _emit = self.emit_lock.lock().await;
            tx.commit()?;
            debug!(target: "ironfish::chain", %hash, "block attached to a lighter fork");
            self.events.emit(ChainEvent::Fork { hash, block }).await;
            return Ok(AddBlockResult::forked());
        }

        match self.reorganize(&mut tx, head, attached.clone()) {
            Ok(events) => {
                let _emit = self.emit_lock.lock().await;
                tx.commit()?;
                info!(
                    target: "ironfish::chain",
                    %hash,
                    sequence = %attached.sequence(),
                    steps = events.len(),
                    "reorganized chain"
                );
                for event in events {
                    self.events.emit(event).await;
                }
                Ok(AddBlockResult::connected(true))
            },
            Err(ConnectError::Invalid(reason)) => {
                warn!(target: "ironfish::chain", %hash, %reason, "rejecting branch during reorg");
                Ok(AddBlockResult::invalid(reason))
            },
            Err(ConnectError::Fatal(err)) => Err(err),
        }
    }

    /// Assembles an unmined block on top of the current head.
    ///
    /// The caller supplies a posted miner's fee transaction and the candidate user
    /// transactions in priority order. The returned header carries the correct note
    /// commitment for the would-be chain state; the miner grinds `randomness` until the
    /// hash meets the target.
    pub async fn create_block_template(
        &self,
        miners_fee: Transaction,
        transactions: Vec<Transaction>,
    ) -> Result<Block, ChainError> {
        let mut tx = self.db.begin(TransactionMode::ReadWrite).await;
        let head = self.head_in(&tx)?;
        let timestamp_ms = (self.clock)().max(head.header.timestamp_ms);

        let mut all = Vec::with_capacity(transactions.len() + 1);
        all.push(miners_fee);
        all.extend(transactions);

        let mut tx_hashes = Vec::with_capacity(all.len());
        for transaction in &all {
            tx_hashes.push(self.transaction_hash(transaction));
            for output in transaction.outputs() {
                self.note_tree.append(&mut tx, &output.commitment)?;
            }
        }
        let note_commitment = TreeCommitment {
            root: self.note_tree.root(&tx)?,
            size: self.note_tree.size(&tx)?,
        };
        // the appends above were purely for root math
        tx.rollback();

        let header = BlockHeader {
            sequence: head.sequence().child(),
            previous_block_hash: head.hash,
            note_commitment,
            transaction_commitment: self.provider.transaction_commitment(&tx_hashes),
            target: self.verifier.expected_target(&head.header, timestamp_ms),
            randomness: 0,
            timestamp_ms,
            graffiti: [0u8; 32],
            work: 0,
        };
        Ok(Block::new(header, all))
    }

    // READS
    // --------------------------------------------------------------------------------------------

    /// The connected block with the most cumulative work.
    pub async fn head(&self) -> Result<ChainHeader, ChainError> {
        let tx = self.db.begin(TransactionMode::Read).await;
        self.head_in(&tx)
    }

    pub async fn genesis_hash(&self) -> Result<BlockHash, ChainError> {
        let tx = self.db.begin(TransactionMode::Read).await;
        META.get(&tx, &meta_key::GENESIS)?.ok_or(ChainError::EmptyChain)
    }

    pub async fn header_by_hash(&self, hash: &BlockHash) -> Result<Option<ChainHeader>, ChainError> {
        let tx = self.db.begin(TransactionMode::Read).await;
        Ok(HEADERS.get(&tx, hash)?.map(|header| ChainHeader { hash: *hash, header }))
    }

    pub async fn block_by_hash(&self, hash: &BlockHash) -> Result<Option<Block>, ChainError> {
        let tx = self.db.begin(TransactionMode::Read).await;
        self.block_in(&tx, hash)
    }

    /// The canonical block hash at a sequence, if that height is connected.
    pub async fn hash_at_sequence(&self, sequence: Sequence) -> Result<Option<BlockHash>, ChainError> {
        let tx = self.db.begin(TransactionMode::Read).await;
        Ok(MAIN_CHAIN.get(&tx, &sequence)?)
    }

    /// Every known block hash at a sequence, across all branches.
    pub async fn hashes_at_sequence(&self, sequence: Sequence) -> Result<Vec<BlockHash>, ChainError> {
        let tx = self.db.begin(TransactionMode::Read).await;
        Ok(SEQUENCE_TO_HASHES.get(&tx, &sequence)?.unwrap_or_default())
    }

    pub async fn block_by_sequence(&self, sequence: Sequence) -> Result<Option<Block>, ChainError> {
        let tx = self.db.begin(TransactionMode::Read).await;
        match MAIN_CHAIN.get(&tx, &sequence)? {
            Some(hash) => self.block_in(&tx, &hash),
            None => Ok(None),
        }
    }

    /// Looks a transaction up on the canonical chain.
    pub async fn transaction_by_hash(
        &self,
        hash: &TransactionHash,
    ) -> Result<Option<(Transaction, TransactionLocation)>, ChainError> {
        let tx = self.db.begin(TransactionMode::Read).await;
        let Some(location) = TX_LOCATIONS.get(&tx, hash)? else {
            return Ok(None);
        };
        let transactions = BLOCK_TRANSACTIONS.must_get(&tx, &location.block_hash)?;
        let transaction = transactions
            .into_iter()
            .nth(location.index as usize)
            .ok_or_else(|| StorageError::corrupt("transaction index beyond block body"))?;
        Ok(Some((transaction, location)))
    }

    /// Every canonical header from genesis up to the head, ascending.
    pub async fn iterate_from_genesis(&self) -> Result<Vec<ChainHeader>, ChainError> {
        let head = self.head().await?;
        self.headers_in_range(Sequence::GENESIS, head.sequence()).await
    }

    /// Canonical headers from `start` up to the head, ascending. The tail-following dual
    /// of [`Blockchain::iterate_from_genesis`].
    pub async fn iterate_to_head(&self, start: Sequence) -> Result<Vec<ChainHeader>, ChainError> {
        let head = self.head().await?;
        self.headers_in_range(start, head.sequence()).await
    }

    /// Canonical headers for `start..=end`, in ascending sequence order.
    pub async fn headers_in_range(
        &self,
        start: Sequence,
        end: Sequence,
    ) -> Result<Vec<ChainHeader>, ChainError> {
        let tx = self.db.begin(TransactionMode::Read).await;
        let mut headers = Vec::new();
        for (sequence, hash) in MAIN_CHAIN.iter(&tx)? {
            if sequence >= start && sequence <= end {
                let header = HEADERS.must_get(&tx, &hash)?;
                headers.push(ChainHeader { hash, header });
            }
        }
        Ok(headers)
    }

    /// True if the nullifier is present in the nullifier tree (i.e. spent on the canonical
    /// chain).
    pub async fn contains_nullifier(&self, nullifier: &Nullifier) -> Result<bool, ChainError> {
        let tx = self.db.begin(TransactionMode::Read).await;
        Ok(NULLIFIER_POSITIONS.has(&tx, nullifier)?)
    }

    /// Builds a witness for the note at `position` against the current note tree.
    pub async fn note_witness(&self, position: u64) -> Result<Witness, ChainError> {
        let tx = self.db.begin(TransactionMode::Read).await;
        Ok(self.note_tree.witness(&tx, position)?)
    }

    /// The current note tree size.
    pub async fn note_tree_size(&self) -> Result<u64, ChainError> {
        let tx = self.db.begin(TransactionMode::Read).await;
        Ok(self.note_tree.size(&tx)?)
    }

    /// The current note tree root and size together, e.g. for anchoring new spends.
    pub async fn note_tree_commitment(&self) -> Result<TreeCommitment, ChainError> {
        let tx = self.db.begin(TransactionMode::Read).await;
        Ok(TreeCommitment {
            root: self.note_tree.root(&tx)?,
            size: self.note_tree.size(&tx)?,
        })
    }

    /// The asset record for `id`, if any mint created it.
    pub async fn asset(&self, id: &AssetId) -> Result<Option<AssetRecord>, ChainError> {
        let tx = self.db.begin(TransactionMode::Read).await;
        Ok(ASSETS.get(&tx, id)?)
    }

    // CONNECT / DISCONNECT
    // --------------------------------------------------------------------------------------------

    fn connect_block(
        &self,
        tx: &mut DbTransaction<'_, B>,
        attached: &ChainHeader,
        transactions: &[Transaction],
        is_genesis: bool,
    ) -> Result<(), ConnectError> {
        let sequence = attached.sequence();
        let mut total_fees: i64 = 0;
        let mut asset_undo: Vec<(AssetId, Option<AssetRecord>)> = Vec::new();
        let mut touched: HashMap<AssetId, AssetRecord> = HashMap::new();

        for (index, transaction) in transactions.iter().enumerate() {
            let tx_hash = self.transaction_hash(transaction);
            let unsigned = transaction.unsigned_bytes();

            if index > 0 {
                if transaction.is_expired_at(sequence) {
                    return Err(ValidationReason::TransactionExpired.into());
                }
                total_fees = total_fees.saturating_add(transaction.fee());
            }

            for spend in transaction.spends() {
                if !is_genesis
                    && !self.note_tree.was_root_at(tx, &spend.commitment_root, spend.tree_size)?
                {
                    return Err(ValidationReason::InvalidSpend.into());
                }
                if NULLIFIER_POSITIONS.has(tx, &spend.nullifier)? {
                    return Err(ValidationReason::DoubleSpend { nullifier: spend.nullifier }.into());
                }
                let position = self.nullifier_tree.append(tx, &spend.nullifier)?;
                NULLIFIER_POSITIONS.put(tx, &spend.nullifier, &position)?;
            }

            for output in transaction.outputs() {
                self.note_tree.append(tx, &output.commitment)?;
            }

            for mint in transaction.mints() {
                let id = self.provider.asset_id(&mint.creator, &mint.name, &mint.metadata, mint.nonce);
                let existing = match touched.get(&id) {
                    Some(record) => Some(record.clone()),
                    None => {
                        let stored = ASSETS.get(tx, &id)?;
                        asset_undo.push((id, stored.clone()));
                        stored
                    },
                };

                let owner = existing.as_ref().map(|record| record.owner).unwrap_or(mint.creator);
                if !self.provider.verify_mint(mint, &owner, &unsigned) {
                    return Err(ValidationReason::InvalidMint.into());
                }

                let mut record = existing.unwrap_or(AssetRecord {
                    id,
                    creator: mint.creator,
                    owner: mint.creator,
                    name: mint.name,
                    metadata: mint.metadata,
                    supply: 0,
                    nonce: mint.nonce,
                    created_tx_hash: tx_hash,
                });
                record.supply = record
                    .supply
                    .checked_add(mint.value)
                    .ok_or(ValidationReason::InvalidMint)?;
                if transaction.version().has_mint_transfer_ownership() {
                    if let Some(new_owner) = mint.transfer_ownership_to {
                        record.owner = new_owner;
                    }
                }
                ASSETS.put(tx, &id, &record)?;
                touched.insert(id, record);
            }

            for burn in transaction.burns() {
                if burn.asset_id.is_native() {
                    return Err(ValidationReason::InvalidBurn.into());
                }
                let existing = match touched.get(&burn.asset_id) {
                    Some(record) => Some(record.clone()),
                    None => {
                        let stored = ASSETS.get(tx, &burn.asset_id)?;
                        asset_undo.push((burn.asset_id, stored.clone()));
                        stored
                    },
                };
                let mut record = existing.ok_or(ValidationReason::InvalidBurn)?;
                record.supply = record
                    .supply
                    .checked_sub(burn.value)
                    .ok_or(ValidationReason::InvalidBurn)?;
                ASSETS.put(tx, &burn.asset_id, &record)?;
                touched.insert(burn.asset_id, record);
            }

            TX_LOCATIONS.put(
                tx,
                &tx_hash,
                &TransactionLocation { block_hash: attached.hash, sequence, index: index as u32 },
            )?;
            SEQUENCE_TX.put(tx, &(sequence, index as u32), &tx_hash)?;
        }

        if !is_genesis {
            let miners_fee = transactions.first().ok_or(ValidationReason::InvalidMinersFee)?;
            let reward = self.consensus().mining_reward(sequence) as i64;
            if miners_fee.fee() != -(total_fees + reward) {
                return Err(ValidationReason::InvalidMinersFee.into());
            }
        }

        let note_size = self.note_tree.size(tx)?;
        if note_size != attached.header.note_commitment.size {
            return Err(ValidationReason::NoteCommitmentSize.into());
        }
        let note_root = self.note_tree.root(tx)?;
        if note_root != attached.header.note_commitment.root {
            return Err(ValidationReason::NoteCommitmentRoot.into());
        }

        if let Some(checkpoint) = self.consensus().checkpoint_hash(sequence) {
            if *checkpoint != attached.hash {
                return Err(ValidationReason::BehindCheckpoint.into());
            }
        }

        if !asset_undo.is_empty() {
            ASSET_UNDO.put(tx, &attached.hash, &asset_undo)?;
        }
        MAIN_CHAIN.put(tx, &sequence, &attached.hash)?;
        META.put(tx, &meta_key::HEAD, &attached.hash)?;
        Ok(())
    }

    fn disconnect_block(
        &self,
        tx: &mut DbTransaction<'_, B>,
        detached: &ChainHeader,
        transactions: &[Transaction],
    ) -> Result<(), ChainError> {
        let sequence = detached.sequence();
        let parent = HEADERS.must_get(tx, &detached.header.previous_block_hash)?;

        self.note_tree.truncate(tx, parent.note_commitment.size)?;

        let spend_count: u64 = transactions.iter().map(|t| t.spends().len() as u64).sum();
        let nullifier_size = self.nullifier_tree.size(tx)?;
        self.nullifier_tree.truncate(tx, nullifier_size.saturating_sub(spend_count))?;

        for (index, transaction) in transactions.iter().enumerate() {
            let tx_hash = self.transaction_hash(transaction);
            for spend in transaction.spends() {
                NULLIFIER_POSITIONS.delete(tx, &spend.nullifier)?;
            }
            TX_LOCATIONS.delete(tx, &tx_hash)?;
            SEQUENCE_TX.delete(tx, &(sequence, index as u32))?;
        }

        if let Some(entries) = ASSET_UNDO.get(tx, &detached.hash)? {
            for (id, prior) in entries {
                match prior {
                    Some(record) => ASSETS.put(tx, &id, &record)?,
                    None => ASSETS.delete(tx, &id)?,
                }
            }
            ASSET_UNDO.delete(tx, &detached.hash)?;
        }

        MAIN_CHAIN.delete(tx, &sequence)?;
        META.put(tx, &meta_key::HEAD, &detached.header.previous_block_hash)?;
        debug!(target: "ironfish::chain", hash = %detached.hash, %sequence, "disconnected block");
        Ok(())
    }

    /// Walks the old head down to the fork point, then the new branch up to its tip.
    /// Returns the ordered events to emit after commit.
    fn reorganize(
        &self,
        tx: &mut DbTransaction<'_, B>,
        old_head: ChainHeader,
        new_tip: ChainHeader,
    ) -> Result<Vec<ChainEvent>, ConnectError> {
        let mut events = Vec::new();
        let mut old = old_head;
        let mut new = new_tip;
        let mut branch = Vec::new();

        while old.hash != new.hash {
            if new.sequence() > old.sequence() {
                let parent = self.chain_header_in(tx, &new.header.previous_block_hash)?;
                branch.push(new);
                new = parent;
            } else {
                let transactions = BLOCK_TRANSACTIONS.must_get(tx, &old.hash)?;
                self.disconnect_block(tx, &old, &transactions)?;
                let block = Arc::new(Block::new(old.header.clone(), transactions));
                events.push(ChainEvent::Disconnect { hash: old.hash, block });
                old = self.chain_header_in(tx, &old.header.previous_block_hash)?;
            }
        }

        for attached in branch.into_iter().rev() {
            let transactions = BLOCK_TRANSACTIONS.must_get(tx, &attached.hash)?;
            self.connect_block(tx, &attached, &transactions, false)?;
            let block = Arc::new(Block::new(attached.header.clone(), transactions));
            events.push(ChainEvent::Connect { hash: attached.hash, block });
        }

        Ok(events)
    }

    // HELPERS
    // --------------------------------------------------------------------------------------------

    async fn bootstrap(&self, genesis: &Block) -> Result<(), ChainError> {
        let genesis_hash = self.block_hash(&genesis.header);
        let mut tx = self.db.begin(TransactionMode::ReadWrite).await;

        if let Some(stored) = META.get(&tx, &meta_key::GENESIS)? {
            if stored != genesis_hash {
                return Err(ChainError::GenesisMismatch { stored, expected: genesis_hash });
            }
            return Ok(());
        }

        let mut header = genesis.header.clone();
        header.work = header.difficulty();
        let attached = ChainHeader { hash: genesis_hash, header: header.clone() };

        HEADERS.put(&mut tx, &genesis_hash, &header)?;
        BLOCK_TRANSACTIONS.put(&mut tx, &genesis_hash, &genesis.transactions)?;
        SEQUENCE_TO_HASHES.put(&mut tx, &header.sequence, &vec![genesis_hash])?;
        META.put(&mut tx, &meta_key::GENESIS, &genesis_hash)?;

        match self.connect_block(&mut tx, &attached, &genesis.transactions, true) {
            Ok(()) => {},
            Err(ConnectError::Invalid(reason)) => {
                return Err(StorageError::corrupt(format!("genesis block invalid: {reason}")).into());
            },
            Err(ConnectError::Fatal(err)) => return Err(err),
        }

        tx.commit()?;
        info!(target: "ironfish::chain", hash = %genesis_hash, "wrote genesis block");
        Ok(())
    }

    fn head_in(&self, tx: &DbTransaction<'_, B>) -> Result<ChainHeader, ChainError> {
        let hash = META.get(tx, &meta_key::HEAD)?.ok_or(ChainError::EmptyChain)?;
        let header = HEADERS.must_get(tx, &hash)?;
        Ok(ChainHeader { hash, header })
    }

    fn chain_header_in(
        &self,
        tx: &DbTransaction<'_, B>,
        hash: &BlockHash,
    ) -> Result<ChainHeader, ChainError> {
        let header = HEADERS.get(tx, hash)?.ok_or(ChainError::BlockNotFound(*hash))?;
        Ok(ChainHeader { hash: *hash, header })
    }

    fn block_in(&self, tx: &DbTransaction<'_, B>, hash: &BlockHash) -> Result<Option<Block>, ChainError> {
        let Some(header) = HEADERS.get(tx, hash)? else {
            return Ok(None);
        };
        let transactions = BLOCK_TRANSACTIONS.must_get(tx, hash)?;
        Ok(Some(Block::new(header, transactions)))
    }

    /// The main-chain hash at `sequence` as seen by an existing transaction. Used by the
    /// chain processor to stay inside one snapshot while walking.
    pub(crate) fn main_chain_hash_in(
        &self,
        tx: &DbTransaction<'_, B>,
        sequence: Sequence,
    ) -> Result<Option<BlockHash>, ChainError> {
        Ok(MAIN_CHAIN.get(tx, &sequence)?)
    }

    pub(crate) fn db(&self) -> &Database<B> {
        &self.db
    }

    pub(crate) fn block_in_tx(
        &self,
        tx: &DbTransaction<'_, B>,
        hash: &BlockHash,
    ) -> Result<Option<Block>, ChainError> {
        self.block_in(tx, hash)
    }

    pub(crate) fn head_in_tx(&self, tx: &DbTransaction<'_, B>) -> Result<ChainHeader, ChainError> {
        self.head_in(tx)
    }
}
