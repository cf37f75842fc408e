use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use ironfish_chain::{
    AddBlockResult,
    Blockchain,
    ChainError,
    ChainHeader,
    MerkleTree,
    NoteTreeHasher,
    TreeStores,
};
use ironfish_protocol::asset::AssetId;
use ironfish_protocol::block::{Block, BlockHeader, TreeCommitment};
use ironfish_protocol::consensus::{ConsensusParameters, NetworkDefinition, ORE_PER_IRON};
use ironfish_protocol::hash::{BlockHash, NoteCommitment};
use ironfish_protocol::keys::{AccountKeys, PublicAddress};
use ironfish_protocol::note::{Memo, NotePlaintext};
use ironfish_protocol::provider::{CryptoProvider, RawOutput, RawSpend, RawTransaction};
use ironfish_protocol::sequence::Sequence;
use ironfish_protocol::target::Target;
use ironfish_protocol::transaction::{Transaction, TransactionVersion};
use ironfish_storage::{Database, TransactionMode};

use crate::provider::TestCryptoProvider;

/// Wall-clock origin of fixture chains, far enough in the past to be boring.
const GENESIS_TIMESTAMP_MS: u64 = 1_700_000_000_000;

/// A chain fixture: an opened blockchain on a throwaway database, a funded miner
/// account, and helpers that assemble valid blocks on any stored parent.
///
/// The fixture tracks the full note-leaf list along every branch it builds, which is how
/// it computes correct note commitments for fork blocks without touching the chain's own
/// trees.
pub struct TestFixture {
    pub provider: Arc<TestCryptoProvider>,
    pub chain: Arc<Blockchain<TestCryptoProvider>>,
    pub network: NetworkDefinition,
    pub miner: AccountKeys,
    clock: Arc<AtomicU64>,
    leaves: Mutex<HashMap<BlockHash, Vec<NoteCommitment>>>,
    /// Headers of every block this fixture built, so children can be assembled before
    /// their parents were submitted to the chain.
    headers: Mutex<HashMap<BlockHash, BlockHeader>>,
}

impl TestFixture {
    /// Opens a fresh chain with default test parameters: minimum difficulty everywhere,
    /// 60-second block time, sequential block rules on.
    pub async fn new() -> Self {
        Self::with_consensus(Self::default_consensus()).await
    }

    pub fn default_consensus() -> ConsensusParameters {
        ConsensusParameters {
            allowed_block_future_seconds: 15,
            genesis_supply_in_iron: 42_000_000,
            target_block_time_in_seconds: 60,
            target_bucket_time_in_seconds: 10,
            halving_interval: 525_600,
            min_difficulty: 1,
            enforce_sequential_block_time: true,
            checkpoints: BTreeMap::new(),
        }
    }

    pub async fn with_consensus(consensus: ConsensusParameters) -> Self {
        let provider = Arc::new(TestCryptoProvider::new());
        let miner = provider.derive_account(b"fixture-miner");

        // the genesis block allocates the initial supply to the miner account
        let genesis_note = NotePlaintext {
            owner: miner.public_address,
            value: consensus.genesis_supply_in_iron * ORE_PER_IRON,
            memo: Memo::from_str_lossy("genesis"),
            asset_id: AssetId::NATIVE,
            sender: miner.public_address,
        };
        let genesis_raw = RawTransaction {
            version: TransactionVersion::V2,
            spends: vec![],
            outputs: vec![RawOutput { note: genesis_note }],
            mints: vec![],
            burns: vec![],
            fee: 0,
            expiration: 0,
        };
        let spending_key = miner.spending_key.expect("fixture miner can sign");
        let genesis_tx =
            provider.post(&genesis_raw, &spending_key).expect("genesis transaction posts");

        let genesis_leaves: Vec<NoteCommitment> =
            genesis_tx.outputs().iter().map(|output| output.commitment).collect();
        let note_commitment = compute_tree_commitment(&provider, &genesis_leaves).await;

        let genesis_hash_input = genesis_tx.hash_with(|b| provider.hash_transaction(b));
        let genesis_header = BlockHeader {
            sequence: Sequence::GENESIS,
            previous_block_hash: BlockHash::default(),
            note_commitment,
            transaction_commitment: provider.transaction_commitment(&[genesis_hash_input]),
            target: Target::MAX,
            randomness: 0,
            timestamp_ms: GENESIS_TIMESTAMP_MS,
            graffiti: [0u8; 32],
            work: 0,
        };
        let genesis = Block::new(genesis_header, vec![genesis_tx]);

        let network = NetworkDefinition {
            bootstrap_nodes: vec![],
            consensus,
            genesis: genesis.clone(),
        };

        let clock = Arc::new(AtomicU64::new(GENESIS_TIMESTAMP_MS));
        let clock_handle = clock.clone();
        let chain = Blockchain::open(Database::default(), provider.clone(), &network)
            .await
            .expect("fixture chain opens")
            .with_clock(move || clock_handle.load(Ordering::Relaxed));
        let chain = Arc::new(chain);

        let genesis_hash = chain.block_hash(&genesis.header);
        let mut leaves = HashMap::new();
        leaves.insert(genesis_hash, genesis_leaves);
        let mut headers = HashMap::new();
        headers.insert(genesis_hash, genesis.header.clone());

        Self {
            provider,
            chain,
            network,
            miner,
            clock,
            leaves: Mutex::new(leaves),
            headers: Mutex::new(headers),
        }
    }

    // BLOCK ASSEMBLY
    // --------------------------------------------------------------------------------------------

    /// Builds a valid block on the given parent, without submitting it.
    pub async fn make_block_on(
        &self,
        parent_hash: &BlockHash,
        transactions: Vec<Transaction>,
    ) -> Block {
        self.make_block_tagged(parent_hash, transactions, 0).await
    }

    /// Like [`TestFixture::make_block_on`], with a graffiti tag so two otherwise-identical
    /// blocks on the same parent get distinct hashes.
    pub async fn make_block_tagged(
        &self,
        parent_hash: &BlockHash,
        transactions: Vec<Transaction>,
        tag: u8,
    ) -> Block {
        let parent_header = self
            .headers
            .lock()
            .expect("header ledger poisoned")
            .get(parent_hash)
            .expect("parent was built by this fixture")
            .clone();
        let sequence = parent_header.sequence.child();

        let fees: i64 = transactions.iter().map(Transaction::fee).sum();
        let reward = self.network.consensus.mining_reward(sequence) as i64;
        let miner_note = NotePlaintext {
            owner: self.miner.public_address,
            value: (fees + reward).max(0) as u64,
            // unique memo so fixture coinbase commitments never collide
            memo: Memo::from_str_lossy(&format!("cb-{sequence}-{tag}-{parent_hash}")),
            asset_id: AssetId::NATIVE,
            sender: self.miner.public_address,
        };
        let miners_fee = self
            .provider
            .post(
                &RawTransaction {
                    version: TransactionVersion::V2,
                    spends: vec![],
                    outputs: vec![RawOutput { note: miner_note }],
                    mints: vec![],
                    burns: vec![],
                    fee: -(fees + reward),
                    expiration: 0,
                },
                &self.miner.spending_key.expect("fixture miner can sign"),
            )
            .expect("miner's fee posts");

        let mut all = Vec::with_capacity(transactions.len() + 1);
        all.push(miners_fee);
        all.extend(transactions);

        let mut branch_leaves = self
            .leaves
            .lock()
            .expect("leaf ledger poisoned")
            .get(parent_hash)
            .expect("parent branch tracked")
            .clone();
        for transaction in &all {
            branch_leaves.extend(transaction.outputs().iter().map(|output| output.commitment));
        }
        let note_commitment = compute_tree_commitment(&self.provider, &branch_leaves).await;

        let tx_hashes: Vec<_> =
            all.iter().map(|tx| tx.hash_with(|b| self.provider.hash_transaction(b))).collect();

        let timestamp_ms = parent_header.timestamp_ms
            + self.network.consensus.target_block_time_in_seconds * 1000;
        let mut header = BlockHeader {
            sequence,
            previous_block_hash: *parent_hash,
            note_commitment,
            transaction_commitment: self.provider.transaction_commitment(&tx_hashes),
            target: self.chain.verifier().expected_target(&parent_header, timestamp_ms),
            randomness: 0,
            timestamp_ms,
            graffiti: [tag; 32],
            work: 0,
        };

        // grind the nonce; at fixture difficulty the first try meets the target
        while !header.target.meets(&self.chain.block_hash(&header)) {
            header.randomness += 1;
        }

        let hash = self.chain.block_hash(&header);
        self.leaves.lock().expect("leaf ledger poisoned").insert(hash, branch_leaves);
        self.headers.lock().expect("header ledger poisoned").insert(hash, header.clone());
        self.bump_clock(timestamp_ms);

        Block::new(header, all)
    }

    /// Builds a block on the current head.
    pub async fn make_block(&self, transactions: Vec<Transaction>) -> Block {
        let head = self.chain.head().await.expect("chain has a head");
        self.make_block_on(&head.hash, transactions).await
    }

    /// Builds a block on the head and submits it, asserting it connected.
    pub async fn mine_block(&self, transactions: Vec<Transaction>) -> (Block, ChainHeader) {
        let block = self.make_block(transactions).await;
        let result = self.chain.add_block(block.clone()).await.expect("add_block succeeds");
        assert!(result.is_added, "fixture block failed to connect: {result:?}");
        let head = self.chain.head().await.expect("chain has a head");
        (block, head)
    }

    /// Submits a block, returning the raw result.
    pub async fn add(&self, block: Block) -> Result<AddBlockResult, ChainError> {
        self.chain.add_block(block).await
    }

    // TRANSACTIONS
    // --------------------------------------------------------------------------------------------

    /// The fixed value of every synthetic fixture note.
    pub const NOTE_VALUE: u64 = 50_000;

    /// Posts a transaction that spends a synthetic note anchored at the current tree
    /// state. `note_tag` makes the nullifier unique; reusing a tag reuses the nullifier
    /// even across different fees or recipients.
    pub async fn spend_tx(&self, owner_seed: &[u8], note_tag: u64, fee: u64) -> Transaction {
        let recipient = self.provider.derive_account(b"recipient");
        self.pay_tx(
            owner_seed,
            note_tag,
            fee,
            recipient.public_address,
            Self::NOTE_VALUE - fee,
            0,
        )
        .await
    }

    pub async fn spend_tx_expiring(
        &self,
        owner_seed: &[u8],
        note_tag: u64,
        fee: u64,
        expiration: u32,
    ) -> Transaction {
        let recipient = self.provider.derive_account(b"recipient");
        self.pay_tx(
            owner_seed,
            note_tag,
            fee,
            recipient.public_address,
            Self::NOTE_VALUE - fee,
            expiration,
        )
        .await
    }

    /// Posts a transaction spending the synthetic note `note_tag` and paying `amount` to
    /// `recipient`, with any remainder going back to the owner.
    pub async fn pay_tx(
        &self,
        owner_seed: &[u8],
        note_tag: u64,
        fee: u64,
        recipient: PublicAddress,
        amount: u64,
        expiration: u32,
    ) -> Transaction {
        let keys = self.provider.derive_account(owner_seed);
        let anchor = self.chain.note_tree_commitment().await.expect("anchor available");

        let note = NotePlaintext {
            owner: keys.public_address,
            value: Self::NOTE_VALUE,
            memo: Memo::from_str_lossy(&format!("note-{note_tag}")),
            asset_id: AssetId::NATIVE,
            sender: keys.public_address,
        };

        let mut outputs = vec![RawOutput {
            note: NotePlaintext {
                owner: recipient,
                value: amount,
                memo: Memo::from_str_lossy(&format!("pay-{note_tag}")),
                asset_id: AssetId::NATIVE,
                sender: keys.public_address,
            },
        }];
        let change = Self::NOTE_VALUE - amount - fee;
        if change > 0 {
            outputs.push(RawOutput {
                note: NotePlaintext {
                    owner: keys.public_address,
                    value: change,
                    memo: Memo::from_str_lossy(&format!("change-{note_tag}")),
                    asset_id: AssetId::NATIVE,
                    sender: keys.public_address,
                },
            });
        }

        let raw = RawTransaction {
            version: TransactionVersion::V2,
            spends: vec![RawSpend {
                note,
                position: note_tag,
                auth_path: vec![],
                root: anchor.root,
                tree_size: anchor.size,
            }],
            outputs,
            mints: vec![],
            burns: vec![],
            fee: fee as i64,
            expiration,
        };
        self.provider
            .post(&raw, &keys.spending_key.expect("fixture accounts can sign"))
            .expect("fixture transaction posts")
    }

    /// Posts a transaction minting `value` of an asset described by `(creator_seed, name)`,
    /// optionally handing ownership to another address.
    pub async fn mint_tx(
        &self,
        creator_seed: &[u8],
        name: &str,
        value: u64,
        transfer_ownership_to: Option<PublicAddress>,
    ) -> Transaction {
        let keys = self.provider.derive_account(creator_seed);
        let raw = RawTransaction {
            version: TransactionVersion::V2,
            spends: vec![],
            outputs: vec![],
            mints: vec![ironfish_protocol::provider::RawMint {
                creator: keys.public_address,
                name: ironfish_protocol::asset::AssetName::from_str_lossy(name),
                metadata: ironfish_protocol::asset::AssetMetadata::empty(),
                nonce: 0,
                value,
                transfer_ownership_to,
            }],
            burns: vec![],
            fee: 0,
            expiration: 0,
        };
        self.provider
            .post(&raw, &keys.spending_key.expect("fixture accounts can sign"))
            .expect("fixture mint posts")
    }

    /// Posts a transaction burning `value` of the given asset.
    pub async fn burn_tx(&self, signer_seed: &[u8], asset_id: AssetId, value: u64) -> Transaction {
        let keys = self.provider.derive_account(signer_seed);
        let raw = RawTransaction {
            version: TransactionVersion::V2,
            spends: vec![],
            outputs: vec![],
            mints: vec![],
            burns: vec![ironfish_protocol::transaction::Burn { asset_id, value }],
            fee: 0,
            expiration: 0,
        };
        self.provider
            .post(&raw, &keys.spending_key.expect("fixture accounts can sign"))
            .expect("fixture burn posts")
    }

    /// The asset id the provider derives for a fixture mint built from `(creator_seed, name)`.
    pub fn asset_id_for(&self, creator_seed: &[u8], name: &str) -> AssetId {
        let keys = self.provider.derive_account(creator_seed);
        self.provider.asset_id(
            &keys.public_address,
            &ironfish_protocol::asset::AssetName::from_str_lossy(name),
            &ironfish_protocol::asset::AssetMetadata::empty(),
            0,
        )
    }

    // CLOCK
    // --------------------------------------------------------------------------------------------

    /// Moves the fixture clock forward, never backward.
    pub fn bump_clock(&self, to_ms: u64) {
        self.clock.fetch_max(to_ms, Ordering::Relaxed);
    }

    pub fn now_ms(&self) -> u64 {
        self.clock.load(Ordering::Relaxed)
    }
}

/// Computes the note tree commitment for a leaf list using a scratch tree.
async fn compute_tree_commitment(
    provider: &Arc<TestCryptoProvider>,
    leaves: &[NoteCommitment],
) -> TreeCommitment {
    let db = Database::default();
    let tree = MerkleTree::new(
        NoteTreeHasher::new(provider.clone()),
        ironfish_protocol::TREE_DEPTH,
        TreeStores::new(10, 11),
    );
    let mut tx = db.begin(TransactionMode::ReadWrite).await;
    for leaf in leaves {
        tree.append(&mut tx, leaf).expect("scratch tree append");
    }
    TreeCommitment {
        root: tree.root(&tx).expect("scratch tree root"),
        size: tree.size(&tx).expect("scratch tree size"),
    }
}
