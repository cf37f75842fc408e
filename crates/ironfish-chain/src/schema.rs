use ironfish_protocol::asset::{AssetId, AssetRecord};
use ironfish_protocol::block::BlockHeader;
use ironfish_protocol::hash::{BlockHash, Nullifier, TransactionHash};
use ironfish_protocol::sequence::Sequence;
use ironfish_protocol::serde::{
    ByteReader,
    ByteWriter,
    Deserializable,
    DeserializationError,
    Serializable,
};
use ironfish_protocol::transaction::Transaction;
use ironfish_storage::Store;

use crate::merkle::TreeStores;

// STORE LAYOUT
// ================================================================================================
//
// Store id 0 is reserved for the schema version. Renaming or renumbering any store here is
// a schema change and requires a migration.

/// All block headers ever attached, across every branch, keyed by hash.
pub const HEADERS: Store<BlockHash, BlockHeader> = Store::new(1);

/// Block bodies for every stored header.
pub const BLOCK_TRANSACTIONS: Store<BlockHash, Vec<Transaction>> = Store::new(2);

/// The canonical chain: sequence to the hash of the connected block.
pub const MAIN_CHAIN: Store<Sequence, BlockHash> = Store::new(3);

/// Every known block at a sequence, including side branches.
pub const SEQUENCE_TO_HASHES: Store<Sequence, Vec<BlockHash>> = Store::new(4);

/// Where on the canonical chain a transaction landed.
pub const TX_LOCATIONS: Store<TransactionHash, TransactionLocation> = Store::new(5);

/// The inverse of [`TX_LOCATIONS`]: position to transaction hash.
pub const SEQUENCE_TX: Store<(Sequence, u32), TransactionHash> = Store::new(6);

/// Asset records, created on first mint and updated by later mints and burns.
pub const ASSETS: Store<AssetId, AssetRecord> = Store::new(7);

/// Chain metadata singletons, keyed by [`MetaKey`].
pub const META: Store<u8, BlockHash> = Store::new(8);

/// Per-block undo log for asset records: the state each touched asset had before the
/// block connected (`None` when the block's mint created it).
pub const ASSET_UNDO: Store<BlockHash, Vec<(AssetId, Option<AssetRecord>)>> = Store::new(9);

/// Note commitment tree nodes and size.
pub const NOTE_TREE: TreeStores = TreeStores::new(10, 11);

/// Nullifier tree nodes and size.
pub const NULLIFIER_TREE: TreeStores = TreeStores::new(12, 13);

/// Membership index over the nullifier tree: nullifier to its leaf position.
pub const NULLIFIER_POSITIONS: Store<Nullifier, u64> = Store::new(14);

/// Keys of the [`META`] store.
pub mod meta_key {
    /// The hash of the chain head.
    pub const HEAD: u8 = 0;
    /// The hash of the genesis block this database was created from.
    pub const GENESIS: u8 = 1;
}

// TRANSACTION LOCATION
// ================================================================================================

/// Index entry locating a transaction on the canonical chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionLocation {
    pub block_hash: BlockHash,
    pub sequence: Sequence,
    pub index: u32,
}

impl Serializable for TransactionLocation {
    fn write_into<W: ByteWriter + ?Sized>(&self, target: &mut W) {
        self.block_hash.write_into(target);
        self.sequence.write_into(target);
        target.write_u32(self.index);
    }
}

impl Deserializable for TransactionLocation {
    fn read_from<R: ByteReader + ?Sized>(source: &mut R) -> Result<Self, DeserializationError> {
        Ok(Self {
            block_hash: source.read()?,
            sequence: source.read()?,
            index: source.read_u32()?,
        })
    }
}
