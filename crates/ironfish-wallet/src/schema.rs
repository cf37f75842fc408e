use ironfish_chain::ChainCursor;
use ironfish_protocol::asset::AssetId;
use ironfish_protocol::hash::{BlockHash, NoteCommitment, Nullifier, TransactionHash};
use ironfish_protocol::note::NotePlaintext;
use ironfish_protocol::sequence::Sequence;
use ironfish_protocol::serde::{
    ByteReader,
    ByteWriter,
    Deserializable,
    DeserializationError,
    Serializable,
};
use ironfish_storage::{PrefixKey, Store};

use crate::account::StoredAccount;

// STORE LAYOUT
// ================================================================================================
//
// Store id 0 is reserved for the schema version. Account-scoped stores prefix their keys
// with the owning account id so one account's data is a single contiguous range.

/// Account records, keyed by account id.
pub const ACCOUNTS: Store<u32, StoredAccount> = Store::new(1);

/// Notes that decrypted under an account's incoming view key.
pub const DECRYPTED_NOTES: Store<PrefixKey<u32, NoteCommitment>, DecryptedNoteRecord> =
    Store::new(2);

/// Reverse index from a note's nullifier to its commitment, per account.
pub const NULLIFIER_TO_NOTE: Store<PrefixKey<u32, Nullifier>, NoteCommitment> = Store::new(3);

/// Chain transactions an account was involved in.
pub const TRANSACTIONS: Store<PrefixKey<u32, TransactionHash>, WalletTransactionRecord> =
    Store::new(4);

/// Transactions ordered by the sequence they connected at, per account.
pub const SEQUENCE_TO_TX: Store<PrefixKey<u32, (Sequence, TransactionHash)>, TransactionHash> =
    Store::new(5);

/// Transactions ordered by block timestamp, per account.
pub const TIMESTAMP_TO_TX: Store<PrefixKey<u32, (u64, TransactionHash)>, TransactionHash> =
    Store::new(6);

/// Each account's scan head on the canonical chain.
pub const HEADS: Store<u32, ChainCursor> = Store::new(7);

/// Running unspent-value aggregate per account and asset.
pub const BALANCES: Store<PrefixKey<u32, AssetId>, u128> = Store::new(8);

/// Master-key record present when the wallet is passphrase-protected.
pub const MASTER_KEY: Store<u8, MasterKeyRecord> = Store::new(9);

/// Wallet metadata singletons, keyed by [`meta_key`].
pub const META: Store<u8, u32> = Store::new(10);

pub mod meta_key {
    /// The next account id to assign.
    pub const NEXT_ACCOUNT_ID: u8 = 0;
}

/// The single key under which [`MASTER_KEY`] stores its record.
pub const MASTER_KEY_SLOT: u8 = 0;

// DECRYPTED NOTE RECORD
// ================================================================================================

/// A note that belongs to an account, recovered by scanning the chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecryptedNoteRecord {
    pub commitment: NoteCommitment,
    /// Leaf index of the commitment in the note tree.
    pub position: u64,
    pub note: NotePlaintext,
    /// The nullifier this note will reveal when spent.
    pub nullifier: Nullifier,
    /// The transaction that created the note.
    pub tx_hash: TransactionHash,
    /// The sequence of the block that connected it.
    pub sequence: Sequence,
    /// Set once a canonical transaction revealed the nullifier.
    pub spent: bool,
}

impl Serializable for DecryptedNoteRecord {
    fn write_into<W: ByteWriter + ?Sized>(&self, target: &mut W) {
        self.commitment.write_into(target);
        target.write_u64(self.position);
        self.note.write_into(target);
        self.nullifier.write_into(target);
        self.tx_hash.write_into(target);
        self.sequence.write_into(target);
        self.spent.write_into(target);
    }
}

impl Deserializable for DecryptedNoteRecord {
    fn read_from<R: ByteReader + ?Sized>(source: &mut R) -> Result<Self, DeserializationError> {
        Ok(Self {
            commitment: source.read()?,
            position: source.read_u64()?,
            note: source.read()?,
            nullifier: source.read()?,
            tx_hash: source.read()?,
            sequence: source.read()?,
            spent: source.read()?,
        })
    }
}

// WALLET TRANSACTION RECORD
// ================================================================================================

/// An account's view of one canonical-chain transaction it was involved in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletTransactionRecord {
    pub hash: TransactionHash,
    pub block_hash: BlockHash,
    pub sequence: Sequence,
    pub timestamp_ms: u64,
}

impl Serializable for WalletTransactionRecord {
    fn write_into<W: ByteWriter + ?Sized>(&self, target: &mut W) {
        self.hash.write_into(target);
        self.block_hash.write_into(target);
        self.sequence.write_into(target);
        target.write_u64(self.timestamp_ms);
    }
}

impl Deserializable for WalletTransactionRecord {
    fn read_from<R: ByteReader + ?Sized>(source: &mut R) -> Result<Self, DeserializationError> {
        Ok(Self {
            hash: source.read()?,
            block_hash: source.read()?,
            sequence: source.read()?,
            timestamp_ms: source.read_u64()?,
        })
    }
}

// MASTER KEY RECORD
// ================================================================================================

/// Salt and verification blob for the wallet passphrase. The passphrase and the derived
/// key are never stored; `check` is a sealed constant used to detect a wrong passphrase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MasterKeyRecord {
    pub salt: [u8; 32],
    pub check: Vec<u8>,
}

impl Serializable for MasterKeyRecord {
    fn write_into<W: ByteWriter + ?Sized>(&self, target: &mut W) {
        target.write_bytes(&self.salt);
        target.write_len(self.check.len());
        target.write_bytes(&self.check);
    }
}

impl Deserializable for MasterKeyRecord {
    fn read_from<R: ByteReader + ?Sized>(source: &mut R) -> Result<Self, DeserializationError> {
        let salt = source.read_array()?;
        let len = source.read_len()?;
        Ok(Self { salt, check: source.read_slice(len)?.to_vec() })
    }
}

// BALANCE
// ================================================================================================

/// The four balance figures for one (account, asset) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Balance {
    /// Unspent notes buried at least `confirmations` deep.
    pub confirmed: u128,
    /// Confirmed plus the net effect of this account's mempool activity.
    pub unconfirmed: i128,
    /// The net mempool-only effect: pending receipts minus pending spends.
    pub pending: i128,
    /// Confirmed value not already committed by a pending spend.
    pub available: u128,
}
