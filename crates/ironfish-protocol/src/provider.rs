use crate::asset::{AssetId, AssetMetadata, AssetName};
use crate::errors::ProviderError;
use crate::hash::{MerkleHash, NoteCommitment, Nullifier, TransactionHash};
use crate::keys::{
    AccountKeys,
    IncomingViewKey,
    OutgoingViewKey,
    PublicAddress,
    SpendingKey,
    ViewKey,
};
use crate::note::{NoteCiphertext, NotePlaintext};
use crate::transaction::{Burn, Mint, Output, Spend, Transaction, TransactionVersion};

// RAW TRANSACTION
// ================================================================================================

/// One spend in a not-yet-posted transaction: the plaintext note being consumed plus the
/// Merkle evidence of its inclusion in the note tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSpend {
    pub note: NotePlaintext,
    /// Leaf index of the note's commitment in the note tree.
    pub position: u64,
    /// Sibling hashes from the leaf up to the root, in leaf-to-root order.
    pub auth_path: Vec<MerkleHash>,
    /// The note tree root the auth path verifies against.
    pub root: MerkleHash,
    /// The note tree size at which the auth path was computed.
    pub tree_size: u64,
}

/// One output in a not-yet-posted transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawOutput {
    pub note: NotePlaintext,
}

/// A transaction assembled by the wallet but not yet proven or signed.
///
/// Posting through [`CryptoProvider::post`] turns this into a [`Transaction`] carrying
/// proofs, signatures and encrypted outputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTransaction {
    pub version: TransactionVersion,
    pub spends: Vec<RawSpend>,
    pub outputs: Vec<RawOutput>,
    pub mints: Vec<RawMint>,
    pub burns: Vec<Burn>,
    pub fee: i64,
    pub expiration: u32,
}

/// A mint in a not-yet-posted transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMint {
    pub creator: PublicAddress,
    pub name: AssetName,
    pub metadata: AssetMetadata,
    pub nonce: u8,
    pub value: u64,
    pub transfer_ownership_to: Option<PublicAddress>,
}

// CRYPTO PROVIDER
// ================================================================================================

/// The seam to the zero-knowledge and hashing primitives.
///
/// Every operation is pure given its inputs, so implementations can be shared freely across
/// threads and calls can be farmed out to a worker pool. The node core never reaches for a
/// hash or proof system directly; everything flows through this trait.
pub trait CryptoProvider: Send + Sync + 'static {
    // HASHING
    // --------------------------------------------------------------------------------------------

    /// Hashes the canonical identity bytes of a block header.
    fn hash_header(&self, bytes: &[u8]) -> [u8; 32];

    /// Hashes the unsigned body of a transaction.
    fn hash_transaction(&self, bytes: &[u8]) -> [u8; 32];

    /// Computes the Merkle root over a block's transaction hashes.
    fn transaction_commitment(&self, hashes: &[TransactionHash]) -> MerkleHash;

    /// Computes the interior-node hash of the commitment trees at the given depth.
    fn merkle_node(&self, depth: u8, left: &MerkleHash, right: &MerkleHash) -> MerkleHash;

    /// Computes the commitment of a note.
    fn note_commitment(&self, note: &NotePlaintext) -> NoteCommitment;

    /// Computes the nullifier revealed when the note at `position` is spent.
    fn nullifier(
        &self,
        view_key: &ViewKey,
        commitment: &NoteCommitment,
        position: u64,
    ) -> Nullifier;

    /// Derives the identity of an asset from its immutable description.
    fn asset_id(
        &self,
        creator: &PublicAddress,
        name: &AssetName,
        metadata: &AssetMetadata,
        nonce: u8,
    ) -> AssetId;

    // VERIFICATION
    // --------------------------------------------------------------------------------------------

    /// Verifies the membership proof and authorizing signature of a spend.
    fn verify_spend(&self, spend: &Spend, unsigned_tx_bytes: &[u8]) -> bool;

    /// Verifies the output proof of an encrypted note.
    fn verify_output(&self, output: &Output) -> bool;

    /// Verifies the mint proof and that `owner` authorized the mint.
    fn verify_mint(&self, mint: &Mint, owner: &PublicAddress, unsigned_tx_bytes: &[u8]) -> bool;

    /// Verifies a burn's consistency.
    fn verify_burn(&self, burn: &Burn) -> bool;

    /// Verifies the balancing signature binding all of a transaction's components.
    fn verify_binding(&self, transaction: &Transaction) -> bool;

    // WALLET OPERATIONS
    // --------------------------------------------------------------------------------------------

    /// Proves and signs a raw transaction, producing a posted [`Transaction`].
    fn post(
        &self,
        raw: &RawTransaction,
        spending_key: &SpendingKey,
    ) -> Result<Transaction, ProviderError>;

    /// Attempts to decrypt a note addressed to the holder of `incoming_view_key`.
    fn decrypt_note_for_owner(
        &self,
        ciphertext: &NoteCiphertext,
        incoming_view_key: &IncomingViewKey,
    ) -> Option<NotePlaintext>;

    /// Attempts to decrypt a note created by the holder of `outgoing_view_key`.
    fn decrypt_note_for_spender(
        &self,
        ciphertext: &NoteCiphertext,
        outgoing_view_key: &OutgoingViewKey,
    ) -> Option<NotePlaintext>;

    /// Derives a full set of account keys from seed entropy.
    fn derive_account(&self, seed: &[u8]) -> AccountKeys;

    // SEALING
    // --------------------------------------------------------------------------------------------

    /// Derives a symmetric master key from a passphrase and salt.
    fn derive_master_key(&self, passphrase: &str, salt: &[u8; 32]) -> [u8; 32];

    /// Encrypts and authenticates a record under the given key.
    fn seal(&self, key: &[u8; 32], plaintext: &[u8]) -> Vec<u8>;

    /// Reverses [`CryptoProvider::seal`]; fails if the key is wrong or the data tampered.
    fn unseal(&self, key: &[u8; 32], ciphertext: &[u8]) -> Result<Vec<u8>, ProviderError>;
}
