pub mod asset;
pub mod block;
pub mod consensus;
pub mod errors;
pub mod hash;
pub mod keys;
pub mod network;
pub mod note;
pub mod provider;
pub mod sequence;
pub mod serde;
pub mod target;
pub mod transaction;

// RE-EXPORTS
// ================================================================================================

pub use asset::{AssetId, AssetMetadata, AssetName, AssetRecord};
pub use block::{Block, BlockHeader, GRAFFITI_SIZE, TreeCommitment};
pub use consensus::{ConsensusParameters, NetworkDefinition, ORE_PER_IRON};
pub use errors::{HexParseError, ProviderError};
pub use hash::{BlockHash, MerkleHash, NoteCommitment, Nullifier, TransactionHash};
pub use keys::{
    AccountKeys,
    IncomingViewKey,
    OutgoingViewKey,
    PublicAddress,
    SpendingKey,
    ViewKey,
};
pub use network::{NetworkEvent, PeerNetwork};
pub use note::{Memo, NOTE_CIPHERTEXT_SIZE, NOTE_PLAINTEXT_SIZE, NoteCiphertext, NotePlaintext};
pub use provider::{CryptoProvider, RawMint, RawOutput, RawSpend, RawTransaction};
pub use sequence::Sequence;
pub use target::Target;
pub use transaction::{Burn, Mint, Output, Spend, Transaction, TransactionVersion};

// CONSTANTS
// ================================================================================================

/// Byte width of view, spend and ephemeral keys.
pub const KEY_LENGTH: usize = 32;

/// Byte width of an asset identifier.
pub const ASSET_ID_LENGTH: usize = 32;

/// Character width of the human-readable rendering of a public address. The raw form is
/// [`KEY_LENGTH`] bytes.
pub const PUBLIC_ADDRESS_LENGTH: usize = 43;

/// Byte width of a zero-knowledge proof as carried on spends, outputs and mints.
pub const PROOF_SIZE: usize = 192;

/// Byte width of an authorizing or binding signature.
pub const SIGNATURE_SIZE: usize = 64;

/// Byte width of a decrypted note payload.
pub const NOTE_SIZE: usize = note::NOTE_PLAINTEXT_SIZE;

/// Byte width of a serialized spend.
pub const SPEND_SIZE: usize = 32 + 32 + 8 + PROOF_SIZE + SIGNATURE_SIZE;

/// Byte width of a serialized output.
pub const OUTPUT_SIZE: usize = 32 + note::NOTE_CIPHERTEXT_SIZE + KEY_LENGTH + PROOF_SIZE;

/// Depth of the note and nullifier commitment trees.
pub const TREE_DEPTH: u8 = 32;
