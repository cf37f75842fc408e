use ironfish_protocol::hash::{BlockHash, Nullifier};
use ironfish_protocol::sequence::Sequence;
use ironfish_storage::StorageError;
use thiserror::Error;

// VALIDATION REASON
// ================================================================================================

/// Why a block or transaction was refused.
///
/// These are data, not failures: an invalid object is dropped and its submitter penalized,
/// but the node keeps running. Storage trouble is the only thing treated as fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationReason {
    /// The header hash does not meet the header's own target.
    HashNotMeetTarget,
    /// The header timestamp lies too far in the future of local time.
    TooFarInFuture,
    /// The header timestamp precedes its parent's while sequential block time is enforced.
    BlockTooOld,
    /// The sequence is not parent + 1.
    SequenceOutOfOrder,
    /// The header's target disagrees with the difficulty schedule.
    InvalidTarget,
    /// The graffiti field is malformed.
    Graffiti,
    /// The header's note-commitment size disagrees with the running output count.
    NoteCommitmentSize,
    /// The header's note-commitment root disagrees with the tree after connecting.
    NoteCommitmentRoot,
    /// The transaction commitment does not cover the block's transactions.
    TransactionCommitment,
    /// The first transaction is missing or not shaped like a miner's fee.
    InvalidMinersFee,
    /// A spend or output proof failed verification.
    InvalidProof,
    /// A spend's signature, anchor root or tree size is invalid.
    InvalidSpend,
    /// A mint is not authorized by the asset owner.
    InvalidMint,
    /// A burn exceeds the asset's circulating supply or names the native asset.
    InvalidBurn,
    /// The transaction's binding signature failed verification.
    InvalidBinding,
    /// A nullifier is already present in the nullifier tree.
    DoubleSpend { nullifier: Nullifier },
    /// The transaction expired at or before the block's sequence.
    TransactionExpired,
    /// A regular transaction carries a negative fee.
    NegativeFee,
    /// The block at a checkpointed sequence does not carry the checkpoint hash.
    BehindCheckpoint,
}

impl std::fmt::Display for ValidationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::HashNotMeetTarget => "HASH_NOT_MEET_TARGET",
            Self::TooFarInFuture => "TOO_FAR_IN_FUTURE",
            Self::BlockTooOld => "BLOCK_TOO_OLD",
            Self::SequenceOutOfOrder => "SEQUENCE_OUT_OF_ORDER",
            Self::InvalidTarget => "INVALID_TARGET",
            Self::Graffiti => "GRAFFITI",
            Self::NoteCommitmentSize => "NOTE_COMMITMENT_SIZE",
            Self::NoteCommitmentRoot => "NOTE_COMMITMENT_ROOT",
            Self::TransactionCommitment => "TRANSACTION_COMMITMENT",
            Self::InvalidMinersFee => "INVALID_MINERS_FEE",
            Self::InvalidProof => "INVALID_TRANSACTION_PROOF",
            Self::InvalidSpend => "INVALID_SPEND",
            Self::InvalidMint => "INVALID_MINT",
            Self::InvalidBurn => "INVALID_BURN",
            Self::InvalidBinding => "INVALID_BINDING",
            Self::DoubleSpend { .. } => "DOUBLE_SPEND",
            Self::TransactionExpired => "TRANSACTION_EXPIRED",
            Self::NegativeFee => "NEGATIVE_FEE",
            Self::BehindCheckpoint => "BEHIND_CHECKPOINT",
        };
        f.write_str(name)
    }
}

// TREE ERROR
// ================================================================================================

#[derive(Debug, Error)]
pub enum TreeError {
    #[error("the tree has no room for another leaf")]
    TreeFull,
    #[error("leaf index {index} is beyond the tree size {size}")]
    IndexOutOfRange { index: u64, size: u64 },
    #[error("size {requested} exceeds the tree size {size}")]
    SizeOutOfRange { requested: u64, size: u64 },
    #[error(transparent)]
    Storage(#[from] StorageError),
}

// CHAIN ERROR
// ================================================================================================

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("genesis block mismatch: database has {stored}, network defines {expected}")]
    GenesisMismatch { stored: BlockHash, expected: BlockHash },

    #[error("block {0} not found")]
    BlockNotFound(BlockHash),

    #[error("no block at sequence {0} on the main chain")]
    SequenceNotFound(Sequence),

    #[error("chain has no head; genesis has not been added")]
    EmptyChain,

    #[error(transparent)]
    Tree(#[from] TreeError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}
