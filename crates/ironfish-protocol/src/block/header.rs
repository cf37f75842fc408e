use crate::hash::{BlockHash, MerkleHash};
use crate::sequence::Sequence;
use crate::serde::{
    ByteReader,
    ByteWriter,
    Deserializable,
    DeserializationError,
    Serializable,
};
use crate::target::Target;

/// Length of the miner-chosen graffiti field in bytes.
pub const GRAFFITI_SIZE: usize = 32;

// TREE COMMITMENT
// ================================================================================================

/// A commitment to the note tree: its root and the number of leaves under that root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeCommitment {
    pub root: MerkleHash,
    pub size: u64,
}

impl Serializable for TreeCommitment {
    fn write_into<W: ByteWriter + ?Sized>(&self, target: &mut W) {
        self.root.write_into(target);
        target.write_u64(self.size);
    }
}

impl Deserializable for TreeCommitment {
    fn read_from<R: ByteReader + ?Sized>(source: &mut R) -> Result<Self, DeserializationError> {
        Ok(Self { root: source.read()?, size: source.read_u64()? })
    }
}

// BLOCK HEADER
// ================================================================================================

/// The header of a block.
///
/// A header commits to the chain state after connecting its block:
///
/// - `sequence` is the 1-based height of the block.
/// - `previous_block_hash` is the identity of the parent block.
/// - `note_commitment` is the note tree root and size after appending every output in the
///   block.
/// - `transaction_commitment` is a Merkle root over the hashes of the block's transactions.
/// - `target` is the difficulty threshold the block's own hash must meet.
/// - `randomness` is the miner's nonce.
/// - `timestamp_ms` is the miner-reported creation time in milliseconds since UNIX epoch.
/// - `graffiti` is a free-form 32-byte miner annotation.
/// - `work` is the cumulative chain difficulty up to and including this block. It is
///   derived locally on connect and excluded from the header's identity hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockHeader {
    pub sequence: Sequence,
    pub previous_block_hash: BlockHash,
    pub note_commitment: TreeCommitment,
    pub transaction_commitment: MerkleHash,
    pub target: Target,
    pub randomness: u64,
    pub timestamp_ms: u64,
    pub graffiti: [u8; GRAFFITI_SIZE],
    pub work: u128,
}

impl BlockHeader {
    /// The bytes whose hash identifies this header. Everything in wire order except the
    /// locally-derived cumulative work.
    pub fn hash_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        self.write_identity_fields(&mut bytes);
        bytes
    }

    /// Computes this header's identity hash through the given hasher.
    pub fn hash_with(&self, hash_header: impl Fn(&[u8]) -> [u8; 32]) -> BlockHash {
        BlockHash::new(hash_header(&self.hash_bytes()))
    }

    /// The difficulty contributed by this single block.
    pub fn difficulty(&self) -> u128 {
        self.target.to_difficulty()
    }

    fn write_identity_fields<W: ByteWriter + ?Sized>(&self, target: &mut W) {
        self.sequence.write_into(target);
        self.previous_block_hash.write_into(target);
        self.note_commitment.write_into(target);
        self.transaction_commitment.write_into(target);
        self.target.write_into(target);
        target.write_u64(self.randomness);
        target.write_u64(self.timestamp_ms);
        target.write_bytes(&self.graffiti);
    }
}

impl Serializable for BlockHeader {
    fn write_into<W: ByteWriter + ?Sized>(&self, target: &mut W) {
        self.write_identity_fields(target);
        target.write_u128(self.work);
    }
}

impl Deserializable for BlockHeader {
    fn read_from<R: ByteReader + ?Sized>(source: &mut R) -> Result<Self, DeserializationError> {
        Ok(Self {
            sequence: source.read()?,
            previous_block_hash: source.read()?,
            note_commitment: source.read()?,
            transaction_commitment: source.read()?,
            target: source.read()?,
            randomness: source.read_u64()?,
            timestamp_ms: source.read_u64()?,
            graffiti: source.read_array()?,
            work: source.read_u128()?,
        })
    }
}

// TESTS
// ================================================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_header() -> BlockHeader {
        BlockHeader {
            sequence: Sequence::new(5),
            previous_block_hash: BlockHash::new([1u8; 32]),
            note_commitment: TreeCommitment { root: MerkleHash::new([2u8; 32]), size: 77 },
            transaction_commitment: MerkleHash::new([3u8; 32]),
            target: Target::from_difficulty(1000),
            randomness: 42,
            timestamp_ms: 1_700_000_000_000,
            graffiti: [4u8; GRAFFITI_SIZE],
            work: 12_345,
        }
    }

    #[test]
    fn round_trip() {
        let header = sample_header();
        assert_eq!(BlockHeader::read_from_bytes(&header.to_bytes()).unwrap(), header);
    }

    #[test]
    fn work_does_not_change_identity() {
        let header = sample_header();
        let mut other = header.clone();
        other.work = 99_999;
        assert_eq!(header.hash_bytes(), other.hash_bytes());
        assert_ne!(header.to_bytes(), other.to_bytes());
    }
}
