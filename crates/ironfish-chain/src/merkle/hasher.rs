use std::sync::Arc;

use ironfish_protocol::hash::{MerkleHash, NoteCommitment, Nullifier};
use ironfish_protocol::provider::CryptoProvider;

/// Hashing strategy of an append-only commitment tree.
///
/// `leaf` maps an element to its level-0 hash and `combine` produces an interior node from
/// its two children. The depth argument lets domain-separated hashers bind each level.
pub trait MerkleHasher: Send + Sync {
    type Element;

    fn leaf(&self, element: &Self::Element) -> MerkleHash;

    fn combine(&self, depth: u8, left: &MerkleHash, right: &MerkleHash) -> MerkleHash;
}

// PROVIDER-BACKED HASHERS
// ================================================================================================

/// Hasher of the note commitment tree. Leaves are note commitments, which are already
/// hashes; interior nodes come from the crypto provider.
pub struct NoteTreeHasher<P> {
    provider: Arc<P>,
}

impl<P> NoteTreeHasher<P> {
    pub fn new(provider: Arc<P>) -> Self {
        Self { provider }
    }
}

impl<P: CryptoProvider> MerkleHasher for NoteTreeHasher<P> {
    type Element = NoteCommitment;

    fn leaf(&self, element: &Self::Element) -> MerkleHash {
        MerkleHash::new(*element.as_bytes())
    }

    fn combine(&self, depth: u8, left: &MerkleHash, right: &MerkleHash) -> MerkleHash {
        self.provider.merkle_node(depth, left, right)
    }
}

/// Hasher of the nullifier tree.
pub struct NullifierTreeHasher<P> {
    provider: Arc<P>,
}

impl<P> NullifierTreeHasher<P> {
    pub fn new(provider: Arc<P>) -> Self {
        Self { provider }
    }
}

impl<P: CryptoProvider> MerkleHasher for NullifierTreeHasher<P> {
    type Element = Nullifier;

    fn leaf(&self, element: &Self::Element) -> MerkleHash {
        MerkleHash::new(*element.as_bytes())
    }

    fn combine(&self, depth: u8, left: &MerkleHash, right: &MerkleHash) -> MerkleHash {
        self.provider.merkle_node(depth, left, right)
    }
}
