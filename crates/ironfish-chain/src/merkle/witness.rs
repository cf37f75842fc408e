use ironfish_protocol::hash::MerkleHash;
use ironfish_protocol::serde::{
    ByteReader,
    ByteWriter,
    Deserializable,
    DeserializationError,
    Serializable,
};

use super::hasher::MerkleHasher;

/// The Merkle evidence that an element sits at `position` in a tree of `tree_size` leaves
/// with root `root_hash`.
///
/// `auth_path` holds one sibling hash per level, leaf-to-root. A witness taken at some tree
/// size stays verifiable against `(root_hash, tree_size)` even after the tree grows,
/// because the subtree left of any appended leaf is immutable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Witness {
    pub position: u64,
    pub auth_path: Vec<MerkleHash>,
    pub root_hash: MerkleHash,
    pub tree_size: u64,
}

impl Witness {
    /// Recomputes the root from `element` and the auth path and compares it against the
    /// witnessed root.
    pub fn verify<H: MerkleHasher>(&self, hasher: &H, element: &H::Element) -> bool {
        let mut hash = hasher.leaf(element);
        let mut index = self.position;
        for (depth, sibling) in self.auth_path.iter().enumerate() {
            hash = if index & 1 == 0 {
                hasher.combine(depth as u8, &hash, sibling)
            } else {
                hasher.combine(depth as u8, sibling, &hash)
            };
            index >>= 1;
        }
        hash == self.root_hash
    }
}

impl Serializable for Witness {
    fn write_into<W: ByteWriter + ?Sized>(&self, target: &mut W) {
        target.write_u64(self.position);
        self.auth_path.write_into(target);
        self.root_hash.write_into(target);
        target.write_u64(self.tree_size);
    }
}

impl Deserializable for Witness {
    fn read_from<R: ByteReader + ?Sized>(source: &mut R) -> Result<Self, DeserializationError> {
        Ok(Self {
            position: source.read_u64()?,
            auth_path: source.read()?,
            root_hash: source.read()?,
            tree_size: source.read_u64()?,
        })
    }
}
