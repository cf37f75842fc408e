use crate::hash::{MerkleHash, Nullifier};
use crate::serde::{
    ByteReader,
    ByteWriter,
    Deserializable,
    DeserializationError,
    Serializable,
};
use crate::{PROOF_SIZE, SIGNATURE_SIZE};

/// A spend of a previously-committed note.
///
/// The note itself is never revealed: the spend proves, in zero knowledge, membership of
/// some note under `commitment_root` at `tree_size` leaves, and reveals the note's
/// [`Nullifier`] so the chain can refuse a second spend.
#[derive(Clone, PartialEq, Eq)]
pub struct Spend {
    pub nullifier: Nullifier,
    /// A historical root of the note commitment tree the membership proof is anchored to.
    pub commitment_root: MerkleHash,
    /// The size of the note tree at the anchored root.
    pub tree_size: u64,
    pub proof: [u8; PROOF_SIZE],
    /// Signature binding this spend to the transaction, verifiable with the randomized
    /// public key carried on the transaction.
    pub authorizing_signature: [u8; SIGNATURE_SIZE],
}

impl std::fmt::Debug for Spend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Spend")
            .field("nullifier", &self.nullifier)
            .field("commitment_root", &self.commitment_root)
            .field("tree_size", &self.tree_size)
            .finish_non_exhaustive()
    }
}

impl Serializable for Spend {
    fn write_into<W: ByteWriter + ?Sized>(&self, target: &mut W) {
        self.nullifier.write_into(target);
        self.commitment_root.write_into(target);
        target.write_u64(self.tree_size);
        target.write_bytes(&self.proof);
        target.write_bytes(&self.authorizing_signature);
    }
}

impl Deserializable for Spend {
    fn read_from<R: ByteReader + ?Sized>(source: &mut R) -> Result<Self, DeserializationError> {
        Ok(Self {
            nullifier: source.read()?,
            commitment_root: source.read()?,
            tree_size: source.read_u64()?,
            proof: source.read_array()?,
            authorizing_signature: source.read_array()?,
        })
    }
}
