use crate::hash::NoteCommitment;
use crate::note::NoteCiphertext;
use crate::serde::{
    ByteReader,
    ByteWriter,
    Deserializable,
    DeserializationError,
    Serializable,
};
use crate::{KEY_LENGTH, PROOF_SIZE};

/// A newly-created encrypted note.
///
/// The commitment is what gets appended to the note tree; the ciphertext is scanned by
/// wallets attempting decryption under their incoming view keys.
#[derive(Clone, PartialEq, Eq)]
pub struct Output {
    pub commitment: NoteCommitment,
    pub ciphertext: NoteCiphertext,
    pub ephemeral_public_key: [u8; KEY_LENGTH],
    pub proof: [u8; PROOF_SIZE],
}

impl std::fmt::Debug for Output {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Output").field("commitment", &self.commitment).finish_non_exhaustive()
    }
}

impl Serializable for Output {
    fn write_into<W: ByteWriter + ?Sized>(&self, target: &mut W) {
        self.commitment.write_into(target);
        self.ciphertext.write_into(target);
        target.write_bytes(&self.ephemeral_public_key);
        target.write_bytes(&self.proof);
    }
}

impl Deserializable for Output {
    fn read_from<R: ByteReader + ?Sized>(source: &mut R) -> Result<Self, DeserializationError> {
        Ok(Self {
            commitment: source.read()?,
            ciphertext: source.read()?,
            ephemeral_public_key: source.read_array()?,
            proof: source.read_array()?,
        })
    }
}
