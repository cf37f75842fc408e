use crate::asset::AssetId;
use crate::keys::PublicAddress;
use crate::serde::{
    ByteReader,
    ByteWriter,
    Deserializable,
    DeserializationError,
    Serializable,
};

/// Size of the plaintext note payload in bytes.
pub const NOTE_PLAINTEXT_SIZE: usize = 136;

/// Size of an encrypted note ciphertext in bytes: the plaintext plus a 32-byte owner tag.
pub const NOTE_CIPHERTEXT_SIZE: usize = NOTE_PLAINTEXT_SIZE + 32;

// MEMO
// ================================================================================================

/// A 32-byte memo attached to a note, visible only to holders of the view keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Memo(pub [u8; 32]);

impl Memo {
    pub fn from_str_lossy(value: &str) -> Self {
        let mut bytes = [0u8; 32];
        let len = value.len().min(32);
        bytes[..len].copy_from_slice(&value.as_bytes()[..len]);
        Self(bytes)
    }
}

impl Serializable for Memo {
    fn write_into<W: ByteWriter + ?Sized>(&self, target: &mut W) {
        target.write_bytes(&self.0);
    }
}

impl Deserializable for Memo {
    fn read_from<R: ByteReader + ?Sized>(source: &mut R) -> Result<Self, DeserializationError> {
        Ok(Self(source.read_array()?))
    }
}

// NOTE PLAINTEXT
// ================================================================================================

/// The decrypted payload of an output note.
///
/// Only the note's commitment appears on chain; this payload is recovered by whoever holds
/// the incoming view key the ciphertext was addressed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotePlaintext {
    /// The address that can spend this note.
    pub owner: PublicAddress,
    pub value: u64,
    pub memo: Memo,
    pub asset_id: AssetId,
    /// The address that created this note.
    pub sender: PublicAddress,
}

impl Serializable for NotePlaintext {
    fn write_into<W: ByteWriter + ?Sized>(&self, target: &mut W) {
        self.owner.write_into(target);
        target.write_u64(self.value);
        self.memo.write_into(target);
        self.asset_id.write_into(target);
        self.sender.write_into(target);
    }
}

impl Deserializable for NotePlaintext {
    fn read_from<R: ByteReader + ?Sized>(source: &mut R) -> Result<Self, DeserializationError> {
        Ok(Self {
            owner: source.read()?,
            value: source.read_u64()?,
            memo: source.read()?,
            asset_id: source.read()?,
            sender: source.read()?,
        })
    }
}

// NOTE CIPHERTEXT
// ================================================================================================

/// An encrypted note as carried inside a transaction output.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct NoteCiphertext(pub [u8; NOTE_CIPHERTEXT_SIZE]);

impl NoteCiphertext {
    pub const SIZE: usize = NOTE_CIPHERTEXT_SIZE;

    pub const fn as_bytes(&self) -> &[u8; NOTE_CIPHERTEXT_SIZE] {
        &self.0
    }
}

impl std::fmt::Debug for NoteCiphertext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "NoteCiphertext({}..)", hex::encode(&self.0[..8]))
    }
}

impl Serializable for NoteCiphertext {
    fn write_into<W: ByteWriter + ?Sized>(&self, target: &mut W) {
        target.write_bytes(&self.0);
    }
}

impl Deserializable for NoteCiphertext {
    fn read_from<R: ByteReader + ?Sized>(source: &mut R) -> Result<Self, DeserializationError> {
        Ok(Self(source.read_array()?))
    }
}

// TESTS
// ================================================================================================
