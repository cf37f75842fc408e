use ironfish_protocol::asset::AssetId;
use ironfish_protocol::hash::{BlockHash, MerkleHash, NoteCommitment, Nullifier, TransactionHash};
use ironfish_protocol::sequence::Sequence;
use ironfish_protocol::serde::{Deserializable, Serializable};

use crate::errors::StorageError;

// KEY CODEC
// ================================================================================================

/// Encoding of a store key.
///
/// Key encodings must preserve ordering under bytewise comparison, so integers are written
/// big-endian here even though values use the little-endian wire codec. Keys that appear as
/// the leading component of a composite key must be fixed-width and report it via `WIDTH`.
pub trait KeyCodec: Sized {
    /// The fixed byte width of this key encoding, if it has one.
    const WIDTH: Option<usize>;

    fn encode_key(&self) -> Vec<u8>;

    fn decode_key(bytes: &[u8]) -> Result<Self, StorageError>;
}

impl KeyCodec for () {
    const WIDTH: Option<usize> = Some(0);

    fn encode_key(&self) -> Vec<u8> {
        Vec::new()
    }

    fn decode_key(bytes: &[u8]) -> Result<Self, StorageError> {
        if bytes.is_empty() {
            Ok(())
        } else {
            Err(StorageError::corrupt("unit key must be empty"))
        }
    }
}

impl KeyCodec for u8 {
    const WIDTH: Option<usize> = Some(1);

    fn encode_key(&self) -> Vec<u8> {
        vec![*self]
    }

    fn decode_key(bytes: &[u8]) -> Result<Self, StorageError> {
        match bytes {
            [byte] => Ok(*byte),
            _ => Err(StorageError::corrupt("u8 key must be exactly one byte")),
        }
    }
}

impl KeyCodec for u32 {
    const WIDTH: Option<usize> = Some(4);

    fn encode_key(&self) -> Vec<u8> {
        self.to_be_bytes().to_vec()
    }

    fn decode_key(bytes: &[u8]) -> Result<Self, StorageError> {
        let bytes: [u8; 4] =
            bytes.try_into().map_err(|_| StorageError::corrupt("u32 key must be 4 bytes"))?;
        Ok(u32::from_be_bytes(bytes))
    }
}

impl KeyCodec for u64 {
    const WIDTH: Option<usize> = Some(8);

    fn encode_key(&self) -> Vec<u8> {
        self.to_be_bytes().to_vec()
    }

    fn decode_key(bytes: &[u8]) -> Result<Self, StorageError> {
        let bytes: [u8; 8] =
            bytes.try_into().map_err(|_| StorageError::corrupt("u64 key must be 8 bytes"))?;
        Ok(u64::from_be_bytes(bytes))
    }
}

impl KeyCodec for Sequence {
    const WIDTH: Option<usize> = Some(4);

    fn encode_key(&self) -> Vec<u8> {
        self.as_u32().to_be_bytes().to_vec()
    }

    fn decode_key(bytes: &[u8]) -> Result<Self, StorageError> {
        Ok(Sequence::new(u32::decode_key(bytes)?))
    }
}

/// Implements [`KeyCodec`] for a 32-byte identifier newtype.
macro_rules! hash_key_codec {
    ($name:ty) => {
        impl KeyCodec for $name {
            const WIDTH: Option<usize> = Some(32);

            fn encode_key(&self) -> Vec<u8> {
                self.as_bytes().to_vec()
            }

            fn decode_key(bytes: &[u8]) -> Result<Self, StorageError> {
                let bytes: [u8; 32] = bytes
                    .try_into()
                    .map_err(|_| StorageError::corrupt("hash key must be 32 bytes"))?;
                Ok(<$name>::new(bytes))
            }
        }
    };
}

hash_key_codec!(BlockHash);
hash_key_codec!(TransactionHash);
hash_key_codec!(NoteCommitment);
hash_key_codec!(Nullifier);
hash_key_codec!(MerkleHash);
hash_key_codec!(AssetId);

impl<A: KeyCodec, B: KeyCodec> KeyCodec for (A, B) {
    const WIDTH: Option<usize> = match (A::WIDTH, B::WIDTH) {
        (Some(a), Some(b)) => Some(a + b),
        _ => None,
    };

    fn encode_key(&self) -> Vec<u8> {
        let mut bytes = self.0.encode_key();
        bytes.extend_from_slice(&self.1.encode_key());
        bytes
    }

    fn decode_key(bytes: &[u8]) -> Result<Self, StorageError> {
        let split = A::WIDTH
            .ok_or_else(|| StorageError::corrupt("leading tuple key must be fixed-width"))?;
        if bytes.len() < split {
            return Err(StorageError::corrupt("composite key shorter than its prefix"));
        }
        Ok((A::decode_key(&bytes[..split])?, B::decode_key(&bytes[split..])?))
    }
}

// VALUE CODEC
// ================================================================================================

/// Encoding of a store value. Everything that speaks the wire codec is storable as-is.
pub trait ValueCodec: Sized {
    fn encode_value(&self) -> Vec<u8>;

    fn decode_value(bytes: &[u8]) -> Result<Self, StorageError>;
}

impl<T: Serializable + Deserializable> ValueCodec for T {
    fn encode_value(&self) -> Vec<u8> {
        self.to_bytes()
    }

    fn decode_value(bytes: &[u8]) -> Result<Self, StorageError> {
        T::read_from_bytes(bytes).map_err(StorageError::corrupt)
    }
}

// TESTS
// ================================================================================================
