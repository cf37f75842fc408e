use std::fmt;
use std::str::FromStr;

use crate::errors::HexParseError;
use crate::serde::{
    ByteReader,
    ByteWriter,
    Deserializable,
    DeserializationError,
    Serializable,
};

/// Declares a 32-byte identifier newtype with hex formatting and wire serialization.
macro_rules! hash_newtype {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
        pub struct $name([u8; 32]);

        impl $name {
            pub const SIZE: usize = 32;

            pub const fn new(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }

            pub const fn as_bytes(&self) -> &[u8; 32] {
                &self.0
            }

            pub const fn into_bytes(self) -> [u8; 32] {
                self.0
            }

            pub fn to_hex(&self) -> String {
                hex::encode(self.0)
            }

            pub fn from_hex(value: &str) -> Result<Self, HexParseError> {
                let bytes = hex::decode(value).map_err(HexParseError::Invalid)?;
                let bytes: [u8; 32] = bytes
                    .try_into()
                    .map_err(|bytes: Vec<u8>| HexParseError::WrongLength(bytes.len()))?;
                Ok(Self(bytes))
            }
        }

        impl From<[u8; 32]> for $name {
            fn from(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }
        }

        impl From<$name> for [u8; 32] {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.to_hex())
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.to_hex())
            }
        }

        impl FromStr for $name {
            type Err = HexParseError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                Self::from_hex(value)
            }
        }

        impl Serializable for $name {
            fn write_into<W: ByteWriter + ?Sized>(&self, target: &mut W) {
                target.write_bytes(&self.0);
            }
        }

        impl Deserializable for $name {
            fn read_from<R: ByteReader + ?Sized>(
                source: &mut R,
            ) -> Result<Self, DeserializationError> {
                Ok(Self(source.read_array()?))
            }
        }
    };
}

hash_newtype!(
    /// The identity of a block: the header hash over the canonical header bytes.
    BlockHash
);

hash_newtype!(
    /// The identity of a transaction: the hash over the unsigned transaction body.
    TransactionHash
);

hash_newtype!(
    /// A commitment to an output note. Only the commitment ever appears on chain.
    NoteCommitment
);

hash_newtype!(
    /// The deterministic tag revealed when a note is spent. A nullifier appearing twice on the
    /// canonical chain is the double-spend condition.
    Nullifier
);

hash_newtype!(
    /// An interior or root hash of one of the commitment trees.
    MerkleHash
);

// TESTS
// ================================================================================================
