use crate::serde::{
    ByteReader,
    ByteWriter,
    Deserializable,
    DeserializationError,
    Serializable,
};

/// The wire version of a transaction.
///
/// The version is a single byte and gates optional fields: `V2` adds ownership transfer to
/// mints. Unknown versions are rejected at deserialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum TransactionVersion {
    V1 = 1,
    V2 = 2,
}

impl TransactionVersion {
    /// Returns true if mints of this version may carry `transfer_ownership_to`.
    pub const fn has_mint_transfer_ownership(&self) -> bool {
        matches!(self, Self::V2)
    }

    pub const fn as_u8(&self) -> u8 {
        *self as u8
    }
}

impl TryFrom<u8> for TransactionVersion {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::V1),
            2 => Ok(Self::V2),
            other => Err(other),
        }
    }
}

impl Serializable for TransactionVersion {
    fn write_into<W: ByteWriter + ?Sized>(&self, target: &mut W) {
        target.write_u8(self.as_u8());
    }
}

impl Deserializable for TransactionVersion {
    fn read_from<R: ByteReader + ?Sized>(source: &mut R) -> Result<Self, DeserializationError> {
        let byte = source.read_u8()?;
        Self::try_from(byte).map_err(|byte| {
            DeserializationError::InvalidValue(format!("unknown transaction version {byte}"))
        })
    }
}
