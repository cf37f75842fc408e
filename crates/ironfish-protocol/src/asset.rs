use std::fmt;

use crate::errors::HexParseError;
use crate::hash::TransactionHash;
use crate::keys::PublicAddress;
use crate::serde::{
    ByteReader,
    ByteWriter,
    Deserializable,
    DeserializationError,
    Serializable,
};

// ASSET ID
// ================================================================================================

/// The identity of an asset: `H(creator ‖ name ‖ metadata ‖ nonce)` as computed by the
/// crypto provider. The all-zero id is reserved for the native asset.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct AssetId([u8; 32]);

impl AssetId {
    pub const SIZE: usize = 32;

    /// The identifier of the chain's native asset. Fees and mining rewards are denominated
    /// in it, and it is never minted through a transaction.
    pub const NATIVE: Self = Self([0u8; 32]);

    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub const fn is_native(&self) -> bool {
        let mut i = 0;
        while i < self.0.len() {
            if self.0[i] != 0 {
                return false;
            }
            i += 1;
        }
        true
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(value: &str) -> Result<Self, HexParseError> {
        let bytes = hex::decode(value).map_err(HexParseError::Invalid)?;
        let bytes: [u8; 32] =
            bytes.try_into().map_err(|bytes: Vec<u8>| HexParseError::WrongLength(bytes.len()))?;
        Ok(Self(bytes))
    }
}

impl From<[u8; 32]> for AssetId {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for AssetId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AssetId({})", self.to_hex())
    }
}

impl Serializable for AssetId {
    fn write_into<W: ByteWriter + ?Sized>(&self, target: &mut W) {
        target.write_bytes(&self.0);
    }
}

impl Deserializable for AssetId {
    fn read_from<R: ByteReader + ?Sized>(source: &mut R) -> Result<Self, DeserializationError> {
        Ok(Self(source.read_array()?))
    }
}

// ASSET NAME AND METADATA
// ================================================================================================

/// The fixed-width, zero-padded display name of an asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AssetName([u8; 32]);

impl AssetName {
    pub const SIZE: usize = 32;

    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Builds a name from a utf-8 string, zero-padded on the right. Longer names are
    /// rejected by the caller; this truncates defensively at the field width.
    pub fn from_str_lossy(name: &str) -> Self {
        let mut bytes = [0u8; 32];
        let len = name.len().min(32);
        bytes[..len].copy_from_slice(&name.as_bytes()[..len]);
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl Serializable for AssetName {
    fn write_into<W: ByteWriter + ?Sized>(&self, target: &mut W) {
        target.write_bytes(&self.0);
    }
}

impl Deserializable for AssetName {
    fn read_from<R: ByteReader + ?Sized>(source: &mut R) -> Result<Self, DeserializationError> {
        Ok(Self(source.read_array()?))
    }
}

/// Free-form, fixed-width asset metadata chosen by the creator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AssetMetadata([u8; 96]);

impl AssetMetadata {
    pub const SIZE: usize = 96;

    pub const fn new(bytes: [u8; 96]) -> Self {
        Self(bytes)
    }

    pub const fn empty() -> Self {
        Self([0u8; 96])
    }

    pub const fn as_bytes(&self) -> &[u8; 96] {
        &self.0
    }
}

impl Serializable for AssetMetadata {
    fn write_into<W: ByteWriter + ?Sized>(&self, target: &mut W) {
        target.write_bytes(&self.0);
    }
}

impl Deserializable for AssetMetadata {
    fn read_from<R: ByteReader + ?Sized>(source: &mut R) -> Result<Self, DeserializationError> {
        Ok(Self(source.read_array()?))
    }
}

// ASSET RECORD
// ================================================================================================

/// The chain's view of one asset: identity, current owner, and circulating supply.
///
/// A record is created by the first mint and updated by every later mint or burn. Records
/// are never deleted; a fully-burned asset simply has zero supply. `supply ≥ 0` holds at
/// every commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRecord {
    pub id: AssetId,
    pub creator: PublicAddress,
    /// The address allowed to mint. Starts as the creator and may move with an ownership
    /// transfer on a v2 mint.
    pub owner: PublicAddress,
    pub name: AssetName,
    pub metadata: AssetMetadata,
    pub supply: u64,
    pub nonce: u8,
    /// The transaction whose mint first created this asset.
    pub created_tx_hash: TransactionHash,
}

impl Serializable for AssetRecord {
    fn write_into<W: ByteWriter + ?Sized>(&self, target: &mut W) {
        self.id.write_into(target);
        self.creator.write_into(target);
        self.owner.write_into(target);
        self.name.write_into(target);
        self.metadata.write_into(target);
        target.write_u64(self.supply);
        target.write_u8(self.nonce);
        self.created_tx_hash.write_into(target);
    }
}

impl Deserializable for AssetRecord {
    fn read_from<R: ByteReader + ?Sized>(source: &mut R) -> Result<Self, DeserializationError> {
        Ok(Self {
            id: source.read()?,
            creator: source.read()?,
            owner: source.read()?,
            name: source.read()?,
            metadata: source.read()?,
            supply: source.read_u64()?,
            nonce: source.read_u8()?,
            created_tx_hash: source.read()?,
        })
    }
}

// TESTS
// ================================================================================================
