use std::fmt;

use crate::serde::{
    ByteReader,
    ByteWriter,
    Deserializable,
    DeserializationError,
    Serializable,
};

/// A 1-based block height on some chain of blocks. The genesis block has sequence 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Sequence(u32);

impl Sequence {
    /// The sequence of the genesis block.
    pub const GENESIS: Self = Self(1);

    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    pub const fn as_u32(&self) -> u32 {
        self.0
    }

    pub const fn as_u64(&self) -> u64 {
        self.0 as u64
    }

    /// Returns the sequence of a child block.
    pub const fn child(&self) -> Self {
        Self(self.0 + 1)
    }

    /// Returns the sequence of the parent block, or `None` at genesis.
    pub fn parent(&self) -> Option<Self> {
        (self.0 > 1).then(|| Self(self.0 - 1))
    }

    pub const fn is_genesis(&self) -> bool {
        self.0 == 1
    }

    /// Saturating distance between two sequences.
    pub const fn distance(&self, other: &Self) -> u32 {
        self.0.abs_diff(other.0)
    }
}

impl From<u32> for Sequence {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl From<Sequence> for u32 {
    fn from(value: Sequence) -> Self {
        value.0
    }
}

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serializable for Sequence {
    fn write_into<W: ByteWriter + ?Sized>(&self, target: &mut W) {
        target.write_u32(self.0);
    }
}

impl Deserializable for Sequence {
    fn read_from<R: ByteReader + ?Sized>(source: &mut R) -> Result<Self, DeserializationError> {
        Ok(Self(source.read_u32()?))
    }
}
