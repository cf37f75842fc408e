use std::fmt;

use primitive_types::U256;

use crate::serde::{
    ByteReader,
    ByteWriter,
    Deserializable,
    DeserializationError,
    Serializable,
};

/// The 256-bit threshold a block's header hash must not exceed.
///
/// A smaller target means a larger difficulty. The two are related by
/// `difficulty = (2^256 - 1) / target`, which is an exact involution with
/// [`Target::from_difficulty`] for every difficulty that fits in a `u128`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Target(U256);

impl Target {
    /// The largest (easiest) representable target.
    pub const MAX: Self = Self(U256::MAX);

    pub const fn new(value: U256) -> Self {
        Self(value)
    }

    pub fn from_le_bytes(bytes: [u8; 32]) -> Self {
        Self(U256::from_little_endian(&bytes))
    }

    pub fn to_le_bytes(&self) -> [u8; 32] {
        let mut bytes = [0u8; 32];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = self.0.byte(i);
        }
        bytes
    }

    pub const fn as_u256(&self) -> U256 {
        self.0
    }

    /// Returns true if the given header hash, interpreted as a big-endian 256-bit integer,
    /// meets this target.
    pub fn meets(&self, hash: &crate::hash::BlockHash) -> bool {
        U256::from_big_endian(hash.as_bytes()) <= self.0
    }

    /// Converts this target into its difficulty.
    ///
    /// Saturates at `u128::MAX`; targets that small do not occur on any real chain.
    pub fn to_difficulty(&self) -> u128 {
        if self.0.is_zero() {
            return u128::MAX;
        }
        let difficulty = U256::MAX / self.0;
        if difficulty.bits() > 128 { u128::MAX } else { difficulty.as_u128() }
    }

    /// Converts a difficulty back into the largest target meeting it.
    pub fn from_difficulty(difficulty: u128) -> Self {
        let difficulty = difficulty.max(1);
        Self(U256::MAX / U256::from(difficulty))
    }

    /// Computes the target for a block mined at `timestamp_ms` on top of a parent with the
    /// given target and timestamp.
    ///
    /// Difficulty follows a damped controller: each elapsed bucket of
    /// `target_bucket_time_in_seconds` beyond the target block time lowers difficulty by
    /// `parent_difficulty / 2048`, and each bucket under it raises difficulty by the same
    /// step, with the adjustment clamped to ±99 steps and the result floored at
    /// `min_difficulty`.
    pub fn calculate(
        parent_target: Target,
        parent_timestamp_ms: u64,
        timestamp_ms: u64,
        target_block_time_in_seconds: u64,
        target_bucket_time_in_seconds: u64,
        min_difficulty: u128,
    ) -> Self {
        let parent_difficulty = parent_target.to_difficulty();
        let elapsed_seconds = timestamp_ms.saturating_sub(parent_timestamp_ms) as i128 / 1000;

        let buckets = (elapsed_seconds - target_block_time_in_seconds as i128)
            .div_euclid(target_bucket_time_in_seconds.max(1) as i128);
        let adjustment = (-buckets).clamp(-99, 99);

        let step = (parent_difficulty / 2048) as i128;
        let difficulty = parent_difficulty as i128 + step * adjustment;
        let difficulty = difficulty.max(min_difficulty.max(1) as i128) as u128;

        Self::from_difficulty(difficulty)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serializable for Target {
    fn write_into<W: ByteWriter + ?Sized>(&self, target: &mut W) {
        target.write_bytes(&self.to_le_bytes());
    }
}

impl Deserializable for Target {
    fn read_from<R: ByteReader + ?Sized>(source: &mut R) -> Result<Self, DeserializationError> {
        Ok(Self::from_le_bytes(source.read_array()?))
    }
}

// TESTS
// ================================================================================================
