use std::collections::BTreeMap;

use crate::block::Block;
use crate::hash::BlockHash;
use crate::sequence::Sequence;

/// Number of ore in one iron.
pub const ORE_PER_IRON: u64 = 100_000_000;

// CONSENSUS PARAMETERS
// ================================================================================================

/// The value-struct of consensus rules for one network.
///
/// This is passed by value into the verifier and the blockchain so that neither holds a
/// back-reference to the other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsensusParameters {
    /// How far in the future a header timestamp may lie relative to local time.
    pub allowed_block_future_seconds: u64,
    /// The supply allocated in the genesis block, in iron.
    pub genesis_supply_in_iron: u64,
    /// The block time the difficulty controller steers toward.
    pub target_block_time_in_seconds: u64,
    /// The damping bucket of the difficulty controller.
    pub target_bucket_time_in_seconds: u64,
    /// Number of blocks between mining-reward halvings.
    pub halving_interval: u64,
    /// Floor for the difficulty controller.
    pub min_difficulty: u128,
    /// When set, a child's sequence must be exactly parent + 1 and timestamps must be
    /// non-decreasing along the chain.
    pub enforce_sequential_block_time: bool,
    /// Blocks at these sequences must carry exactly these hashes; branches that disagree
    /// are rejected wholesale.
    pub checkpoints: BTreeMap<Sequence, BlockHash>,
}

impl ConsensusParameters {
    /// The mining reward at the given sequence, in ore.
    ///
    /// The per-block reward starts at `floor(genesis_supply × ln 2 / halving_interval)`
    /// iron and halves every `halving_interval` blocks. ln 2 is applied as the rational
    /// 693147 / 1000000 so consensus never touches floating point.
    pub fn mining_reward(&self, sequence: Sequence) -> u64 {
        let interval = self.halving_interval.max(1);
        let base_ore = (self.genesis_supply_in_iron as u128)
            .saturating_mul(ORE_PER_IRON as u128)
            .saturating_mul(693_147)
            / 1_000_000
            / interval as u128;

        let era = (sequence.as_u64().saturating_sub(1)) / interval;
        if era >= 128 {
            return 0;
        }
        (base_ore >> era) as u64
    }

    /// Returns the required hash at `sequence`, if a checkpoint is defined there.
    pub fn checkpoint_hash(&self, sequence: Sequence) -> Option<&BlockHash> {
        self.checkpoints.get(&sequence)
    }

    /// The sequence of the highest checkpoint, below which the chain is considered final.
    pub fn max_checkpoint_sequence(&self) -> Option<Sequence> {
        self.checkpoints.keys().next_back().copied()
    }
}

// NETWORK DEFINITION
// ================================================================================================

/// Everything a node needs to join one network: peers to dial, the consensus rules, and
/// the genesis block itself.
#[derive(Debug, Clone)]
pub struct NetworkDefinition {
    pub bootstrap_nodes: Vec<String>,
    pub consensus: ConsensusParameters,
    pub genesis: Block,
}

// TESTS
// ================================================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn params(supply: u64, halving: u64) -> ConsensusParameters {
        ConsensusParameters {
            allowed_block_future_seconds: 15,
            genesis_supply_in_iron: supply,
            target_block_time_in_seconds: 60,
            target_bucket_time_in_seconds: 10,
            halving_interval: halving,
            min_difficulty: 1,
            enforce_sequential_block_time: true,
            checkpoints: BTreeMap::new(),
        }
    }

    #[test]
    fn reward_halves_per_era() {
        let params = params(42_000_000, 1000);
        let first = params.mining_reward(Sequence::new(1));
        assert!(first > 0);
        assert_eq!(params.mining_reward(Sequence::new(1000)), first);
        assert_eq!(params.mining_reward(Sequence::new(1001)), first / 2);
        assert_eq!(params.mining_reward(Sequence::new(2001)), first / 4);
    }

    #[test]
    fn reward_eventually_reaches_zero() {
        let params = params(42_000_000, 1);
        assert_eq!(params.mining_reward(Sequence::new(u32::MAX)), 0);
    }

    #[test]
    fn checkpoint_lookup() {
        let mut params = params(1, 1);
        let hash = BlockHash::new([7u8; 32]);
        params.checkpoints.insert(Sequence::new(50), hash);
        assert_eq!(params.checkpoint_hash(Sequence::new(50)), Some(&hash));
        assert_eq!(params.checkpoint_hash(Sequence::new(51)), None);
        assert_eq!(params.max_checkpoint_sequence(), Some(Sequence::new(50)));
    }
}
