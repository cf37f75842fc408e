use std::sync::Arc;

use ironfish_protocol::block::{Block, BlockHeader};
use ironfish_protocol::consensus::ConsensusParameters;
use ironfish_protocol::hash::BlockHash;
use ironfish_protocol::provider::CryptoProvider;
use ironfish_protocol::target::Target;
use ironfish_protocol::transaction::Transaction;
use tracing::warn;

use crate::errors::ValidationReason;

/// The stateless half of block and transaction validation.
///
/// Everything here is decidable from the object itself plus the consensus parameters and
/// the local clock; rules that need chain state (anchors, nullifiers, retargeting against
/// a parent) run inside the blockchain's connect path, which calls back into the
/// parent-rule helpers below.
///
/// The verifier holds the consensus parameters by value and no reference to the chain.
pub struct Verifier<P> {
    provider: Arc<P>,
    consensus: ConsensusParameters,
}

impl<P: CryptoProvider> Verifier<P> {
    pub fn new(provider: Arc<P>, consensus: ConsensusParameters) -> Self {
        Self { provider, consensus }
    }

    pub fn consensus(&self) -> &ConsensusParameters {
        &self.consensus
    }

    // STATELESS RULES
    // --------------------------------------------------------------------------------------------

    /// Header rules that need no chain state: proof of work and clock sanity.
    pub fn verify_header(
        &self,
        header: &BlockHeader,
        hash: &BlockHash,
        now_ms: u64,
    ) -> Result<(), ValidationReason> {
        if !header.target.meets(hash) {
            return Err(ValidationReason::HashNotMeetTarget);
        }

        let horizon = now_ms.saturating_add(self.consensus.allowed_block_future_seconds * 1000);
        if header.timestamp_ms > horizon {
            return Err(ValidationReason::TooFarInFuture);
        }

        Ok(())
    }

    /// Block-shape rules: the miner's fee leads the block, every other transaction pays a
    /// non-negative fee, proofs and signatures verify, and the header's transaction
    /// commitment covers exactly the transactions present.
    pub fn verify_block(&self, block: &Block) -> Result<(), ValidationReason> {
        let miners_fee = block.miners_fee().ok_or(ValidationReason::InvalidMinersFee)?;
        if !miners_fee.is_miners_fee_shape() {
            return Err(ValidationReason::InvalidMinersFee);
        }

        let mut tx_hashes = Vec::with_capacity(block.transactions.len());
        for (index, transaction) in block.transactions.iter().enumerate() {
            if index > 0 {
                self.verify_transaction(transaction)?;
            } else {
                self.verify_proofs(transaction)?;
            }
            tx_hashes
                .push(transaction.hash_with(|bytes| self.provider.hash_transaction(bytes)));
        }

        let commitment = self.provider.transaction_commitment(&tx_hashes);
        if commitment != block.header.transaction_commitment {
            return Err(ValidationReason::TransactionCommitment);
        }

        Ok(())
    }

    /// Stateless rules for a single user transaction, as applied at mempool admission and
    /// inside block validation.
    pub fn verify_transaction(&self, transaction: &Transaction) -> Result<(), ValidationReason> {
        if transaction.fee() < 0 {
            return Err(ValidationReason::NegativeFee);
        }
        self.verify_proofs(transaction)
    }

    fn verify_proofs(&self, transaction: &Transaction) -> Result<(), ValidationReason> {
        let unsigned = transaction.unsigned_bytes();

        for spend in transaction.spends() {
            if !self.provider.verify_spend(spend, &unsigned) {
                warn!(target: "ironfish::verifier", "spend proof failed");
                return Err(ValidationReason::InvalidProof);
            }
        }
        for output in transaction.outputs() {
            if !self.provider.verify_output(output) {
                warn!(target: "ironfish::verifier", "output proof failed");
                return Err(ValidationReason::InvalidProof);
            }
        }
        for burn in transaction.burns() {
            if burn.asset_id.is_native() || !self.provider.verify_burn(burn) {
                return Err(ValidationReason::InvalidBurn);
            }
        }
        if !self.provider.verify_binding(transaction) {
            return Err(ValidationReason::InvalidBinding);
        }
        Ok(())
    }

    // PARENT RULES
    // --------------------------------------------------------------------------------------------

    /// Header rules against the parent: sequence, timestamp monotonicity, and the
    /// difficulty schedule.
    pub fn verify_against_parent(
        &self,
        header: &BlockHeader,
        parent: &BlockHeader,
    ) -> Result<(), ValidationReason> {
        if self.consensus.enforce_sequential_block_time {
            if header.sequence != parent.sequence.child() {
                return Err(ValidationReason::SequenceOutOfOrder);
            }
            if header.timestamp_ms < parent.timestamp_ms {
                return Err(ValidationReason::BlockTooOld);
            }
        }

        let expected = self.expected_target(parent, header.timestamp_ms);
        if header.target != expected {
            return Err(ValidationReason::InvalidTarget);
        }

        Ok(())
    }

    /// The target a block mined on `parent` at `timestamp_ms` must carry.
    pub fn expected_target(&self, parent: &BlockHeader, timestamp_ms: u64) -> Target {
        Target::calculate(
            parent.target,
            parent.timestamp_ms,
            timestamp_ms,
            self.consensus.target_block_time_in_seconds,
            self.consensus.target_bucket_time_in_seconds,
            self.consensus.min_difficulty,
        )
    }

    /// The fee a block's miner's fee transaction must carry: the negated sum of the other
    /// transactions' fees plus the mining reward.
    pub fn expected_miners_fee(&self, block: &Block) -> i64 {
        let fees: i64 = block.transactions.iter().skip(1).map(Transaction::fee).sum();
        let reward = self.consensus.mining_reward(block.header.sequence) as i64;
        -(fees + reward)
    }
}
