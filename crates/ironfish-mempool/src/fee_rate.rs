use ironfish_protocol::transaction::Transaction;
use ironfish_protocol::serde::Serializable;

/// A transaction's fee density: fee in ore per kilobyte of posted size.
///
/// Ordering a mempool by fee rate rather than absolute fee keeps small high-fee
/// transactions ahead of large ones paying the same total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FeeRate(u64);

impl FeeRate {
    pub const ZERO: Self = Self(0);

    /// Computes the rate for a posted transaction and its serialized size.
    ///
    /// Negative fees only occur on miner's fee transactions, which never enter the
    /// mempool; they clamp to zero defensively.
    pub fn compute(transaction: &Transaction, size_bytes: usize) -> Self {
        let fee = transaction.fee().max(0) as u64;
        let size = size_bytes.max(1) as u64;
        Self(fee.saturating_mul(1000) / size)
    }

    pub fn of(transaction: &Transaction) -> Self {
        Self::compute(transaction, transaction.serialized_size())
    }

    pub const fn as_ore_per_kb(&self) -> u64 {
        self.0
    }
}

// TESTS
// ================================================================================================

#[cfg(test)]
mod tests {
    use ironfish_protocol::transaction::TransactionVersion;

    use super::*;

    fn tx_with_fee(fee: i64) -> Transaction {
        Transaction::new(
            TransactionVersion::V2,
            vec![],
            vec![],
            vec![],
            vec![],
            fee,
            0,
            [0u8; 32],
            [0u8; 64],
        )
    }

    #[test]
    fn higher_fee_means_higher_rate_at_equal_size() {
        let cheap = tx_with_fee(10);
        let rich = tx_with_fee(10_000);
        assert!(FeeRate::of(&rich) > FeeRate::of(&cheap));
    }

    #[test]
    fn rate_scales_inversely_with_size() {
        let tx = tx_with_fee(1000);
        assert!(FeeRate::compute(&tx, 100) > FeeRate::compute(&tx, 10_000));
    }

    #[test]
    fn negative_fee_clamps_to_zero() {
        let tx = tx_with_fee(-5);
        assert_eq!(FeeRate::of(&tx), FeeRate::ZERO);
    }
}
