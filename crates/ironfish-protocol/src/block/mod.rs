mod header;

pub use header::{BlockHeader, GRAFFITI_SIZE, TreeCommitment};

use crate::serde::{
    ByteReader,
    ByteWriter,
    Deserializable,
    DeserializationError,
    Serializable,
};
use crate::transaction::Transaction;

/// A block: a header plus its ordered transactions.
///
/// The first transaction is the miner's fee transaction; everything after it is a regular
/// user transaction. Transaction order is consensus-relevant because outputs are appended
/// to the note tree in block order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub header: BlockHeader,
    pub transactions: Vec<Transaction>,
}

impl Block {
    pub fn new(header: BlockHeader, transactions: Vec<Transaction>) -> Self {
        Self { header, transactions }
    }

    /// Returns the miner's fee transaction, if the block has any transactions at all.
    pub fn miners_fee(&self) -> Option<&Transaction> {
        self.transactions.first()
    }

    /// The total number of output notes across all transactions.
    pub fn output_count(&self) -> u64 {
        self.transactions.iter().map(|tx| tx.outputs().len() as u64).sum()
    }

    /// The total number of spends across all transactions.
    pub fn spend_count(&self) -> u64 {
        self.transactions.iter().map(|tx| tx.spends().len() as u64).sum()
    }
}

impl Serializable for Block {
    fn write_into<W: ByteWriter + ?Sized>(&self, target: &mut W) {
        self.header.write_into(target);
        self.transactions.write_into(target);
    }
}

impl Deserializable for Block {
    fn read_from<R: ByteReader + ?Sized>(source: &mut R) -> Result<Self, DeserializationError> {
        Ok(Self { header: source.read()?, transactions: source.read()? })
    }
}
