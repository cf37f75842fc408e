use crate::block::{Block, BlockHeader};
use crate::transaction::Transaction;

/// An inbound event surfaced by the peer-to-peer layer.
#[derive(Debug, Clone)]
pub enum NetworkEvent {
    /// A peer sent a full block, solicited or not.
    BlockReceived(Box<Block>),
    /// A peer sent a full transaction.
    TransactionReceived(Box<Transaction>),
    /// A peer announced a block by header only.
    BlockGossip(Box<BlockHeader>),
    /// A peer announced a transaction it holds.
    TransactionGossip(Box<Transaction>),
}

/// The seam to the peer-to-peer transport.
///
/// Discovery, framing and gossip routing live behind this trait; the node core only
/// publishes what it accepted and drains what peers delivered.
pub trait PeerNetwork: Send + Sync {
    /// Broadcasts a newly-connected block to peers.
    fn publish_block(&self, block: &Block);

    /// Broadcasts a newly-admitted transaction to peers.
    fn publish_transaction(&self, transaction: &Transaction);

    /// Drains the next inbound event, if one is queued.
    fn next_event(&self) -> Option<NetworkEvent>;
}
