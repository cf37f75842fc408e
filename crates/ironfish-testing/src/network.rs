use std::collections::VecDeque;
use std::sync::Mutex;

use ironfish_protocol::block::Block;
use ironfish_protocol::network::{NetworkEvent, PeerNetwork};
use ironfish_protocol::transaction::Transaction;

/// An in-process [`PeerNetwork`]: inbound events come from a queue the test fills,
/// published objects land in inspectable buffers.
#[derive(Default)]
pub struct QueuePeerNetwork {
    inbound: Mutex<VecDeque<NetworkEvent>>,
    published_blocks: Mutex<Vec<Block>>,
    published_transactions: Mutex<Vec<Transaction>>,
}

impl QueuePeerNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues an event as if a peer had delivered it.
    pub fn deliver(&self, event: NetworkEvent) {
        self.inbound.lock().expect("network lock poisoned").push_back(event);
    }

    pub fn published_blocks(&self) -> Vec<Block> {
        self.published_blocks.lock().expect("network lock poisoned").clone()
    }

    pub fn published_transactions(&self) -> Vec<Transaction> {
        self.published_transactions.lock().expect("network lock poisoned").clone()
    }
}

impl PeerNetwork for QueuePeerNetwork {
    fn publish_block(&self, block: &Block) {
        self.published_blocks.lock().expect("network lock poisoned").push(block.clone());
    }

    fn publish_transaction(&self, transaction: &Transaction) {
        self.published_transactions
            .lock()
            .expect("network lock poisoned")
            .push(transaction.clone());
    }

    fn next_event(&self) -> Option<NetworkEvent> {
        self.inbound.lock().expect("network lock poisoned").pop_front()
    }
}
