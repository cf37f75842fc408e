use std::sync::Arc;

use ironfish_protocol::block::Block;
use ironfish_protocol::hash::BlockHash;
use tokio::sync::mpsc;
use tracing::debug;

/// A state transition of the canonical chain, emitted after its write committed.
///
/// Events are delivered in commit order: a block's disconnect and connect are never
/// interleaved, and every subscriber observes the same order.
#[derive(Debug, Clone)]
pub enum ChainEvent {
    /// The block joined the canonical chain.
    Connect { hash: BlockHash, block: Arc<Block> },
    /// The block left the canonical chain during a reorganization.
    Disconnect { hash: BlockHash, block: Arc<Block> },
    /// The block attached to a side branch without changing the head.
    Fork { hash: BlockHash, block: Arc<Block> },
}

impl ChainEvent {
    pub fn hash(&self) -> &BlockHash {
        match self {
            Self::Connect { hash, .. } | Self::Disconnect { hash, .. } | Self::Fork { hash, .. } => {
                hash
            },
        }
    }
}

// EVENT HUB
// ================================================================================================

/// Fan-out of chain events over one bounded channel per subscriber.
///
/// Emission applies back-pressure: a slow subscriber slows the producer down rather than
/// growing an unbounded queue. Subscribers that dropped their receiver are pruned on the
/// next emission.
pub struct EventHub {
    subscribers: std::sync::Mutex<Vec<mpsc::Sender<ChainEvent>>>,
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}

impl EventHub {
    pub fn new() -> Self {
        Self { subscribers: std::sync::Mutex::new(Vec::new()) }
    }

    /// Registers a subscriber with the given queue capacity.
    pub fn subscribe(&self, capacity: usize) -> mpsc::Receiver<ChainEvent> {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        self.subscribers.lock().expect("event lock poisoned").push(sender);
        receiver
    }

    /// Delivers the event to every live subscriber, awaiting queue space where needed.
    pub async fn emit(&self, event: ChainEvent) {
        let senders: Vec<_> =
            self.subscribers.lock().expect("event lock poisoned").clone();

        let mut closed = false;
        for sender in &senders {
            if sender.send(event.clone()).await.is_err() {
                closed = true;
            }
        }

        if closed {
            let mut subscribers = self.subscribers.lock().expect("event lock poisoned");
            subscribers.retain(|sender| !sender.is_closed());
            debug!(target: "ironfish::chain", remaining = subscribers.len(), "pruned closed event subscribers");
        }
    }
}
