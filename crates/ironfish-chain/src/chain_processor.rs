use std::sync::Arc;

use ironfish_protocol::hash::BlockHash;
use ironfish_protocol::provider::CryptoProvider;
use ironfish_protocol::sequence::Sequence;
use ironfish_protocol::serde::{
    ByteReader,
    ByteWriter,
    Deserializable,
    DeserializationError,
    Serializable,
};
use ironfish_storage::{StorageBackend, TransactionMode};
use tracing::debug;

use crate::blockchain::Blockchain;
use crate::errors::ChainError;
use crate::events::ChainEvent;

// CURSOR
// ================================================================================================

/// A subscriber's durable position on the canonical chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainCursor {
    pub hash: BlockHash,
    pub sequence: Sequence,
}

impl Serializable for ChainCursor {
    fn write_into<W: ByteWriter + ?Sized>(&self, target: &mut W) {
        self.hash.write_into(target);
        self.sequence.write_into(target);
    }
}

impl Deserializable for ChainCursor {
    fn read_from<R: ByteReader + ?Sized>(source: &mut R) -> Result<Self, DeserializationError> {
        Ok(Self { hash: source.read()?, sequence: source.read()? })
    }
}

// CHAIN PROCESSOR
// ================================================================================================

/// Replays canonical-chain changes to a subscriber as an ordered stream.
///
/// Given the subscriber's cursor, the processor walks from the cursor down to the fork
/// point emitting disconnects, then up to the current head emitting connects. Every event
/// is paired with the cursor value that holds after applying it; the subscriber persists
/// that cursor in the same write transaction as its own effects, so a crash replays from
/// a consistent position.
///
/// The whole walk runs inside one read snapshot, so a concurrent head change produces a
/// coherent (if slightly stale) stream; the next call catches up.
pub struct ChainProcessor<'c, P: CryptoProvider, B: StorageBackend> {
    chain: &'c Blockchain<P, B>,
}

impl<'c, P: CryptoProvider, B: StorageBackend> ChainProcessor<'c, P, B> {
    pub fn new(chain: &'c Blockchain<P, B>) -> Self {
        Self { chain }
    }

    /// Computes the ordered events between `cursor` and the current head, each paired with
    /// the cursor to persist after handling it. A `None` cursor replays from genesis.
    pub async fn events_since(
        &self,
        cursor: Option<&ChainCursor>,
    ) -> Result<Vec<(ChainEvent, ChainCursor)>, ChainError> {
        let tx = self.chain.db().begin(TransactionMode::Read).await;
        let head = self.chain.head_in_tx(&tx)?;
        let mut events = Vec::new();

        // walk the cursor back to the canonical chain, disconnecting as we go
        let mut position = cursor.copied();
        while let Some(cur) = position {
            let canonical = self.chain.main_chain_hash_in(&tx, cur.sequence)?;
            if canonical == Some(cur.hash) {
                break;
            }
            let block = self
                .chain
                .block_in_tx(&tx, &cur.hash)?
                .ok_or(ChainError::BlockNotFound(cur.hash))?;
            let parent = ChainCursor {
                hash: block.header.previous_block_hash,
                sequence: cur.sequence.parent().unwrap_or(Sequence::GENESIS),
            };
            events.push((
                ChainEvent::Disconnect { hash: cur.hash, block: Arc::new(block) },
                parent,
            ));
            position = Some(parent);
        }

        // then forward along the canonical chain to the head
        let mut next = match position {
            Some(cur) => cur.sequence.child(),
            None => Sequence::GENESIS,
        };
        while next <= head.sequence() {
            let Some(hash) = self.chain.main_chain_hash_in(&tx, next)? else {
                break;
            };
            let block =
                self.chain.block_in_tx(&tx, &hash)?.ok_or(ChainError::BlockNotFound(hash))?;
            events.push((
                ChainEvent::Connect { hash, block: Arc::new(block) },
                ChainCursor { hash, sequence: next },
            ));
            next = next.child();
        }

        if !events.is_empty() {
            debug!(target: "ironfish::chain", count = events.len(), "replaying chain events");
        }
        Ok(events)
    }
}
