//! End-to-end flow through the network seam: peers deliver blocks and transactions,
//! the node validates and applies them, and accepted objects are republished.

use ironfish_chain::{CancelToken, ChainEvent};
use ironfish_mempool::{MemPool, MemPoolConfig};
use ironfish_protocol::network::{NetworkEvent, PeerNetwork};
use ironfish_protocol::sequence::Sequence;
use ironfish_testing::{QueuePeerNetwork, TestFixture};

/// Drains the inbound queue, routing each event the way the node loop does.
async fn drive(
    network: &QueuePeerNetwork,
    fx: &TestFixture,
    pool: &MemPool<ironfish_testing::TestCryptoProvider>,
) {
    while let Some(event) = network.next_event() {
        match event {
            NetworkEvent::BlockReceived(block) => {
                let result = fx.chain.add_block((*block).clone()).await.unwrap();
                if result.is_added {
                    network.publish_block(&block);
                }
            },
            NetworkEvent::TransactionReceived(tx) | NetworkEvent::TransactionGossip(tx) => {
                if pool.accept_transaction((*tx).clone()).await.is_ok() {
                    network.publish_transaction(&tx);
                }
            },
            NetworkEvent::BlockGossip(_) => {
                // header-only announcements would trigger a fetch; nothing to do inline
            },
        }
    }
}

#[tokio::test]
async fn gossip_flows_through_verification_into_the_chain() {
    let fx = TestFixture::new().await;
    let pool = MemPool::new(fx.chain.clone(), MemPoolConfig::default());
    let network = QueuePeerNetwork::new();
    let mut events = fx.chain.subscribe(16);

    // a peer gossips a transaction, then a block including it arrives
    let tx = fx.spend_tx(b"peer", 1, 30).await;
    network.deliver(NetworkEvent::TransactionGossip(Box::new(tx.clone())));
    drive(&network, &fx, &pool).await;

    assert_eq!(pool.count().await, 1);
    assert_eq!(network.published_transactions().len(), 1);

    let block = fx.make_block(vec![tx]).await;
    network.deliver(NetworkEvent::BlockReceived(Box::new(block)));
    drive(&network, &fx, &pool).await;

    // the chain advanced and republished the block
    assert_eq!(fx.chain.head().await.unwrap().sequence(), Sequence::new(2));
    assert_eq!(network.published_blocks().len(), 1);

    // the post-commit event stream saw the connect, and the pool drops the inclusion
    match events.recv().await.unwrap() {
        ChainEvent::Connect { block, .. } => {
            pool.on_chain_connect(&block).await;
        },
        other => panic!("expected a connect event, got {other:?}"),
    }
    assert_eq!(pool.count().await, 0);
}

#[tokio::test]
async fn invalid_gossip_is_dropped_not_republished() {
    let fx = TestFixture::new().await;
    let pool = MemPool::new(fx.chain.clone(), MemPoolConfig::default());
    let network = QueuePeerNetwork::new();

    // a transaction with a tampered binding signature
    let tx = fx.spend_tx(b"peer", 1, 30).await;
    let mut bytes = {
        use ironfish_protocol::serde::Serializable;
        tx.to_bytes()
    };
    let len = bytes.len();
    bytes[len - 1] ^= 0xff;
    let tampered = {
        use ironfish_protocol::serde::Deserializable;
        ironfish_protocol::transaction::Transaction::read_from_bytes(&bytes).unwrap()
    };

    network.deliver(NetworkEvent::TransactionReceived(Box::new(tampered)));
    drive(&network, &fx, &pool).await;

    assert_eq!(pool.count().await, 0);
    assert!(network.published_transactions().is_empty());
}

#[tokio::test]
async fn wallet_scan_observes_cancellation() {
    let fx = TestFixture::new().await;
    let wallet = ironfish_wallet::Wallet::new(
        ironfish_storage::Database::default(),
        fx.chain.clone(),
        1,
    );
    wallet.create_account("alice").await.unwrap();
    for _ in 0..5 {
        fx.mine_block(vec![]).await;
    }

    // a pre-cancelled token stops before any block is applied
    let token = CancelToken::new();
    token.cancel();
    wallet.scan_with_cancel(&token).await.unwrap();
    assert!(wallet.scan_head("alice").await.unwrap().is_none());

    // a live token scans to the head
    wallet.scan().await.unwrap();
    let head = fx.chain.head().await.unwrap();
    assert_eq!(wallet.scan_head("alice").await.unwrap().unwrap().hash, head.hash);
}
