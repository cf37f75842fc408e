use std::sync::Arc;

use assert_matches::assert_matches;
use ironfish_chain::ValidationReason;
use ironfish_mempool::{MemPool, MemPoolConfig, MempoolAcceptError};
use ironfish_protocol::serde::Serializable;
use ironfish_testing::TestFixture;

fn pool(fx: &TestFixture) -> MemPool<ironfish_testing::TestCryptoProvider> {
    MemPool::new(fx.chain.clone(), MemPoolConfig::default())
}

#[tokio::test]
async fn empty_pool_admits_and_orders_by_fee_rate() {
    let fx = TestFixture::new().await;
    let pool = pool(&fx);

    let cheap = fx.spend_tx(b"a", 1, 10).await;
    let rich = fx.spend_tx(b"b", 2, 500).await;
    let middle = fx.spend_tx(b"c", 3, 100).await;

    pool.accept_transaction(cheap.clone()).await.unwrap();
    pool.accept_transaction(rich.clone()).await.unwrap();
    pool.accept_transaction(middle.clone()).await.unwrap();
    assert_eq!(pool.count().await, 3);

    let ordered = pool.iterate_by_priority().await;
    let fees: Vec<i64> = ordered.iter().map(|tx| tx.fee()).collect();
    assert_eq!(fees, vec![500, 100, 10]);
}

#[tokio::test]
async fn duplicate_submission_is_refused() {
    let fx = TestFixture::new().await;
    let pool = pool(&fx);
    let tx = fx.spend_tx(b"a", 1, 10).await;

    pool.accept_transaction(tx.clone()).await.unwrap();
    assert_matches!(
        pool.accept_transaction(tx).await.unwrap_err(),
        MempoolAcceptError::Duplicate
    );
}

#[tokio::test]
async fn double_spends_are_rejected_at_both_layers() {
    let fx = TestFixture::new().await;
    let pool = pool(&fx);

    // two transactions spending the same note
    let t1 = fx.spend_tx(b"alice", 7, 10).await;
    let t2 = fx.spend_tx(b"alice", 7, 20).await;
    assert_ne!(fx.chain.transaction_hash(&t1), fx.chain.transaction_hash(&t2));
    assert_eq!(t1.spends()[0].nullifier, t2.spends()[0].nullifier);

    pool.accept_transaction(t1.clone()).await.unwrap();

    // second spender collides with the pending index
    assert_matches!(
        pool.accept_transaction(t2.clone()).await.unwrap_err(),
        MempoolAcceptError::DoubleSpendMempool { nullifier } if nullifier == t2.spends()[0].nullifier
    );

    // mine t1; the conflict is now enforced by the nullifier tree instead
    let (block, _) = fx.mine_block(vec![t1]).await;
    pool.on_chain_connect(&block).await;

    assert_matches!(
        pool.accept_transaction(t2).await.unwrap_err(),
        MempoolAcceptError::Invalid(ValidationReason::DoubleSpend { .. })
    );
}

#[tokio::test]
async fn connect_removes_included_transactions() {
    let fx = TestFixture::new().await;
    let pool = pool(&fx);

    let tx = fx.spend_tx(b"a", 1, 10).await;
    let hash = pool.accept_transaction(tx.clone()).await.unwrap();

    let (block, _) = fx.mine_block(vec![tx]).await;
    pool.on_chain_connect(&block).await;

    assert!(!pool.contains(&hash).await);
    assert_eq!(pool.count().await, 0);
}

#[tokio::test]
async fn disconnected_transactions_return_to_the_pool() {
    let fx = TestFixture::new().await;
    let pool = pool(&fx);

    let tx = fx.spend_tx(b"alice", 4, 15).await;
    let tx_hash = fx.chain.transaction_hash(&tx);

    // mine it on the main chain
    let (block_m2, _) = fx.mine_block(vec![tx]).await;
    pool.on_chain_connect(&block_m2).await;
    assert_eq!(pool.count().await, 0);

    // a heavier empty branch reorganizes it away
    let genesis_hash = fx.chain.genesis_hash().await.unwrap();
    let f2 = fx.make_block_tagged(&genesis_hash, vec![], 1).await;
    let f2_hash = fx.chain.block_hash(&f2.header);
    let f3 = fx.make_block_tagged(&f2_hash, vec![], 1).await;
    fx.add(f2.clone()).await.unwrap();
    fx.add(f3.clone()).await.unwrap();

    // replay the reorg events in commit order
    pool.on_chain_disconnect(&block_m2).await.unwrap();
    pool.on_chain_connect(&f2).await;
    pool.on_chain_connect(&f3).await;

    assert!(pool.contains(&tx_hash).await);

    // and mining it on the new branch removes it again
    let pending = pool.iterate_by_priority().await;
    let (block_f4, _) = fx.mine_block(pending.iter().map(|tx| (**tx).clone()).collect()).await;
    pool.on_chain_connect(&block_f4).await;
    assert!(!pool.contains(&tx_hash).await);
}

#[tokio::test]
async fn eviction_drops_the_lowest_fee_rate_and_reports_it() {
    let fx = TestFixture::new().await;

    let cheap = fx.spend_tx(b"a", 1, 10).await;
    let rich = fx.spend_tx(b"b", 2, 5000).await;
    let tx_size = cheap.serialized_size();

    let pool = MemPool::new(
        fx.chain.clone(),
        MemPoolConfig { max_size_bytes: tx_size + 10, recently_evicted_capacity: 16 },
    );
    let mut evictions = pool.subscribe_evictions(8);

    let cheap_hash = pool.accept_transaction(cheap.clone()).await.unwrap();
    // admitting the richer transaction overflows the pool and evicts the cheap one
    let rich_hash = pool.accept_transaction(rich).await.unwrap();

    assert!(!pool.contains(&cheap_hash).await);
    assert!(pool.contains(&rich_hash).await);

    // the eviction event fires exactly once
    assert_eq!(evictions.recv().await, Some(cheap_hash));
    assert!(evictions.try_recv().is_err());

    // a resubmission of the evicted transaction is refused as underpriced
    assert_matches!(
        pool.accept_transaction(cheap).await.unwrap_err(),
        MempoolAcceptError::Underpriced
    );
}

#[tokio::test]
async fn new_transaction_below_the_floor_is_refused() {
    let fx = TestFixture::new().await;
    let rich = fx.spend_tx(b"a", 1, 5000).await;
    let cheap = fx.spend_tx(b"b", 2, 1).await;
    let tx_size = rich.serialized_size();

    let pool = MemPool::new(
        fx.chain.clone(),
        MemPoolConfig { max_size_bytes: tx_size + 10, recently_evicted_capacity: 16 },
    );

    pool.accept_transaction(rich.clone()).await.unwrap();
    assert_matches!(
        pool.accept_transaction(cheap).await.unwrap_err(),
        MempoolAcceptError::Underpriced
    );
    // the richer transaction survived
    assert!(pool.contains(&fx.chain.transaction_hash(&rich)).await);
}

#[tokio::test]
async fn expiration_boundaries() {
    let fx = TestFixture::new().await;
    let pool = pool(&fx);
    let head = fx.chain.head().await.unwrap();

    // expiration 0 never expires
    let eternal = fx.spend_tx_expiring(b"a", 1, 10, 0).await;
    let eternal_hash = pool.accept_transaction(eternal).await.unwrap();

    // expiration at the current head is refused outright
    let stale = fx.spend_tx_expiring(b"b", 2, 10, head.sequence().as_u32()).await;
    assert_matches!(
        pool.accept_transaction(stale).await.unwrap_err(),
        MempoolAcceptError::Expired(_)
    );

    // expiration at the next block is admitted now, pruned when that block connects
    let next = head.sequence().child().as_u32();
    let expiring = fx.spend_tx_expiring(b"c", 3, 10, next).await;
    let expiring_hash = pool.accept_transaction(expiring).await.unwrap();

    let (block, _) = fx.mine_block(vec![]).await;
    pool.on_chain_connect(&block).await;

    assert!(!pool.contains(&expiring_hash).await);
    assert!(pool.contains(&eternal_hash).await);
}

#[tokio::test]
async fn pending_effects_expose_nullifiers_and_transactions() {
    let fx = TestFixture::new().await;
    let pool = pool(&fx);

    let tx = fx.spend_tx(b"a", 1, 10).await;
    let nullifier = tx.spends()[0].nullifier;
    pool.accept_transaction(tx).await.unwrap();

    let effects = pool.pending_effects().await;
    assert_eq!(effects.transactions.len(), 1);
    assert!(effects.nullifiers.contains(&nullifier));
    let _: Vec<Arc<_>> = effects.transactions;
}
