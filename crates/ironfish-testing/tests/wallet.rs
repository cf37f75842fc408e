use std::collections::HashSet;
use std::sync::Arc;

use assert_matches::assert_matches;
use ironfish_protocol::asset::AssetId;
use ironfish_protocol::note::Memo;
use ironfish_protocol::provider::CryptoProvider;
use ironfish_storage::Database;
use ironfish_testing::TestFixture;
use ironfish_wallet::{OutputRequest, Wallet, WalletError};

async fn wallet(fx: &TestFixture, confirmations: u32) -> Wallet<ironfish_testing::TestCryptoProvider> {
    Wallet::new(Database::default(), fx.chain.clone(), confirmations)
}

#[tokio::test]
async fn scanner_decrypts_incoming_notes() {
    let fx = TestFixture::new().await;
    let wallet = wallet(&fx, 1).await;
    let alice = wallet.create_account("alice").await.unwrap();

    let payment = 12_000u64;
    let tx = fx.pay_tx(b"payer", 1, 10, alice.keys.public_address, payment, 0).await;
    fx.mine_block(vec![tx]).await;

    wallet.scan().await.unwrap();

    let notes = wallet.unspent_notes("alice").await.unwrap();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].note.value, payment);
    assert_eq!(notes[0].note.owner, alice.keys.public_address);

    let balance = wallet.balance("alice", &AssetId::NATIVE, &[]).await.unwrap();
    assert_eq!(balance.confirmed, payment as u128);
    assert_eq!(balance.available, payment as u128);

    // the scan head tracks the chain head
    let head = fx.chain.head().await.unwrap();
    assert_eq!(wallet.scan_head("alice").await.unwrap().unwrap().hash, head.hash);
}

#[tokio::test]
async fn confirmations_gate_the_confirmed_balance() {
    let fx = TestFixture::new().await;
    let wallet = wallet(&fx, 3).await;
    let alice = wallet.create_account("alice").await.unwrap();

    let tx = fx.pay_tx(b"payer", 1, 10, alice.keys.public_address, 5_000, 0).await;
    fx.mine_block(vec![tx]).await;
    wallet.scan().await.unwrap();

    // depth 1 of 3 required
    let balance = wallet.balance("alice", &AssetId::NATIVE, &[]).await.unwrap();
    assert_eq!(balance.confirmed, 0);

    fx.mine_block(vec![]).await;
    fx.mine_block(vec![]).await;
    wallet.scan().await.unwrap();

    let balance = wallet.balance("alice", &AssetId::NATIVE, &[]).await.unwrap();
    assert_eq!(balance.confirmed, 5_000);
}

#[tokio::test]
async fn confirmed_balance_matches_unspent_note_sum() {
    let fx = TestFixture::new().await;
    let wallet = wallet(&fx, 1).await;
    let alice = wallet.create_account("alice").await.unwrap();

    for tag in 0..4u64 {
        let tx = fx
            .pay_tx(b"payer", tag, 10, alice.keys.public_address, 1_000 + tag, 0)
            .await;
        fx.mine_block(vec![tx]).await;
    }
    wallet.scan().await.unwrap();

    let notes = wallet.unspent_notes("alice").await.unwrap();
    let sum: u128 = notes.iter().map(|record| record.note.value as u128).sum();
    let balance = wallet.balance("alice", &AssetId::NATIVE, &[]).await.unwrap();
    assert_eq!(balance.confirmed, sum);

    // the maintained aggregate tracks the same total
    assert_eq!(wallet.unspent_total("alice", &AssetId::NATIVE).await.unwrap(), sum);
}

#[tokio::test]
async fn transaction_history_is_indexed_by_sequence_and_time() {
    let fx = TestFixture::new().await;
    let wallet = wallet(&fx, 1).await;
    let alice = wallet.create_account("alice").await.unwrap();

    // three payments across blocks 2, 3 and 4
    for tag in 0..3u64 {
        let tx = fx.pay_tx(b"payer", tag, 10, alice.keys.public_address, 2_000, 0).await;
        fx.mine_block(vec![tx]).await;
    }
    wallet.scan().await.unwrap();

    let in_range = wallet
        .transactions_in_sequence_range(
            "alice",
            ironfish_protocol::sequence::Sequence::new(3),
            ironfish_protocol::sequence::Sequence::new(4),
        )
        .await
        .unwrap();
    assert_eq!(in_range.len(), 2);
    assert!(in_range[0].sequence < in_range[1].sequence);

    let recent = wallet.recent_transactions("alice", 2).await.unwrap();
    assert_eq!(recent.len(), 2);
    // newest first
    assert!(recent[0].timestamp_ms >= recent[1].timestamp_ms);
    assert_eq!(recent[0].sequence, ironfish_protocol::sequence::Sequence::new(4));
}

#[tokio::test]
async fn wallet_rewinds_across_a_reorg() {
    let fx = TestFixture::new().await;
    let wallet = wallet(&fx, 1).await;
    let alice = wallet.create_account("alice").await.unwrap();

    let payment = 9_000u64;
    let tx = fx.pay_tx(b"payer", 1, 10, alice.keys.public_address, payment, 0).await;
    fx.mine_block(vec![tx]).await;
    wallet.scan().await.unwrap();
    assert_eq!(
        wallet.balance("alice", &AssetId::NATIVE, &[]).await.unwrap().confirmed,
        payment as u128
    );

    // a heavier branch without alice's payment replaces the block
    let genesis_hash = fx.chain.genesis_hash().await.unwrap();
    let f2 = fx.make_block_tagged(&genesis_hash, vec![], 1).await;
    let f2_hash = fx.chain.block_hash(&f2.header);
    let f3 = fx.make_block_tagged(&f2_hash, vec![], 1).await;
    fx.add(f2).await.unwrap();
    fx.add(f3).await.unwrap();

    wallet.scan().await.unwrap();

    // the note is gone and so is the balance
    assert!(wallet.unspent_notes("alice").await.unwrap().is_empty());
    assert_eq!(wallet.balance("alice", &AssetId::NATIVE, &[]).await.unwrap().confirmed, 0);

    // the scan head followed the reorg onto the new branch
    let head = fx.chain.head().await.unwrap();
    assert_eq!(wallet.scan_head("alice").await.unwrap().unwrap().hash, head.hash);
}

#[tokio::test]
async fn spend_round_trip_between_accounts() {
    let fx = TestFixture::new().await;
    let wallet = wallet(&fx, 1).await;
    let alice = wallet.create_account("alice").await.unwrap();
    let bob = wallet.create_account("bob").await.unwrap();

    // fund alice
    let funding = 20_000u64;
    let tx = fx.pay_tx(b"payer", 1, 10, alice.keys.public_address, funding, 0).await;
    fx.mine_block(vec![tx]).await;
    wallet.scan().await.unwrap();

    // alice pays bob
    let raw = wallet
        .create_raw_transaction(
            "alice",
            vec![OutputRequest {
                address: bob.keys.public_address,
                value: 6_000,
                memo: Memo::from_str_lossy("for bob"),
                asset_id: AssetId::NATIVE,
            }],
            vec![],
            vec![],
            25,
            0,
            &HashSet::new(),
        )
        .await
        .unwrap();
    assert_eq!(raw.fee, 25);
    assert_eq!(raw.spends.len(), 1);

    let posted = wallet.post_transaction("alice", &raw).await.unwrap();
    fx.mine_block(vec![posted]).await;
    wallet.scan().await.unwrap();

    let bob_balance = wallet.balance("bob", &AssetId::NATIVE, &[]).await.unwrap();
    assert_eq!(bob_balance.confirmed, 6_000);

    // alice keeps the change: funding - payment - fee
    let alice_balance = wallet.balance("alice", &AssetId::NATIVE, &[]).await.unwrap();
    assert_eq!(alice_balance.confirmed, (funding - 6_000 - 25) as u128);
}

#[tokio::test]
async fn pending_mempool_effects_shape_the_balance() {
    let fx = TestFixture::new().await;
    let wallet = wallet(&fx, 1).await;
    let alice = wallet.create_account("alice").await.unwrap();

    let funding = 10_000u64;
    let tx = fx.pay_tx(b"payer", 1, 10, alice.keys.public_address, funding, 0).await;
    fx.mine_block(vec![tx]).await;
    wallet.scan().await.unwrap();

    // a pending transaction spends alice's note and pays her part back as change
    let raw = wallet
        .create_raw_transaction(
            "alice",
            vec![OutputRequest {
                address: fx.provider.derive_account(b"other").public_address,
                value: 4_000,
                memo: Memo::default(),
                asset_id: AssetId::NATIVE,
            }],
            vec![],
            vec![],
            50,
            0,
            &HashSet::new(),
        )
        .await
        .unwrap();
    let posted = Arc::new(wallet.post_transaction("alice", &raw).await.unwrap());
    let pending = vec![posted];

    let balance = wallet.balance("alice", &AssetId::NATIVE, &pending).await.unwrap();
    assert_eq!(balance.confirmed, funding as u128);
    // the whole note is committed by the pending spend
    assert_eq!(balance.available, 0);
    // change comes back: -funding spent, +change received
    let change = (funding - 4_000 - 50) as i128;
    assert_eq!(balance.pending, change - funding as i128);
    assert_eq!(balance.unconfirmed, change);
}

#[tokio::test]
async fn insufficient_balance_is_typed() {
    let fx = TestFixture::new().await;
    let wallet = wallet(&fx, 1).await;
    let _ = wallet.create_account("alice").await.unwrap();

    let result = wallet
        .create_raw_transaction(
            "alice",
            vec![OutputRequest {
                address: fx.provider.derive_account(b"other").public_address,
                value: 1,
                memo: Memo::default(),
                asset_id: AssetId::NATIVE,
            }],
            vec![],
            vec![],
            0,
            0,
            &HashSet::new(),
        )
        .await;
    assert_matches!(result.unwrap_err(), WalletError::InsufficientBalance { .. });
}

#[tokio::test]
async fn view_only_accounts_cannot_post() {
    let fx = TestFixture::new().await;
    let wallet = wallet(&fx, 1).await;

    let mut keys = fx.provider.derive_account(b"watcher");
    keys.spending_key = None;
    wallet.import_account("watcher", keys).await.unwrap();

    let raw = ironfish_protocol::provider::RawTransaction {
        version: ironfish_protocol::transaction::TransactionVersion::V2,
        spends: vec![],
        outputs: vec![],
        mints: vec![],
        burns: vec![],
        fee: 0,
        expiration: 0,
    };
    assert_matches!(
        wallet.post_transaction("watcher", &raw).await.unwrap_err(),
        WalletError::SpendingKeyMissing(_)
    );
}

#[tokio::test]
async fn passphrase_locks_and_unlocks_the_wallet() {
    let fx = TestFixture::new().await;
    let wallet = wallet(&fx, 1).await;
    wallet.create_account("alice").await.unwrap();

    wallet.set_passphrase("hunter2").await.unwrap();
    assert!(wallet.is_passphrase_protected().await.unwrap());

    // still readable while unlocked
    assert_eq!(wallet.accounts().await.unwrap().len(), 1);

    wallet.lock().await;
    assert_matches!(wallet.accounts().await.unwrap_err(), WalletError::AccountLocked);
    assert_matches!(
        wallet.create_account("bob").await.unwrap_err(),
        WalletError::AccountLocked
    );

    // a wrong passphrase is refused without unlocking anything
    assert!(wallet.unlock("wrong").await.is_err());
    assert_matches!(wallet.accounts().await.unwrap_err(), WalletError::AccountLocked);

    wallet.unlock("hunter2").await.unwrap();
    let accounts = wallet.accounts().await.unwrap();
    assert_eq!(accounts[0].name, "alice");
}

#[tokio::test]
async fn duplicate_account_names_are_refused() {
    let fx = TestFixture::new().await;
    let wallet = wallet(&fx, 1).await;
    wallet.create_account("alice").await.unwrap();
    assert_matches!(
        wallet.create_account("alice").await.unwrap_err(),
        WalletError::DuplicateAccountName(_)
    );
}
