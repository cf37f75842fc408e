use assert_matches::assert_matches;
use ironfish_chain::{AddBlockReason, ValidationReason};
use ironfish_protocol::CryptoProvider;
use ironfish_testing::TestFixture;

#[tokio::test]
async fn first_mint_creates_the_asset_record() {
    let fx = TestFixture::new().await;
    let mint = fx.mint_tx(b"creator", "gold", 1_000, None).await;
    let asset_id = fx.asset_id_for(b"creator", "gold");
    let mint_hash = fx.chain.transaction_hash(&mint);

    fx.mine_block(vec![mint]).await;

    let record = fx.chain.asset(&asset_id).await.unwrap().unwrap();
    assert_eq!(record.supply, 1_000);
    assert_eq!(record.created_tx_hash, mint_hash);
    assert_eq!(record.owner, record.creator);
}

#[tokio::test]
async fn later_mints_and_burns_move_the_supply() {
    let fx = TestFixture::new().await;
    let asset_id = fx.asset_id_for(b"creator", "gold");

    let mint = fx.mint_tx(b"creator", "gold", 1_000, None).await;
    fx.mine_block(vec![mint]).await;

    let mint_more = fx.mint_tx(b"creator", "gold", 500, None).await;
    let burn = fx.burn_tx(b"creator", asset_id, 300).await;
    fx.mine_block(vec![mint_more, burn]).await;

    let record = fx.chain.asset(&asset_id).await.unwrap().unwrap();
    assert_eq!(record.supply, 1_200);
}

/// Posts a mint of the asset described by `creator`, signed by `signer`.
async fn mint_as(
    fx: &TestFixture,
    signer_seed: &[u8],
    creator_seed: &[u8],
    name: &str,
    value: u64,
) -> ironfish_protocol::transaction::Transaction {
    use ironfish_protocol::asset::{AssetMetadata, AssetName};
    use ironfish_protocol::provider::{RawMint, RawTransaction};
    use ironfish_protocol::transaction::TransactionVersion;

    let signer = fx.provider.derive_account(signer_seed);
    let creator = fx.provider.derive_account(creator_seed);
    let raw = RawTransaction {
        version: TransactionVersion::V2,
        spends: vec![],
        outputs: vec![],
        mints: vec![RawMint {
            creator: creator.public_address,
            name: AssetName::from_str_lossy(name),
            metadata: AssetMetadata::empty(),
            nonce: 0,
            value,
            transfer_ownership_to: None,
        }],
        burns: vec![],
        fee: 0,
        expiration: 0,
    };
    fx.provider.post(&raw, &signer.spending_key.expect("signer can sign")).unwrap()
}

#[tokio::test]
async fn only_the_owner_may_mint() {
    let fx = TestFixture::new().await;
    let mint = fx.mint_tx(b"creator", "gold", 1_000, None).await;
    fx.mine_block(vec![mint]).await;

    // another key minting against the creator's asset description is refused on connect
    let forged = mint_as(&fx, b"thief", b"creator", "gold", 1_000).await;
    let block = fx.make_block(vec![forged]).await;
    let result = fx.add(block).await.unwrap();
    assert_matches!(
        result.reason,
        Some(AddBlockReason::Invalid(ValidationReason::InvalidMint))
    );

    let asset_id = fx.asset_id_for(b"creator", "gold");
    assert_eq!(fx.chain.asset(&asset_id).await.unwrap().unwrap().supply, 1_000);
}

#[tokio::test]
async fn burns_cannot_exceed_supply_or_touch_the_native_asset() {
    let fx = TestFixture::new().await;
    let asset_id = fx.asset_id_for(b"creator", "gold");

    let mint = fx.mint_tx(b"creator", "gold", 100, None).await;
    fx.mine_block(vec![mint]).await;

    // over-burn is rejected during connect
    let over_burn = fx.burn_tx(b"creator", asset_id, 101).await;
    let block = fx.make_block(vec![over_burn]).await;
    let result = fx.add(block).await.unwrap();
    assert_matches!(
        result.reason,
        Some(AddBlockReason::Invalid(ValidationReason::InvalidBurn))
    );

    // the native asset cannot be burned at all
    let native_burn =
        fx.burn_tx(b"creator", ironfish_protocol::asset::AssetId::NATIVE, 1).await;
    let block = fx.make_block(vec![native_burn]).await;
    let result = fx.add(block).await.unwrap();
    assert_matches!(
        result.reason,
        Some(AddBlockReason::Invalid(ValidationReason::InvalidBurn))
    );
}

#[tokio::test]
async fn ownership_transfers_on_a_v2_mint() {
    let fx = TestFixture::new().await;
    let asset_id = fx.asset_id_for(b"creator", "gold");
    let heir = fx.provider.derive_account(b"heir").public_address;

    let mint = fx.mint_tx(b"creator", "gold", 100, Some(heir)).await;
    fx.mine_block(vec![mint]).await;

    let record = fx.chain.asset(&asset_id).await.unwrap().unwrap();
    assert_eq!(record.owner, heir);
    assert_ne!(record.owner, record.creator);

    // from here the heir mints the creator's asset description
    let heir_mint = mint_as(&fx, b"heir", b"creator", "gold", 50).await;
    fx.mine_block(vec![heir_mint]).await;
    assert_eq!(fx.chain.asset(&asset_id).await.unwrap().unwrap().supply, 150);

    // and the original creator no longer can
    let stale_mint = mint_as(&fx, b"creator", b"creator", "gold", 50).await;
    let block = fx.make_block(vec![stale_mint]).await;
    let result = fx.add(block).await.unwrap();
    assert_matches!(
        result.reason,
        Some(AddBlockReason::Invalid(ValidationReason::InvalidMint))
    );
}

#[tokio::test]
async fn disconnecting_a_block_reverses_asset_effects() {
    let fx = TestFixture::new().await;
    let asset_id = fx.asset_id_for(b"creator", "gold");
    let genesis_hash = fx.chain.genesis_hash().await.unwrap();

    // the mint lands in block 2 of the main branch
    let mint = fx.mint_tx(b"creator", "gold", 777, None).await;
    fx.mine_block(vec![mint]).await;
    assert_eq!(fx.chain.asset(&asset_id).await.unwrap().unwrap().supply, 777);

    // a heavier empty branch reorganizes the mint away; the record is deleted, not zeroed
    let f2 = fx.make_block_tagged(&genesis_hash, vec![], 1).await;
    let f2_hash = fx.chain.block_hash(&f2.header);
    let f3 = fx.make_block_tagged(&f2_hash, vec![], 1).await;
    fx.add(f2).await.unwrap();
    fx.add(f3).await.unwrap();

    assert_eq!(fx.chain.asset(&asset_id).await.unwrap(), None);
}
