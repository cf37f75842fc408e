use std::sync::Arc;

use assert_matches::assert_matches;
use ironfish_protocol::provider::CryptoProvider;
use ironfish_storage::{Database, MigrationContext, StorageError};
use ironfish_testing::TestCryptoProvider;
use ironfish_wallet::account::Account;
use ironfish_wallet::migrations::{migration_001, migrator};

fn legacy_account(provider: &TestCryptoProvider, id: u32, name: &str) -> Account {
    Account {
        id,
        name: name.to_string(),
        keys: provider.derive_account(name.as_bytes()),
        multisig_keys: None,
        scanning_enabled: true,
    }
}

/// Seeds a database shaped like the pre-envelope wallet layout.
async fn legacy_database(provider: &TestCryptoProvider) -> Database {
    let db = Database::default();
    db.with_write::<_, StorageError>(|tx| {
        migration_001::OLD_ACCOUNTS.put(tx, &0, &legacy_account(provider, 0, "alice"))?;
        migration_001::OLD_ACCOUNTS.put(tx, &1, &legacy_account(provider, 1, "bob"))?;
        Ok(())
    })
    .await
    .unwrap();
    db
}

#[tokio::test]
async fn open_migrates_to_the_latest_version() {
    let provider = Arc::new(TestCryptoProvider::new());
    let db = legacy_database(&provider).await;
    let migrator = migrator(provider.clone());

    assert_eq!(migrator.current_version(&db).await.unwrap(), 0);
    migrator.open(&db, &MigrationContext::default()).await.unwrap();
    assert_eq!(migrator.current_version(&db).await.unwrap(), migrator.latest_version());

    // records now decode under the new envelope layout
    let tx = db.begin(ironfish_storage::TransactionMode::Read).await;
    let accounts = migration_001::NEW_ACCOUNTS.iter(&tx).unwrap();
    assert_eq!(accounts.len(), 2);

    // re-opening at the same version is a no-op
    drop(tx);
    migrator.open(&db, &MigrationContext::default()).await.unwrap();
}

#[tokio::test]
async fn forward_then_backward_is_identity() {
    let provider = Arc::new(TestCryptoProvider::new());
    let db = legacy_database(&provider).await;
    let before = db.backend().dump();

    let migrator = migrator(provider.clone());
    migrator.open(&db, &MigrationContext::default()).await.unwrap();
    let migrated = db.backend().dump();
    assert_ne!(before, migrated);

    migrator.revert_to(&db, &MigrationContext::default(), 0).await.unwrap();
    assert_eq!(db.backend().dump(), before);

    // and forward again lands on the same bytes
    migrator.open(&db, &MigrationContext::default()).await.unwrap();
    assert_eq!(db.backend().dump(), migrated);
}

#[tokio::test]
async fn newer_databases_refuse_to_open() {
    let provider = Arc::new(TestCryptoProvider::new());
    let db = legacy_database(&provider).await;
    let migrator = migrator(provider.clone());
    migrator.open(&db, &MigrationContext::default()).await.unwrap();

    let older_build = ironfish_storage::Migrator::new(ironfish_storage::DatabaseKind::Wallet, vec![]);
    assert_matches!(
        older_build.open(&db, &MigrationContext::default()).await.unwrap_err(),
        StorageError::SchemaTooNew { found: 1, supported: 0 }
    );
}
