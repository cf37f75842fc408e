use tracing::{debug, info};

use crate::backend::StorageBackend;
use crate::database::{Database, DbTransaction};
use crate::errors::StorageError;
use crate::store::Store;

/// The logical database a migration targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseKind {
    Chain,
    Wallet,
}

/// Call-scoped inputs to a migration run.
///
/// Encrypted-wallet migrations need the unlock passphrase to re-encrypt each record; it is
/// passed through here and never written anywhere.
#[derive(Debug, Clone, Copy, Default)]
pub struct MigrationContext<'a> {
    pub passphrase: Option<&'a str>,
}

/// One numbered, reversible schema change.
///
/// `forward` brings a database at version `number() - 1` to `number()`; `backward` undoes
/// exactly that. Both run inside a transaction the migrator commits only on success, so a
/// failed migration leaves the database untouched.
pub trait Migration<B: StorageBackend>: Send + Sync {
    fn number(&self) -> u32;

    fn database(&self) -> DatabaseKind;

    fn forward(
        &self,
        ctx: &MigrationContext<'_>,
        tx: &mut DbTransaction<'_, B>,
    ) -> Result<(), StorageError>;

    fn backward(
        &self,
        ctx: &MigrationContext<'_>,
        tx: &mut DbTransaction<'_, B>,
    ) -> Result<(), StorageError>;
}

/// The store recording the applied schema version. Store id 0 is reserved for it in every
/// database.
const VERSION_STORE: Store<(), u32> = Store::new(0);

// MIGRATOR
// ================================================================================================

/// Applies pending migrations in order when a database is opened.
pub struct Migrator<B: StorageBackend> {
    kind: DatabaseKind,
    migrations: Vec<Box<dyn Migration<B>>>,
}

impl<B: StorageBackend> Migrator<B> {
    /// Builds a migrator from the registry of migrations for one database.
    ///
    /// # Panics
    ///
    /// Panics if the migrations are not strictly ascending contiguous numbers starting at
    /// 1, or if any targets a different database. The registry is static; a malformed one
    /// is a programming error, not a runtime condition.
    pub fn new(kind: DatabaseKind, migrations: Vec<Box<dyn Migration<B>>>) -> Self {
        for (index, migration) in migrations.iter().enumerate() {
            assert_eq!(
                migration.number(),
                index as u32 + 1,
                "migration numbers must be contiguous from 1"
            );
            assert_eq!(migration.database(), kind, "migration targets the wrong database");
        }
        Self { kind, migrations }
    }

    /// The newest schema version this build understands.
    pub fn latest_version(&self) -> u32 {
        self.migrations.len() as u32
    }

    /// Reads the version currently recorded in the database.
    pub async fn current_version(&self, db: &Database<B>) -> Result<u32, StorageError> {
        db.with_read(|tx| Ok(VERSION_STORE.get(tx, &())?.unwrap_or(0))).await
    }

    /// Runs every pending migration, in order, each inside its own transaction.
    ///
    /// Refuses to open a database written by a newer build. On any failure the offending
    /// migration's transaction is rolled back and the database is left at the last version
    /// that fully applied.
    pub async fn open(
        &self,
        db: &Database<B>,
        ctx: &MigrationContext<'_>,
    ) -> Result<(), StorageError> {
        let current = self.current_version(db).await?;
        let latest = self.latest_version();

        if current > latest {
            return Err(StorageError::SchemaTooNew { found: current, supported: latest });
        }
        if current == latest {
            debug!(target: "ironfish::storage", kind = ?self.kind, version = current, "schema up to date");
            return Ok(());
        }

        for migration in &self.migrations[current as usize..] {
            let number = migration.number();
            info!(target: "ironfish::storage", kind = ?self.kind, number, "running migration");
            db.with_write(|tx| {
                migration.forward(ctx, tx).map_err(|source| StorageError::MigrationFailed {
                    number,
                    source: Box::new(source),
                })?;
                VERSION_STORE.put(tx, &(), &number)?;
                Ok::<_, StorageError>(())
            })
            .await?;
        }
        Ok(())
    }

    /// Walks migrations backward until the database is at `target`. Exercised by tests and
    /// downgrade tooling.
    pub async fn revert_to(
        &self,
        db: &Database<B>,
        ctx: &MigrationContext<'_>,
        target: u32,
    ) -> Result<(), StorageError> {
        let current = self.current_version(db).await?;
        if current > self.latest_version() {
            return Err(StorageError::SchemaTooNew {
                found: current,
                supported: self.latest_version(),
            });
        }

        for migration in self.migrations[target as usize..current as usize].iter().rev() {
            let number = migration.number();
            info!(target: "ironfish::storage", kind = ?self.kind, number, "reverting migration");
            db.with_write(|tx| {
                migration.backward(ctx, tx).map_err(|source| StorageError::MigrationFailed {
                    number,
                    source: Box::new(source),
                })?;
                if number == 1 {
                    VERSION_STORE.delete(tx, &())?;
                } else {
                    VERSION_STORE.put(tx, &(), &(number - 1))?;
                }
                Ok::<_, StorageError>(())
            })
            .await?;
        }
        Ok(())
    }
}

// TESTS
// ================================================================================================

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::backend::MemoryBackend;

    const VALUES: Store<u8, u64> = Store::new(1);

    struct SeedValue;

    impl Migration<MemoryBackend> for SeedValue {
        fn number(&self) -> u32 {
            1
        }

        fn database(&self) -> DatabaseKind {
            DatabaseKind::Chain
        }

        fn forward(
            &self,
            _ctx: &MigrationContext<'_>,
            tx: &mut DbTransaction<'_, MemoryBackend>,
        ) -> Result<(), StorageError> {
            VALUES.put(tx, &1, &100)
        }

        fn backward(
            &self,
            _ctx: &MigrationContext<'_>,
            tx: &mut DbTransaction<'_, MemoryBackend>,
        ) -> Result<(), StorageError> {
            VALUES.delete(tx, &1)
        }
    }

    struct DoubleValue;

    impl Migration<MemoryBackend> for DoubleValue {
        fn number(&self) -> u32 {
            2
        }

        fn database(&self) -> DatabaseKind {
            DatabaseKind::Chain
        }

        fn forward(
            &self,
            _ctx: &MigrationContext<'_>,
            tx: &mut DbTransaction<'_, MemoryBackend>,
        ) -> Result<(), StorageError> {
            let value = VALUES.must_get(tx, &1)?;
            VALUES.put(tx, &1, &(value * 2))
        }

        fn backward(
            &self,
            _ctx: &MigrationContext<'_>,
            tx: &mut DbTransaction<'_, MemoryBackend>,
        ) -> Result<(), StorageError> {
            let value = VALUES.must_get(tx, &1)?;
            VALUES.put(tx, &1, &(value / 2))
        }
    }

    struct AlwaysFails;

    impl Migration<MemoryBackend> for AlwaysFails {
        fn number(&self) -> u32 {
            3
        }

        fn database(&self) -> DatabaseKind {
            DatabaseKind::Chain
        }

        fn forward(
            &self,
            _ctx: &MigrationContext<'_>,
            tx: &mut DbTransaction<'_, MemoryBackend>,
        ) -> Result<(), StorageError> {
            VALUES.put(tx, &9, &999)?;
            Err(StorageError::corrupt("intentional failure"))
        }

        fn backward(
            &self,
            _ctx: &MigrationContext<'_>,
            _tx: &mut DbTransaction<'_, MemoryBackend>,
        ) -> Result<(), StorageError> {
            Ok(())
        }
    }

    fn migrator() -> Migrator<MemoryBackend> {
        Migrator::new(
            DatabaseKind::Chain,
            vec![Box::new(SeedValue) as Box<dyn Migration<MemoryBackend>>, Box::new(DoubleValue) as _],
        )
    }

    #[tokio::test]
    async fn open_runs_pending_migrations_in_order() {
        let db = Database::default();
        let migrator = migrator();
        migrator.open(&db, &MigrationContext::default()).await.unwrap();

        assert_eq!(migrator.current_version(&db).await.unwrap(), 2);
        let tx = db.begin(crate::database::TransactionMode::Read).await;
        assert_eq!(VALUES.get(&tx, &1).unwrap(), Some(200));
    }

    #[tokio::test]
    async fn open_is_idempotent() {
        let db = Database::default();
        let migrator = migrator();
        migrator.open(&db, &MigrationContext::default()).await.unwrap();
        migrator.open(&db, &MigrationContext::default()).await.unwrap();
        assert_eq!(migrator.current_version(&db).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn newer_schema_refuses_to_open() {
        let db = Database::default();
        migrator().open(&db, &MigrationContext::default()).await.unwrap();

        let older_build = Migrator::new(DatabaseKind::Chain, vec![Box::new(SeedValue) as _]);
        assert_matches!(
            older_build.open(&db, &MigrationContext::default()).await.unwrap_err(),
            StorageError::SchemaTooNew { found: 2, supported: 1 }
        );
    }

    #[tokio::test]
    async fn failed_migration_rolls_back() {
        let db = Database::default();
        let migrator = Migrator::new(
            DatabaseKind::Chain,
            vec![Box::new(SeedValue) as _, Box::new(DoubleValue) as _, Box::new(AlwaysFails) as _],
        );
        let err = migrator.open(&db, &MigrationContext::default()).await.unwrap_err();
        assert_matches!(err, StorageError::MigrationFailed { number: 3, .. });

        // versions 1 and 2 applied, the failed write of 3 did not
        assert_eq!(migrator.current_version(&db).await.unwrap(), 2);
        let tx = db.begin(crate::database::TransactionMode::Read).await;
        assert_eq!(VALUES.get(&tx, &9).unwrap(), None);
    }

    #[tokio::test]
    async fn forward_then_backward_is_identity() {
        let db = Database::default();
        let migrator = migrator();
        migrator.open(&db, &MigrationContext::default()).await.unwrap();
        let snapshot = db.backend().dump();

        migrator.revert_to(&db, &MigrationContext::default(), 0).await.unwrap();
        assert_eq!(migrator.current_version(&db).await.unwrap(), 0);

        migrator.open(&db, &MigrationContext::default()).await.unwrap();
        assert_eq!(db.backend().dump(), snapshot);
    }
}
