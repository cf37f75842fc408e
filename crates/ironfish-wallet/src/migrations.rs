use std::sync::Arc;

use ironfish_protocol::provider::CryptoProvider;
use ironfish_protocol::serde::Serializable;
use ironfish_storage::{
    DatabaseKind,
    DbTransaction,
    Migration,
    MigrationContext,
    Migrator,
    StorageBackend,
    StorageError,
};
use tracing::debug;

use crate::account::{Account, StoredAccount};
use crate::schema::{MASTER_KEY, MASTER_KEY_SLOT};
use crate::wallet::PASSPHRASE_CHECK;

/// Builds the wallet database migrator with every known migration.
pub fn migrator<P: CryptoProvider, B: StorageBackend>(provider: Arc<P>) -> Migrator<B> {
    Migrator::new(
        DatabaseKind::Wallet,
        vec![Box::new(WrapAccountEnvelopes { provider }) as Box<dyn Migration<B>>],
    )
}

// MIGRATION 1: ACCOUNT ENVELOPES
// ================================================================================================

/// Store encodings on either side of migration 1. The store id is shared; only the value
/// codec changed.
pub mod migration_001 {
    use ironfish_storage::Store;

    use crate::account::{Account, StoredAccount};

    /// Before: account records stored bare.
    pub const OLD_ACCOUNTS: Store<u32, Account> = Store::new(1);

    /// After: records wrapped in the plain/sealed envelope.
    pub const NEW_ACCOUNTS: Store<u32, StoredAccount> = Store::new(1);
}

/// Wraps bare account records in the [`StoredAccount`] envelope, sealing them under the
/// master key when the wallet is passphrase-protected.
///
/// The passphrase arrives through the migration context and is used only to derive the
/// master key for resealing; nothing derived from it is written.
pub struct WrapAccountEnvelopes<P> {
    provider: Arc<P>,
}

impl<P: CryptoProvider, B: StorageBackend> Migration<B> for WrapAccountEnvelopes<P> {
    fn number(&self) -> u32 {
        1
    }

    fn database(&self) -> DatabaseKind {
        DatabaseKind::Wallet
    }

    fn forward(
        &self,
        ctx: &MigrationContext<'_>,
        tx: &mut DbTransaction<'_, B>,
    ) -> Result<(), StorageError> {
        let master = self.master_key(ctx, tx)?;

        for (id, account) in migration_001::OLD_ACCOUNTS.iter(tx)? {
            let stored = match master {
                Some(key) => {
                    StoredAccount::Sealed(self.provider.seal(&key, &account.to_bytes()))
                },
                None => StoredAccount::Plain(account),
            };
            migration_001::NEW_ACCOUNTS.put(tx, &id, &stored)?;
        }
        debug!(target: "ironfish::wallet", "wrapped account records in envelopes");
        Ok(())
    }

    fn backward(
        &self,
        ctx: &MigrationContext<'_>,
        tx: &mut DbTransaction<'_, B>,
    ) -> Result<(), StorageError> {
        let master = self.master_key(ctx, tx)?;

        for (id, stored) in migration_001::NEW_ACCOUNTS.iter(tx)? {
            let account = match stored {
                StoredAccount::Plain(account) => account,
                StoredAccount::Sealed(bytes) => {
                    let key = master.ok_or(StorageError::PassphraseRequired)?;
                    let plain = self
                        .provider
                        .unseal(&key, &bytes)
                        .map_err(|_| StorageError::WrongPassphrase)?;
                    use ironfish_protocol::serde::Deserializable;
                    Account::read_from_bytes(&plain).map_err(StorageError::corrupt)?
                },
            };
            migration_001::OLD_ACCOUNTS.put(tx, &id, &account)?;
        }
        Ok(())
    }
}

impl<P: CryptoProvider> WrapAccountEnvelopes<P> {
    /// Derives and verifies the master key when the wallet is passphrase-protected.
    fn master_key<B: StorageBackend>(
        &self,
        ctx: &MigrationContext<'_>,
        tx: &DbTransaction<'_, B>,
    ) -> Result<Option<[u8; 32]>, StorageError> {
        let Some(record) = MASTER_KEY.get(tx, &MASTER_KEY_SLOT)? else {
            return Ok(None);
        };
        let passphrase = ctx.passphrase.ok_or(StorageError::PassphraseRequired)?;
        let master = self.provider.derive_master_key(passphrase, &record.salt);
        match self.provider.unseal(&master, &record.check) {
            Ok(check) if check == PASSPHRASE_CHECK => Ok(Some(master)),
            _ => Err(StorageError::WrongPassphrase),
        }
    }
}
