use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use ironfish_chain::{Blockchain, CancelToken, ChainEvent, ChainProcessor};
use ironfish_protocol::asset::AssetId;
use ironfish_protocol::block::Block;
use ironfish_protocol::hash::TransactionHash;
use ironfish_protocol::keys::{AccountKeys, PublicAddress};
use ironfish_protocol::note::{Memo, NotePlaintext};
use ironfish_protocol::provider::{CryptoProvider, RawMint, RawOutput, RawSpend, RawTransaction};
use ironfish_protocol::sequence::Sequence;
use ironfish_protocol::serde::{Deserializable, Serializable};
use ironfish_protocol::transaction::{Burn, Transaction, TransactionVersion};
use ironfish_storage::{
    Database,
    DbTransaction,
    MemoryBackend,
    PrefixKey,
    StorageBackend,
    StorageError,
    TransactionMode,
};
use rand::RngCore;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::account::{Account, StoredAccount};
use crate::errors::WalletError;
use crate::schema::{
    ACCOUNTS,
    BALANCES,
    Balance,
    DECRYPTED_NOTES,
    DecryptedNoteRecord,
    HEADS,
    MASTER_KEY,
    MASTER_KEY_SLOT,
    META,
    MasterKeyRecord,
    NULLIFIER_TO_NOTE,
    SEQUENCE_TO_TX,
    TIMESTAMP_TO_TX,
    TRANSACTIONS,
    WalletTransactionRecord,
    meta_key,
};

/// Sealed marker used to detect a wrong passphrase before touching account records.
pub(crate) const PASSPHRASE_CHECK: &[u8] = b"ironfish-wallet";

/// One requested payment in a transaction under construction.
#[derive(Debug, Clone)]
pub struct OutputRequest {
    pub address: PublicAddress,
    pub value: u64,
    pub memo: Memo,
    pub asset_id: AssetId,
}

// WALLET
// ================================================================================================

/// The wallet ledger: accounts, their decrypted notes, and transaction assembly.
///
/// The wallet owns its own database, separate from the chain's. It follows the canonical
/// chain through the chain processor, advancing each account's scan head inside the same
/// write transaction as that block's effects, so a crash never leaves an account's view
/// torn between blocks.
pub struct Wallet<P: CryptoProvider, B: StorageBackend = MemoryBackend> {
    db: Database<B>,
    chain: Arc<Blockchain<P, B>>,
    provider: Arc<P>,
    /// How deep a note must be buried to count as confirmed.
    confirmations: u32,
    /// The derived master key while the wallet is unlocked.
    master_key: Mutex<Option<[u8; 32]>>,
}

impl<P: CryptoProvider, B: StorageBackend> Wallet<P, B> {
    pub fn new(db: Database<B>, chain: Arc<Blockchain<P, B>>, confirmations: u32) -> Self {
        let provider = chain.provider().clone();
        Self { db, chain, provider, confirmations, master_key: Mutex::new(None) }
    }

    pub fn confirmations(&self) -> u32 {
        self.confirmations
    }

    // ACCOUNTS
    // --------------------------------------------------------------------------------------------

    /// Creates a new account from fresh entropy.
    pub async fn create_account(&self, name: &str) -> Result<Account, WalletError> {
        let mut seed = [0u8; 32];
        rand::rng().fill_bytes(&mut seed);
        let keys = self.provider.derive_account(&seed);
        self.import_account(name, keys).await
    }

    /// Imports an account from existing key material.
    pub async fn import_account(
        &self,
        name: &str,
        keys: AccountKeys,
    ) -> Result<Account, WalletError> {
        if self.find_account(name).await?.is_some() {
            return Err(WalletError::DuplicateAccountName(name.to_string()));
        }

        let master = *self.master_key.lock().await;
        let sealed_wallet = self.is_passphrase_protected().await?;
        if sealed_wallet && master.is_none() {
            return Err(WalletError::AccountLocked);
        }

        let account = self
            .db
            .with_write(|tx| {
                let id = META.get(tx, &meta_key::NEXT_ACCOUNT_ID)?.unwrap_or(0);
                META.put(tx, &meta_key::NEXT_ACCOUNT_ID, &(id + 1))?;
                let account = Account {
                    id,
                    name: name.to_string(),
                    keys,
                    multisig_keys: None,
                    scanning_enabled: true,
                };
                ACCOUNTS.put(tx, &id, &Self::envelope(&account, master.as_ref(), &*self.provider))?;
                Ok::<_, WalletError>(account)
            })
            .await?;

        info!(target: "ironfish::wallet", name, id = account.id, "created account");
        Ok(account)
    }

    /// Exports an account's full record, key material included.
    pub async fn export_account(&self, name: &str) -> Result<Account, WalletError> {
        self.get_account(name).await
    }

    pub async fn get_account(&self, name: &str) -> Result<Account, WalletError> {
        self.find_account(name)
            .await?
            .ok_or_else(|| WalletError::AccountNotFound(name.to_string()))
    }

    pub async fn accounts(&self) -> Result<Vec<Account>, WalletError> {
        let master = *self.master_key.lock().await;
        let tx = self.db.begin(TransactionMode::Read).await;
        let mut accounts = Vec::new();
        for (_, stored) in ACCOUNTS.iter(&tx)? {
            accounts.push(self.open_envelope(stored, master.as_ref())?);
        }
        Ok(accounts)
    }

    pub async fn set_scanning_enabled(
        &self,
        name: &str,
        enabled: bool,
    ) -> Result<(), WalletError> {
        let mut account = self.get_account(name).await?;
        account.scanning_enabled = enabled;
        let master = *self.master_key.lock().await;
        self.db
            .with_write(|tx| {
                ACCOUNTS.put(
                    tx,
                    &account.id,
                    &Self::envelope(&account, master.as_ref(), &*self.provider),
                )?;
                Ok::<_, WalletError>(())
            })
            .await
    }

    async fn find_account(&self, name: &str) -> Result<Option<Account>, WalletError> {
        Ok(self.accounts().await?.into_iter().find(|account| account.name == name))
    }

    // PASSPHRASE
    // --------------------------------------------------------------------------------------------

    pub async fn is_passphrase_protected(&self) -> Result<bool, WalletError> {
        let tx = self.db.begin(TransactionMode::Read).await;
        Ok(MASTER_KEY.has(&tx, &MASTER_KEY_SLOT)?)
    }

    /// Protects the wallet with a passphrase, re-encrypting every account record.
    pub async fn set_passphrase(&self, passphrase: &str) -> Result<(), WalletError> {
        if self.is_passphrase_protected().await? {
            // changing the passphrase requires the wallet to be unlocked first
            if self.master_key.lock().await.is_none() {
                return Err(WalletError::AccountLocked);
            }
        }
        let accounts = self.accounts().await?;

        let mut salt = [0u8; 32];
        rand::rng().fill_bytes(&mut salt);
        let master = self.provider.derive_master_key(passphrase, &salt);
        let check = self.provider.seal(&master, PASSPHRASE_CHECK);

        self.db
            .with_write(|tx| {
                MASTER_KEY.put(tx, &MASTER_KEY_SLOT, &MasterKeyRecord { salt, check })?;
                for account in &accounts {
                    ACCOUNTS.put(
                        tx,
                        &account.id,
                        &Self::envelope(account, Some(&master), &*self.provider),
                    )?;
                }
                Ok::<_, WalletError>(())
            })
            .await?;

        *self.master_key.lock().await = Some(master);
        info!(target: "ironfish::wallet", "wallet passphrase set");
        Ok(())
    }

    /// Unlocks a passphrase-protected wallet for this process.
    pub async fn unlock(&self, passphrase: &str) -> Result<(), WalletError> {
        let record = {
            let tx = self.db.begin(TransactionMode::Read).await;
            MASTER_KEY.get(&tx, &MASTER_KEY_SLOT)?.ok_or(StorageError::PassphraseRequired)?
        };
        let master = self.provider.derive_master_key(passphrase, &record.salt);
        match self.provider.unseal(&master, &record.check) {
            Ok(check) if check == PASSPHRASE_CHECK => {},
            _ => return Err(StorageError::WrongPassphrase.into()),
        }
        *self.master_key.lock().await = Some(master);
        Ok(())
    }

    /// Drops the in-memory master key.
    pub async fn lock(&self) {
        *self.master_key.lock().await = None;
    }

    fn envelope(account: &Account, master: Option<&[u8; 32]>, provider: &P) -> StoredAccount {
        match master {
            Some(key) => StoredAccount::Sealed(provider.seal(key, &account.to_bytes())),
            None => StoredAccount::Plain(account.clone()),
        }
    }

    fn open_envelope(
        &self,
        stored: StoredAccount,
        master: Option<&[u8; 32]>,
    ) -> Result<Account, WalletError> {
        match stored {
            StoredAccount::Plain(account) => Ok(account),
            StoredAccount::Sealed(bytes) => {
                let key = master.ok_or(WalletError::AccountLocked)?;
                let plain = self.provider.unseal(key, &bytes)?;
                Account::read_from_bytes(&plain)
                    .map_err(|err| StorageError::corrupt(err).into())
            },
        }
    }

    // SCANNING
    // --------------------------------------------------------------------------------------------

    /// Catches every scanning-enabled account up with the canonical chain.
    ///
    /// Each chain event is applied in its own wallet transaction together with the scan
    /// head for that account, in strict chain order. A fork below the account's head
    /// produces disconnect events that rewind it.
    pub async fn scan(&self) -> Result<(), WalletError> {
        self.scan_with_cancel(&CancelToken::new()).await
    }

    /// Like [`Wallet::scan`], stopping between blocks once `token` is cancelled. The
    /// block being applied always completes; the scan head stays consistent.
    pub async fn scan_with_cancel(&self, token: &CancelToken) -> Result<(), WalletError> {
        let accounts = self.accounts().await?;
        let processor = ChainProcessor::new(&self.chain);

        for account in accounts.iter().filter(|account| account.scanning_enabled) {
            let head = {
                let tx = self.db.begin(TransactionMode::Read).await;
                HEADS.get(&tx, &account.id)?
            };

            let events = processor.events_since(head.as_ref()).await?;
            for (event, cursor) in events {
                if token.is_cancelled() {
                    return Ok(());
                }
                self.db
                    .with_write(|tx| {
                        match &event {
                            ChainEvent::Connect { block, .. } => {
                                self.apply_connect(tx, account, block)?;
                            },
                            ChainEvent::Disconnect { block, .. } => {
                                self.apply_disconnect(tx, account, block)?;
                            },
                            ChainEvent::Fork { .. } => {},
                        }
                        HEADS.put(tx, &account.id, &cursor)?;
                        Ok::<_, WalletError>(())
                    })
                    .await?;
            }
        }
        Ok(())
    }

    fn apply_connect(
        &self,
        tx: &mut DbTransaction<'_, B>,
        account: &Account,
        block: &Block,
    ) -> Result<(), WalletError> {
        let sequence = block.header.sequence;
        let mut position = block.header.note_commitment.size - block.output_count();

        for transaction in &block.transactions {
            let tx_hash = self.chain.transaction_hash(transaction);
            let mut involved = false;

            for spend in transaction.spends() {
                let key = PrefixKey::new(account.id, spend.nullifier);
                if let Some(commitment) = NULLIFIER_TO_NOTE.get(tx, &key)? {
                    let note_key = PrefixKey::new(account.id, commitment);
                    let mut record = DECRYPTED_NOTES.must_get(tx, &note_key)?;
                    record.spent = true;
                    DECRYPTED_NOTES.put(tx, &note_key, &record)?;
                    self.adjust_balance(tx, account.id, &record.note.asset_id, -(record.note.value as i128))?;
                    involved = true;
                }
            }

            for output in transaction.outputs() {
                let note_position = position;
                position += 1;

                if let Some(note) = self
                    .provider
                    .decrypt_note_for_owner(&output.ciphertext, &account.keys.incoming_view_key)
                {
                    let nullifier = self.provider.nullifier(
                        &account.keys.view_key,
                        &output.commitment,
                        note_position,
                    );
                    let record = DecryptedNoteRecord {
                        commitment: output.commitment,
                        position: note_position,
                        note: note.clone(),
                        nullifier,
                        tx_hash,
                        sequence,
                        spent: false,
                    };
                    DECRYPTED_NOTES.put(tx, &PrefixKey::new(account.id, output.commitment), &record)?;
                    NULLIFIER_TO_NOTE.put(tx, &PrefixKey::new(account.id, nullifier), &output.commitment)?;
                    self.adjust_balance(tx, account.id, &note.asset_id, note.value as i128)?;
                    involved = true;
                    debug!(
                        target: "ironfish::wallet",
                        account = account.name,
                        value = note.value,
                        "decrypted incoming note"
                    );
                } else if self
                    .provider
                    .decrypt_note_for_spender(&output.ciphertext, &account.keys.outgoing_view_key)
                    .is_some()
                {
                    involved = true;
                }
            }

            if involved {
                let record = WalletTransactionRecord {
                    hash: tx_hash,
                    block_hash: self.chain.block_hash(&block.header),
                    sequence,
                    timestamp_ms: block.header.timestamp_ms,
                };
                TRANSACTIONS.put(tx, &PrefixKey::new(account.id, tx_hash), &record)?;
                SEQUENCE_TO_TX.put(tx, &PrefixKey::new(account.id, (sequence, tx_hash)), &tx_hash)?;
                TIMESTAMP_TO_TX.put(
                    tx,
                    &PrefixKey::new(account.id, (block.header.timestamp_ms, tx_hash)),
                    &tx_hash,
                )?;
            }
        }
        Ok(())
    }

    fn apply_disconnect(
        &self,
        tx: &mut DbTransaction<'_, B>,
        account: &Account,
        block: &Block,
    ) -> Result<(), WalletError> {
        let sequence = block.header.sequence;

        for transaction in &block.transactions {
            let tx_hash = self.chain.transaction_hash(transaction);

            for output in transaction.outputs() {
                let note_key = PrefixKey::new(account.id, output.commitment);
                if let Some(record) = DECRYPTED_NOTES.get(tx, &note_key)? {
                    if !record.spent {
                        self.adjust_balance(
                            tx,
                            account.id,
                            &record.note.asset_id,
                            -(record.note.value as i128),
                        )?;
                    }
                    DECRYPTED_NOTES.delete(tx, &note_key)?;
                    NULLIFIER_TO_NOTE.delete(tx, &PrefixKey::new(account.id, record.nullifier))?;
                }
            }

            for spend in transaction.spends() {
                let key = PrefixKey::new(account.id, spend.nullifier);
                if let Some(commitment) = NULLIFIER_TO_NOTE.get(tx, &key)? {
                    let note_key = PrefixKey::new(account.id, commitment);
                    if let Some(mut record) = DECRYPTED_NOTES.get(tx, &note_key)? {
                        record.spent = false;
                        DECRYPTED_NOTES.put(tx, &note_key, &record)?;
                        self.adjust_balance(
                            tx,
                            account.id,
                            &record.note.asset_id,
                            record.note.value as i128,
                        )?;
                    }
                }
            }

            TRANSACTIONS.delete(tx, &PrefixKey::new(account.id, tx_hash))?;
            SEQUENCE_TO_TX.delete(tx, &PrefixKey::new(account.id, (sequence, tx_hash)))?;
            TIMESTAMP_TO_TX.delete(
                tx,
                &PrefixKey::new(account.id, (block.header.timestamp_ms, tx_hash)),
            )?;
        }
        Ok(())
    }

    fn adjust_balance(
        &self,
        tx: &mut DbTransaction<'_, B>,
        account_id: u32,
        asset_id: &AssetId,
        delta: i128,
    ) -> Result<(), WalletError> {
        let key = PrefixKey::new(account_id, *asset_id);
        let current = BALANCES.get(tx, &key)?.unwrap_or(0) as i128;
        let updated = (current + delta).max(0) as u128;
        BALANCES.put(tx, &key, &updated)?;
        Ok(())
    }

    // BALANCES
    // --------------------------------------------------------------------------------------------

    /// Computes the balance figures for one account and asset.
    ///
    /// `pending` is a snapshot of the mempool's transactions; their outputs and spends
    /// contribute the pending, unconfirmed and available components.
    pub async fn balance(
        &self,
        name: &str,
        asset_id: &AssetId,
        pending: &[Arc<Transaction>],
    ) -> Result<Balance, WalletError> {
        let account = self.get_account(name).await?;
        let head = self.chain.head().await?;
        let tx = self.db.begin(TransactionMode::Read).await;

        let mut confirmed: u128 = 0;
        for (_, record) in DECRYPTED_NOTES.iter_prefix(&tx, &account.id)? {
            if record.spent || record.note.asset_id != *asset_id {
                continue;
            }
            let depth = head.sequence().as_u32().saturating_sub(record.sequence.as_u32()) + 1;
            if depth >= self.confirmations.max(1) {
                confirmed += record.note.value as u128;
            }
        }

        let mut pending_in: i128 = 0;
        let mut pending_out: i128 = 0;
        for transaction in pending {
            for output in transaction.outputs() {
                if let Some(note) = self
                    .provider
                    .decrypt_note_for_owner(&output.ciphertext, &account.keys.incoming_view_key)
                {
                    if note.asset_id == *asset_id {
                        pending_in += note.value as i128;
                    }
                }
            }
            for spend in transaction.spends() {
                let key = PrefixKey::new(account.id, spend.nullifier);
                if let Some(commitment) = NULLIFIER_TO_NOTE.get(&tx, &key)? {
                    let record =
                        DECRYPTED_NOTES.must_get(&tx, &PrefixKey::new(account.id, commitment))?;
                    if !record.spent && record.note.asset_id == *asset_id {
                        pending_out += record.note.value as i128;
                    }
                }
            }
        }

        let pending_net = pending_in - pending_out;
        Ok(Balance {
            confirmed,
            unconfirmed: confirmed as i128 + pending_net,
            pending: pending_net,
            available: confirmed.saturating_sub(pending_out.max(0) as u128),
        })
    }

    /// The maintained unspent-value aggregate for one account and asset, independent of
    /// confirmation depth. Kept in lockstep with the note records by the scanner.
    pub async fn unspent_total(&self, name: &str, asset_id: &AssetId) -> Result<u128, WalletError> {
        let account = self.get_account(name).await?;
        let tx = self.db.begin(TransactionMode::Read).await;
        Ok(BALANCES.get(&tx, &PrefixKey::new(account.id, *asset_id))?.unwrap_or(0))
    }

    /// All unspent decrypted notes of an account, newest first.
    pub async fn unspent_notes(&self, name: &str) -> Result<Vec<DecryptedNoteRecord>, WalletError> {
        let account = self.get_account(name).await?;
        let tx = self.db.begin(TransactionMode::Read).await;
        let mut notes: Vec<DecryptedNoteRecord> = DECRYPTED_NOTES
            .iter_prefix(&tx, &account.id)?
            .into_iter()
            .map(|(_, record)| record)
            .filter(|record| !record.spent)
            .collect();
        notes.sort_by(|a, b| b.sequence.cmp(&a.sequence));
        Ok(notes)
    }

    /// Transactions the account was involved in, keyed history for display.
    pub async fn account_transactions(
        &self,
        name: &str,
    ) -> Result<Vec<WalletTransactionRecord>, WalletError> {
        let account = self.get_account(name).await?;
        let tx = self.db.begin(TransactionMode::Read).await;
        Ok(TRANSACTIONS
            .iter_prefix(&tx, &account.id)?
            .into_iter()
            .map(|(_, record)| record)
            .collect())
    }

    /// The account's transactions connected within `start..=end`, in chain order.
    pub async fn transactions_in_sequence_range(
        &self,
        name: &str,
        start: Sequence,
        end: Sequence,
    ) -> Result<Vec<WalletTransactionRecord>, WalletError> {
        let account = self.get_account(name).await?;
        let tx = self.db.begin(TransactionMode::Read).await;
        let mut records = Vec::new();
        for (key, tx_hash) in SEQUENCE_TO_TX.iter_prefix(&tx, &account.id)? {
            let (sequence, _) = key.key;
            if sequence >= start && sequence <= end {
                records.push(TRANSACTIONS.must_get(&tx, &PrefixKey::new(account.id, tx_hash))?);
            }
        }
        Ok(records)
    }

    /// The account's most recent transactions by block timestamp, newest first.
    pub async fn recent_transactions(
        &self,
        name: &str,
        limit: usize,
    ) -> Result<Vec<WalletTransactionRecord>, WalletError> {
        let account = self.get_account(name).await?;
        let tx = self.db.begin(TransactionMode::Read).await;
        let mut records = Vec::new();
        for (_, tx_hash) in TIMESTAMP_TO_TX.iter_prefix_rev(&tx, &account.id)?.into_iter().take(limit)
        {
            records.push(TRANSACTIONS.must_get(&tx, &PrefixKey::new(account.id, tx_hash))?);
        }
        Ok(records)
    }

    // TRANSACTION ASSEMBLY
    // --------------------------------------------------------------------------------------------

    /// Assembles a raw transaction spending this account's notes.
    ///
    /// Notes are selected greedily by descending value for each needed asset, the native
    /// asset last since it also absorbs the fee. Change per asset comes back to the
    /// account. `pending_nullifiers` excludes notes already committed by mempool
    /// transactions.
    #[allow(clippy::too_many_arguments)]
    pub async fn create_raw_transaction(
        &self,
        name: &str,
        outputs: Vec<OutputRequest>,
        mints: Vec<RawMint>,
        burns: Vec<Burn>,
        fee: u64,
        expiration: u32,
        pending_nullifiers: &HashSet<ironfish_protocol::hash::Nullifier>,
    ) -> Result<RawTransaction, WalletError> {
        let account = self.get_account(name).await?;
        let head = self.chain.head().await?;

        // how much of each asset the transaction must pull in from existing notes
        let mut needed: BTreeMap<AssetId, u128> = BTreeMap::new();
        for output in &outputs {
            *needed.entry(output.asset_id).or_default() += output.value as u128;
        }
        for burn in &burns {
            *needed.entry(burn.asset_id).or_default() += burn.value as u128;
        }
        *needed.entry(AssetId::NATIVE).or_default() += fee as u128;
        for mint in &mints {
            let id =
                self.provider.asset_id(&mint.creator, &mint.name, &mint.metadata, mint.nonce);
            if let Some(amount) = needed.get_mut(&id) {
                *amount = amount.saturating_sub(mint.value as u128);
            }
        }

        let spendable = {
            let tx = self.db.begin(TransactionMode::Read).await;
            let mut notes: Vec<DecryptedNoteRecord> = DECRYPTED_NOTES
                .iter_prefix(&tx, &account.id)?
                .into_iter()
                .map(|(_, record)| record)
                .filter(|record| {
                    !record.spent
                        && !pending_nullifiers.contains(&record.nullifier)
                        && head.sequence().as_u32().saturating_sub(record.sequence.as_u32()) + 1
                            >= self.confirmations.max(1)
                })
                .collect();
            notes.sort_by(|a, b| b.note.value.cmp(&a.note.value));
            notes
        };

        let mut spends: Vec<RawSpend> = Vec::new();
        let mut raw_outputs: Vec<RawOutput> = Vec::new();

        // native last: it funds the fee and its change math folds everything else first
        let mut assets: Vec<(AssetId, u128)> =
            needed.iter().filter(|(id, _)| !id.is_native()).map(|(id, v)| (*id, *v)).collect();
        if let Some(native) = needed.get(&AssetId::NATIVE) {
            assets.push((AssetId::NATIVE, *native));
        }

        for (asset_id, amount) in assets {
            if amount == 0 {
                continue;
            }
            let mut gathered: u128 = 0;
            for record in spendable.iter().filter(|record| record.note.asset_id == asset_id) {
                if gathered >= amount {
                    break;
                }
                let witness = self.chain.note_witness(record.position).await?;
                spends.push(RawSpend {
                    note: record.note.clone(),
                    position: record.position,
                    auth_path: witness.auth_path,
                    root: witness.root_hash,
                    tree_size: witness.tree_size,
                });
                gathered += record.note.value as u128;
            }

            if gathered < amount {
                return Err(WalletError::InsufficientBalance {
                    asset: asset_id,
                    needed: amount,
                    available: gathered,
                });
            }

            let change = gathered - amount;
            if change > 0 {
                raw_outputs.push(RawOutput {
                    note: NotePlaintext {
                        owner: account.keys.public_address,
                        value: change as u64,
                        memo: Memo::default(),
                        asset_id,
                        sender: account.keys.public_address,
                    },
                });
            }
        }

        for request in outputs {
            raw_outputs.push(RawOutput {
                note: NotePlaintext {
                    owner: request.address,
                    value: request.value,
                    memo: request.memo,
                    asset_id: request.asset_id,
                    sender: account.keys.public_address,
                },
            });
        }

        Ok(RawTransaction {
            version: TransactionVersion::V2,
            spends,
            outputs: raw_outputs,
            mints,
            burns,
            fee: fee as i64,
            expiration,
        })
    }

    /// Proves and signs a raw transaction with the account's spending key.
    pub async fn post_transaction(
        &self,
        name: &str,
        raw: &RawTransaction,
    ) -> Result<Transaction, WalletError> {
        let account = self.get_account(name).await?;
        let spending_key = account
            .keys
            .spending_key
            .ok_or_else(|| WalletError::SpendingKeyMissing(name.to_string()))?;
        Ok(self.provider.post(raw, &spending_key)?)
    }

    /// The hash of a posted transaction, as the chain will identify it.
    pub fn transaction_hash(&self, transaction: &Transaction) -> TransactionHash {
        self.chain.transaction_hash(transaction)
    }

    /// The account's current scan head, if it has scanned anything.
    pub async fn scan_head(&self, name: &str) -> Result<Option<ironfish_chain::ChainCursor>, WalletError> {
        let account = self.get_account(name).await?;
        let tx = self.db.begin(TransactionMode::Read).await;
        Ok(HEADS.get(&tx, &account.id)?)
    }
}
