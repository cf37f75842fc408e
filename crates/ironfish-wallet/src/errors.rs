use ironfish_chain::ChainError;
use ironfish_protocol::asset::AssetId;
use ironfish_protocol::errors::ProviderError;
use ironfish_storage::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("no account named `{0}`")]
    AccountNotFound(String),

    #[error("an account named `{0}` already exists")]
    DuplicateAccountName(String),

    #[error("account `{0}` is view-only and cannot sign spends")]
    SpendingKeyMissing(String),

    #[error("the wallet is locked; unlock it with the passphrase first")]
    AccountLocked,

    #[error("insufficient balance for asset {asset}: needed {needed}, available {available}")]
    InsufficientBalance { asset: AssetId, needed: u128, available: u128 },

    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Provider(#[from] ProviderError),
}
