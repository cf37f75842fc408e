pub mod account;
pub mod errors;
pub mod migrations;
pub mod schema;

mod wallet;

pub use account::{Account, StoredAccount};
pub use errors::WalletError;
pub use schema::{Balance, DecryptedNoteRecord, MasterKeyRecord, WalletTransactionRecord};
pub use wallet::{OutputRequest, Wallet};
