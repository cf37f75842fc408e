pub mod backend;
pub mod codec;
pub mod database;
pub mod errors;
pub mod migrations;
pub mod store;

// RE-EXPORTS
// ================================================================================================

pub use backend::{BatchEntry, MemoryBackend, StorageBackend};
pub use codec::{KeyCodec, ValueCodec};
pub use database::{Database, DbTransaction, TransactionMode};
pub use errors::StorageError;
pub use migrations::{DatabaseKind, Migration, MigrationContext, Migrator};
pub use store::{PrefixKey, Store, prefix_upper_bound};
