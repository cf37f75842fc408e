pub mod blockchain;
pub mod cancel;
pub mod chain_processor;
pub mod errors;
pub mod events;
pub mod merkle;
pub mod schema;
pub mod verifier;

// RE-EXPORTS
// ================================================================================================

pub use blockchain::{AddBlockReason, AddBlockResult, Blockchain, ChainHeader};
pub use cancel::CancelToken;
pub use chain_processor::{ChainCursor, ChainProcessor};
pub use errors::{ChainError, TreeError, ValidationReason};
pub use events::{ChainEvent, EventHub};
pub use merkle::{MerkleHasher, MerkleTree, NoteTreeHasher, NullifierTreeHasher, TreeStores, Witness};
pub use schema::TransactionLocation;
pub use verifier::Verifier;
