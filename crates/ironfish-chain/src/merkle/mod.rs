mod hasher;
mod tree;
mod witness;

pub use hasher::{MerkleHasher, NoteTreeHasher, NullifierTreeHasher};
pub use tree::{MerkleTree, TreeStores};
pub use witness::Witness;
