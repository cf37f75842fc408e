use ironfish_protocol::hash::MerkleHash;
use ironfish_storage::{DbTransaction, StorageBackend, Store};

use super::hasher::MerkleHasher;
use super::witness::Witness;
use crate::errors::TreeError;

/// The typed stores backing one commitment tree.
///
/// `nodes` holds every materialized node keyed by `(level, index)`, level 0 being the
/// leaves. `meta` holds the leaf count. Each tree instance must be given store ids that are
/// unique within its database.
#[derive(Debug, Clone, Copy)]
pub struct TreeStores {
    pub nodes: Store<(u8, u32), MerkleHash>,
    pub meta: Store<(), u64>,
}

impl TreeStores {
    pub const fn new(nodes_id: u8, meta_id: u8) -> Self {
        Self { nodes: Store::new(nodes_id), meta: Store::new(meta_id) }
    }
}

/// An append-only binary Merkle tree over a typed node store.
///
/// The tree materializes the full path from every appended leaf to the root; interior
/// nodes whose right subtree is still empty are padded with a depth-indexed empty hash.
/// Nodes covering a completed span never change again, which is what keeps historical
/// roots and old witnesses computable after the tree grows.
///
/// A single writer mutates the tree inside the chain's write transaction; concurrent
/// readers work against the snapshot their own transaction sees.
pub struct MerkleTree<H: MerkleHasher> {
    hasher: H,
    depth: u8,
    /// `empties[l]` is the hash of an all-empty subtree of height `l`.
    empties: Vec<MerkleHash>,
    stores: TreeStores,
}

impl<H: MerkleHasher> MerkleTree<H> {
    pub fn new(hasher: H, depth: u8, stores: TreeStores) -> Self {
        assert!(depth >= 1 && depth <= 32, "tree depth must be between 1 and 32");
        let mut empties = vec![MerkleHash::default()];
        for level in 0..depth {
            let child = empties[level as usize];
            empties.push(hasher.combine(level, &child, &child));
        }
        Self { hasher, depth, empties, stores }
    }

    pub fn depth(&self) -> u8 {
        self.depth
    }

    /// Maximum number of leaves this tree can hold.
    pub fn capacity(&self) -> u64 {
        1u64 << self.depth
    }

    pub fn hasher(&self) -> &H {
        &self.hasher
    }

    // READS
    // --------------------------------------------------------------------------------------------

    /// The current number of leaves.
    pub fn size<B: StorageBackend>(&self, tx: &DbTransaction<'_, B>) -> Result<u64, TreeError> {
        Ok(self.stores.meta.get(tx, &())?.unwrap_or(0))
    }

    /// The root over the current leaves.
    pub fn root<B: StorageBackend>(
        &self,
        tx: &DbTransaction<'_, B>,
    ) -> Result<MerkleHash, TreeError> {
        let size = self.size(tx)?;
        self.root_at(tx, size)
    }

    /// The root the tree had when it held exactly `size` leaves.
    pub fn root_at<B: StorageBackend>(
        &self,
        tx: &DbTransaction<'_, B>,
        size: u64,
    ) -> Result<MerkleHash, TreeError> {
        let current = self.size(tx)?;
        if size > current {
            return Err(TreeError::SizeOutOfRange { requested: size, size: current });
        }
        self.subtree_root(tx, self.depth, 0, size)
    }

    /// Returns true if `root` was the tree's root at the given size. This is the anchor
    /// check spends are validated against.
    pub fn was_root_at<B: StorageBackend>(
        &self,
        tx: &DbTransaction<'_, B>,
        root: &MerkleHash,
        size: u64,
    ) -> Result<bool, TreeError> {
        if size > self.size(tx)? {
            return Ok(false);
        }
        Ok(self.subtree_root(tx, self.depth, 0, size)? == *root)
    }

    /// The leaf hash at `index`.
    pub fn leaf<B: StorageBackend>(
        &self,
        tx: &DbTransaction<'_, B>,
        index: u64,
    ) -> Result<MerkleHash, TreeError> {
        let size = self.size(tx)?;
        if index >= size {
            return Err(TreeError::IndexOutOfRange { index, size });
        }
        Ok(self.stores.nodes.must_get(tx, &(0, index as u32))?)
    }

    /// Builds the authentication path for the leaf at `index` against the current size.
    pub fn witness<B: StorageBackend>(
        &self,
        tx: &DbTransaction<'_, B>,
        index: u64,
    ) -> Result<Witness, TreeError> {
        let size = self.size(tx)?;
        if index >= size {
            return Err(TreeError::IndexOutOfRange { index, size });
        }

        let mut auth_path = Vec::with_capacity(self.depth as usize);
        for level in 0..self.depth {
            let sibling = (index >> level) ^ 1;
            auth_path.push(self.subtree_root(tx, level, sibling, size)?);
        }

        Ok(Witness {
            position: index,
            auth_path,
            root_hash: self.subtree_root(tx, self.depth, 0, size)?,
            tree_size: size,
        })
    }

    // MUTATIONS
    // --------------------------------------------------------------------------------------------

    /// Appends an element, returning its leaf index.
    pub fn append<B: StorageBackend>(
        &self,
        tx: &mut DbTransaction<'_, B>,
        element: &H::Element,
    ) -> Result<u64, TreeError> {
        let size = self.size(tx)?;
        if size >= self.capacity() {
            return Err(TreeError::TreeFull);
        }

        let index = size;
        let leaf = self.hasher.leaf(element);
        self.stores.nodes.put(tx, &(0, index as u32), &leaf)?;
        self.rehash_spine(tx, index, leaf)?;
        self.stores.meta.put(tx, &(), &(size + 1))?;
        Ok(index)
    }

    /// Shrinks the tree to `size` leaves, dropping everything above and garbage-collecting
    /// interior nodes that no longer cover any leaf. Truncating to the current size or
    /// larger is a no-op.
    pub fn truncate<B: StorageBackend>(
        &self,
        tx: &mut DbTransaction<'_, B>,
        size: u64,
    ) -> Result<(), TreeError> {
        let current = self.size(tx)?;
        if size >= current {
            return Ok(());
        }

        let old_last = current - 1;
        if size == 0 {
            for level in 0..=self.depth {
                for index in 0..=(old_last >> level) {
                    self.stores.nodes.delete(tx, &(level, index as u32))?;
                }
            }
            self.stores.meta.put(tx, &(), &0)?;
            return Ok(());
        }

        let new_last = size - 1;
        for level in 0..=self.depth {
            let keep = new_last >> level;
            for index in (keep + 1)..=(old_last >> level) {
                self.stores.nodes.delete(tx, &(level, index as u32))?;
            }
        }

        let leaf = self.stores.nodes.must_get(tx, &(0, new_last as u32))?;
        self.rehash_spine(tx, new_last, leaf)?;
        self.stores.meta.put(tx, &(), &size)?;
        Ok(())
    }

    // HELPERS
    // --------------------------------------------------------------------------------------------

    /// Rewrites the path from the leaf at `index` up to the root, padding missing right
    /// siblings with the empty hash of their level.
    fn rehash_spine<B: StorageBackend>(
        &self,
        tx: &mut DbTransaction<'_, B>,
        index: u64,
        leaf: MerkleHash,
    ) -> Result<(), TreeError> {
        let mut hash = leaf;
        for level in 0..self.depth {
            let node_index = index >> level;
            hash = if node_index & 1 == 1 {
                let left =
                    self.stores.nodes.must_get(tx, &(level, (node_index - 1) as u32))?;
                self.hasher.combine(level, &left, &hash)
            } else {
                self.hasher.combine(level, &hash, &self.empties[level as usize])
            };
            self.stores.nodes.put(tx, &(level + 1, (node_index >> 1) as u32), &hash)?;
        }
        Ok(())
    }

    /// Root of the subtree of height `level` at `index`, as it stood when the whole tree
    /// held `size` leaves. Completed subtrees are read straight from the node store; the
    /// single partial subtree on the right edge is recomputed from its children.
    fn subtree_root<B: StorageBackend>(
        &self,
        tx: &DbTransaction<'_, B>,
        level: u8,
        index: u64,
        size: u64,
    ) -> Result<MerkleHash, TreeError> {
        let span_start = index << level;
        let span = 1u64 << level;

        if span_start >= size {
            return Ok(self.empties[level as usize]);
        }
        if span_start + span <= size {
            return Ok(self.stores.nodes.must_get(tx, &(level, index as u32))?);
        }

        let left = self.subtree_root(tx, level - 1, index * 2, size)?;
        let right = self.subtree_root(tx, level - 1, index * 2 + 1, size)?;
        Ok(self.hasher.combine(level - 1, &left, &right))
    }
}

// TESTS
// ================================================================================================

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use ironfish_protocol::hash::NoteCommitment;
    use ironfish_storage::{Database, TransactionMode};

    use super::*;

    /// A cheap deterministic hasher for exercising tree structure.
    struct XorHasher;

    impl MerkleHasher for XorHasher {
        type Element = NoteCommitment;

        fn leaf(&self, element: &Self::Element) -> MerkleHash {
            MerkleHash::new(*element.as_bytes())
        }

        fn combine(&self, depth: u8, left: &MerkleHash, right: &MerkleHash) -> MerkleHash {
            let mut bytes = [0u8; 32];
            for (i, byte) in bytes.iter_mut().enumerate() {
                *byte = left.as_bytes()[i] ^ right.as_bytes()[i].rotate_left(1) ^ depth;
            }
            MerkleHash::new(bytes)
        }
    }

    fn tree(depth: u8) -> MerkleTree<XorHasher> {
        MerkleTree::new(XorHasher, depth, TreeStores::new(10, 11))
    }

    fn commitment(tag: u8) -> NoteCommitment {
        NoteCommitment::new([tag; 32])
    }

    async fn append_many(
        db: &Database,
        tree: &MerkleTree<XorHasher>,
        range: std::ops::Range<u8>,
    ) {
        let mut tx = db.begin(TransactionMode::ReadWrite).await;
        for tag in range {
            tree.append(&mut tx, &commitment(tag)).unwrap();
        }
        tx.commit().unwrap();
    }

    #[tokio::test]
    async fn append_returns_sequential_indices() {
        let db = Database::default();
        let tree = tree(4);
        let mut tx = db.begin(TransactionMode::ReadWrite).await;
        for tag in 0..5u8 {
            assert_eq!(tree.append(&mut tx, &commitment(tag)).unwrap(), tag as u64);
        }
        assert_eq!(tree.size(&tx).unwrap(), 5);
    }

    #[tokio::test]
    async fn root_is_deterministic_across_reimports() {
        let db1 = Database::default();
        let db2 = Database::default();
        let tree1 = tree(6);
        let tree2 = tree(6);
        append_many(&db1, &tree1, 0..13).await;
        append_many(&db2, &tree2, 0..13).await;

        let tx1 = db1.begin(TransactionMode::Read).await;
        let tx2 = db2.begin(TransactionMode::Read).await;
        assert_eq!(tree1.root(&tx1).unwrap(), tree2.root(&tx2).unwrap());
    }

    #[tokio::test]
    async fn historical_roots_are_stable_under_growth() {
        let db = Database::default();
        let tree = tree(6);
        append_many(&db, &tree, 0..7).await;
        let root_at_7 = {
            let tx = db.begin(TransactionMode::Read).await;
            tree.root(&tx).unwrap()
        };

        append_many(&db, &tree, 7..20).await;
        let tx = db.begin(TransactionMode::Read).await;
        assert_eq!(tree.root_at(&tx, 7).unwrap(), root_at_7);
        assert!(tree.was_root_at(&tx, &root_at_7, 7).unwrap());
        assert!(!tree.was_root_at(&tx, &root_at_7, 8).unwrap());
    }

    #[tokio::test]
    async fn witnesses_verify_and_survive_growth() {
        let db = Database::default();
        let tree = tree(6);
        append_many(&db, &tree, 0..9).await;

        let witness = {
            let tx = db.begin(TransactionMode::Read).await;
            tree.witness(&tx, 3).unwrap()
        };
        assert_eq!(witness.auth_path.len(), 6);
        assert!(witness.verify(tree.hasher(), &commitment(3)));
        assert!(!witness.verify(tree.hasher(), &commitment(4)));

        // the tree grows; the old witness still verifies against its recorded root
        append_many(&db, &tree, 9..30).await;
        assert!(witness.verify(tree.hasher(), &commitment(3)));

        // and the recorded root is still a recognized historical root
        let tx = db.begin(TransactionMode::Read).await;
        assert!(tree.was_root_at(&tx, &witness.root_hash, witness.tree_size).unwrap());
    }

    #[tokio::test]
    async fn truncate_restores_previous_root() {
        let db = Database::default();
        let tree = tree(6);
        append_many(&db, &tree, 0..11).await;
        let (root_at_11, nodes_at_11) = {
            let tx = db.begin(TransactionMode::Read).await;
            (tree.root(&tx).unwrap(), tree.stores.nodes.iter(&tx).unwrap())
        };

        append_many(&db, &tree, 11..40).await;

        let mut tx = db.begin(TransactionMode::ReadWrite).await;
        tree.truncate(&mut tx, 11).unwrap();
        assert_eq!(tree.size(&tx).unwrap(), 11);
        assert_eq!(tree.root(&tx).unwrap(), root_at_11);
        // orphaned nodes were collected: the node set matches the original tree exactly
        assert_eq!(tree.stores.nodes.iter(&tx).unwrap(), nodes_at_11);
    }

    #[tokio::test]
    async fn truncate_is_idempotent() {
        let db = Database::default();
        let tree = tree(5);
        append_many(&db, &tree, 0..8).await;

        let mut tx = db.begin(TransactionMode::ReadWrite).await;
        tree.truncate(&mut tx, 5).unwrap();
        let root = tree.root(&tx).unwrap();
        tree.truncate(&mut tx, 5).unwrap();
        tree.truncate(&mut tx, 8).unwrap();
        assert_eq!(tree.size(&tx).unwrap(), 5);
        assert_eq!(tree.root(&tx).unwrap(), root);
    }

    #[tokio::test]
    async fn truncate_to_zero_empties_the_store() {
        let db = Database::default();
        let tree = tree(5);
        append_many(&db, &tree, 0..8).await;

        let mut tx = db.begin(TransactionMode::ReadWrite).await;
        tree.truncate(&mut tx, 0).unwrap();
        assert_eq!(tree.size(&tx).unwrap(), 0);
        assert!(tree.stores.nodes.iter(&tx).unwrap().is_empty());
        assert_eq!(tree.root(&tx).unwrap(), tree.empties[5]);
    }

    #[tokio::test]
    async fn full_tree_rejects_appends() {
        let db = Database::default();
        let tree = tree(2);
        let mut tx = db.begin(TransactionMode::ReadWrite).await;
        for tag in 0..4u8 {
            tree.append(&mut tx, &commitment(tag)).unwrap();
        }
        assert_matches!(
            tree.append(&mut tx, &commitment(4)).unwrap_err(),
            TreeError::TreeFull
        );
    }

    #[tokio::test]
    async fn witness_beyond_size_is_rejected() {
        let db = Database::default();
        let tree = tree(4);
        append_many(&db, &tree, 0..3).await;
        let tx = db.begin(TransactionMode::Read).await;
        assert_matches!(
            tree.witness(&tx, 3).unwrap_err(),
            TreeError::IndexOutOfRange { index: 3, size: 3 }
        );
    }

    /// Reference root: fold the leaf list bottom-up, padding with empties.
    fn naive_root(tree: &MerkleTree<XorHasher>, leaves: &[NoteCommitment]) -> MerkleHash {
        let mut level: Vec<MerkleHash> =
            leaves.iter().map(|leaf| tree.hasher.leaf(leaf)).collect();
        for depth in 0..tree.depth {
            if level.is_empty() {
                return tree.empties[tree.depth as usize];
            }
            let mut next = Vec::with_capacity(level.len().div_ceil(2));
            for pair in level.chunks(2) {
                let right = pair.get(1).copied().unwrap_or(tree.empties[depth as usize]);
                next.push(tree.hasher.combine(depth, &pair[0], &right));
            }
            level = next;
        }
        level[0]
    }

    #[tokio::test]
    async fn random_append_truncate_matches_reference() {
        use rand::{Rng, SeedableRng};

        let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(0x1f1f);
        let db = Database::default();
        let tree = tree(6);
        let mut model: Vec<NoteCommitment> = Vec::new();

        for step in 0..200u32 {
            let mut tx = db.begin(TransactionMode::ReadWrite).await;
            if model.len() < 64 && (model.is_empty() || rng.random_bool(0.7)) {
                let leaf = commitment((step % 251) as u8);
                tree.append(&mut tx, &leaf).unwrap();
                model.push(leaf);
            } else {
                let keep = rng.random_range(0..=model.len());
                tree.truncate(&mut tx, keep as u64).unwrap();
                model.truncate(keep);
            }
            tx.commit().unwrap();

            let tx = db.begin(TransactionMode::Read).await;
            assert_eq!(tree.size(&tx).unwrap(), model.len() as u64);
            assert_eq!(tree.root(&tx).unwrap(), naive_root(&tree, &model), "step {step}");

            // every prefix is a valid historical root
            if !model.is_empty() {
                let cut = rng.random_range(0..=model.len());
                assert_eq!(
                    tree.root_at(&tx, cut as u64).unwrap(),
                    naive_root(&tree, &model[..cut])
                );
            }
        }
    }
}
