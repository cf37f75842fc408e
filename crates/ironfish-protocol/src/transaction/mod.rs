mod burn;
mod mint;
mod output;
mod spend;
mod version;

pub use burn::Burn;
pub use mint::Mint;
pub use output::Output;
pub use spend::Spend;
pub use version::TransactionVersion;

use crate::hash::TransactionHash;
use crate::sequence::Sequence;
use crate::serde::{
    ByteReader,
    ByteWriter,
    Deserializable,
    DeserializationError,
    Serializable,
};
use crate::{KEY_LENGTH, SIGNATURE_SIZE};

/// A posted shielded transaction.
///
/// The identity of a transaction is the hash of its unsigned body: every field in wire
/// order except the binding signature. Fields are immutable once posted.
///
/// `fee` is signed: a regular transaction carries a non-negative fee, while the miner's fee
/// transaction at the head of a block carries the negated sum of block fees plus the mining
/// reward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    version: TransactionVersion,
    spends: Vec<Spend>,
    outputs: Vec<Output>,
    mints: Vec<Mint>,
    burns: Vec<Burn>,
    fee: i64,
    /// The sequence at which this transaction can no longer be included; 0 disables
    /// expiration.
    expiration: u32,
    public_key_randomness: [u8; KEY_LENGTH],
    binding_signature: [u8; SIGNATURE_SIZE],
}

impl Transaction {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        version: TransactionVersion,
        spends: Vec<Spend>,
        outputs: Vec<Output>,
        mints: Vec<Mint>,
        burns: Vec<Burn>,
        fee: i64,
        expiration: u32,
        public_key_randomness: [u8; KEY_LENGTH],
        binding_signature: [u8; SIGNATURE_SIZE],
    ) -> Self {
        Self {
            version,
            spends,
            outputs,
            mints,
            burns,
            fee,
            expiration,
            public_key_randomness,
            binding_signature,
        }
    }

    // ACCESSORS
    // --------------------------------------------------------------------------------------------

    pub fn version(&self) -> TransactionVersion {
        self.version
    }

    pub fn spends(&self) -> &[Spend] {
        &self.spends
    }

    pub fn outputs(&self) -> &[Output] {
        &self.outputs
    }

    pub fn mints(&self) -> &[Mint] {
        &self.mints
    }

    pub fn burns(&self) -> &[Burn] {
        &self.burns
    }

    pub fn fee(&self) -> i64 {
        self.fee
    }

    pub fn expiration(&self) -> u32 {
        self.expiration
    }

    pub fn public_key_randomness(&self) -> &[u8; KEY_LENGTH] {
        &self.public_key_randomness
    }

    pub fn binding_signature(&self) -> &[u8; SIGNATURE_SIZE] {
        &self.binding_signature
    }

    /// Returns true if this transaction can no longer be included at the given sequence.
    ///
    /// An expiration of 0 never expires; otherwise the transaction expires once the chain
    /// reaches `expiration`.
    pub fn is_expired_at(&self, sequence: Sequence) -> bool {
        self.expiration != 0 && self.expiration <= sequence.as_u32()
    }

    /// Returns true if this transaction has the shape of a miner's fee: exactly one output,
    /// no spends, no mints, no burns and a non-positive fee.
    pub fn is_miners_fee_shape(&self) -> bool {
        self.spends.is_empty()
            && self.outputs.len() == 1
            && self.mints.is_empty()
            && self.burns.is_empty()
            && self.fee <= 0
    }

    /// The bytes whose hash identifies this transaction: everything but the binding
    /// signature, in wire order.
    pub fn unsigned_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        self.write_body(&mut bytes);
        bytes
    }

    /// Computes this transaction's identity hash through the given hasher.
    pub fn hash_with(&self, hash_tx: impl Fn(&[u8]) -> [u8; 32]) -> TransactionHash {
        TransactionHash::new(hash_tx(&self.unsigned_bytes()))
    }

    fn write_body<W: ByteWriter + ?Sized>(&self, target: &mut W) {
        self.version.write_into(target);
        self.spends.write_into(target);
        self.outputs.write_into(target);
        target.write_len(self.mints.len());
        for mint in &self.mints {
            mint.write_into_versioned(target, self.version);
        }
        self.burns.write_into(target);
        target.write_i64(self.fee);
        target.write_u32(self.expiration);
        target.write_bytes(&self.public_key_randomness);
    }
}

impl Serializable for Transaction {
    fn write_into<W: ByteWriter + ?Sized>(&self, target: &mut W) {
        self.write_body(target);
        target.write_bytes(&self.binding_signature);
    }
}

impl Deserializable for Transaction {
    fn read_from<R: ByteReader + ?Sized>(source: &mut R) -> Result<Self, DeserializationError> {
        let version: TransactionVersion = source.read()?;
        let spends = source.read()?;
        let outputs = source.read()?;
        let mint_count = source.read_len()?;
        let mut mints = Vec::with_capacity(mint_count);
        for _ in 0..mint_count {
            mints.push(Mint::read_from_versioned(source, version)?);
        }
        let burns = source.read()?;
        let fee = source.read_i64()?;
        let expiration = source.read_u32()?;
        let public_key_randomness = source.read_array()?;
        let binding_signature = source.read_array()?;

        Ok(Self {
            version,
            spends,
            outputs,
            mints,
            burns,
            fee,
            expiration,
            public_key_randomness,
            binding_signature,
        })
    }
}

// TESTS
// ================================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::{AssetId, AssetMetadata, AssetName};
    use crate::hash::{MerkleHash, NoteCommitment, Nullifier};
    use crate::keys::PublicAddress;
    use crate::note::NoteCiphertext;
    use crate::{NOTE_CIPHERTEXT_SIZE, PROOF_SIZE};

    fn sample_spend(tag: u8) -> Spend {
        Spend {
            nullifier: Nullifier::new([tag; 32]),
            commitment_root: MerkleHash::new([tag.wrapping_add(1); 32]),
            tree_size: 100,
            proof: [tag; PROOF_SIZE],
            authorizing_signature: [tag; SIGNATURE_SIZE],
        }
    }

    fn sample_output(tag: u8) -> Output {
        Output {
            commitment: NoteCommitment::new([tag; 32]),
            ciphertext: NoteCiphertext([tag; NOTE_CIPHERTEXT_SIZE]),
            ephemeral_public_key: [tag; KEY_LENGTH],
            proof: [tag; PROOF_SIZE],
        }
    }

    fn sample_mint(transfer: Option<PublicAddress>) -> Mint {
        Mint {
            creator: PublicAddress::new([9u8; 32]),
            name: AssetName::from_str_lossy("coin"),
            metadata: AssetMetadata::empty(),
            nonce: 0,
            value: 500,
            transfer_ownership_to: transfer,
            proof: [2u8; PROOF_SIZE],
            authorizing_signature: [3u8; SIGNATURE_SIZE],
        }
    }

    fn sample_transaction(version: TransactionVersion, transfer: Option<PublicAddress>) -> Transaction {
        Transaction::new(
            version,
            vec![sample_spend(1), sample_spend(2)],
            vec![sample_output(3)],
            vec![sample_mint(transfer)],
            vec![Burn { asset_id: AssetId::new([4u8; 32]), value: 7 }],
            10,
            0,
            [5u8; KEY_LENGTH],
            [6u8; SIGNATURE_SIZE],
        )
    }

    #[rstest::rstest]
    #[case::v1(TransactionVersion::V1)]
    #[case::v2(TransactionVersion::V2)]
    fn round_trip(#[case] version: TransactionVersion) {
        let tx = sample_transaction(version, None);
        assert_eq!(Transaction::read_from_bytes(&tx.to_bytes()).unwrap(), tx);
    }

    #[test]
    fn round_trip_v2_with_ownership_transfer() {
        let transfer = Some(PublicAddress::new([8u8; 32]));
        let tx = sample_transaction(TransactionVersion::V2, transfer);
        let decoded = Transaction::read_from_bytes(&tx.to_bytes()).unwrap();
        assert_eq!(decoded.mints()[0].transfer_ownership_to, transfer);
        assert_eq!(decoded, tx);
    }

    #[test]
    fn random_transactions_round_trip() {
        use rand::{Rng, SeedableRng};

        let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(0xf15);
        for _ in 0..50 {
            let spends = (0..rng.random_range(0..4)).map(|_| sample_spend(rng.random())).collect();
            let outputs =
                (0..rng.random_range(0..4)).map(|_| sample_output(rng.random())).collect();
            let tx = Transaction::new(
                if rng.random_bool(0.5) { TransactionVersion::V1 } else { TransactionVersion::V2 },
                spends,
                outputs,
                vec![],
                vec![Burn { asset_id: AssetId::new(rng.random()), value: rng.random() }],
                rng.random(),
                rng.random(),
                rng.random(),
                [rng.random(); SIGNATURE_SIZE],
            );
            assert_eq!(Transaction::read_from_bytes(&tx.to_bytes()).unwrap(), tx);
        }
    }

    #[test]
    fn v1_wire_drops_ownership_transfer() {
        let tx = sample_transaction(TransactionVersion::V1, Some(PublicAddress::new([8u8; 32])));
        let decoded = Transaction::read_from_bytes(&tx.to_bytes()).unwrap();
        assert_eq!(decoded.mints()[0].transfer_ownership_to, None);
    }

    #[test]
    fn unsigned_bytes_exclude_binding_signature() {
        let tx = sample_transaction(TransactionVersion::V2, None);
        let mut other = tx.clone();
        other.binding_signature = [0xffu8; SIGNATURE_SIZE];
        assert_eq!(tx.unsigned_bytes(), other.unsigned_bytes());
        assert_ne!(tx.to_bytes(), other.to_bytes());
    }

    #[test]
    fn expiration_semantics() {
        let mut tx = sample_transaction(TransactionVersion::V2, None);
        tx.expiration = 0;
        assert!(!tx.is_expired_at(Sequence::new(u32::MAX)));
        tx.expiration = 10;
        assert!(!tx.is_expired_at(Sequence::new(9)));
        assert!(tx.is_expired_at(Sequence::new(10)));
        assert!(tx.is_expired_at(Sequence::new(11)));
    }
}
