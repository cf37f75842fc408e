use blake2::{Blake2s256, Digest};
use ironfish_protocol::asset::{AssetId, AssetMetadata, AssetName};
use ironfish_protocol::errors::ProviderError;
use ironfish_protocol::hash::{MerkleHash, NoteCommitment, Nullifier, TransactionHash};
use ironfish_protocol::keys::{
    AccountKeys,
    IncomingViewKey,
    OutgoingViewKey,
    PublicAddress,
    SpendingKey,
    ViewKey,
};
use ironfish_protocol::note::{NOTE_CIPHERTEXT_SIZE, NoteCiphertext, NotePlaintext};
use ironfish_protocol::provider::{CryptoProvider, RawTransaction};
use ironfish_protocol::serde::{Deserializable, Serializable};
use ironfish_protocol::transaction::{
    Burn,
    Mint,
    Output,
    Spend,
    Transaction,
};
use ironfish_protocol::{PROOF_SIZE, SIGNATURE_SIZE};

/// Masks tying incoming and outgoing view keys to the address they serve. Invertible on
/// purpose: both decryption directions recover the address from the key alone.
const IVK_MASK: u8 = 0x55;
const OVK_MASK: u8 = 0xaa;

/// A deterministic stand-in for the Sapling proving stack.
///
/// Proofs and signatures are keyed hashes of the data they commit to, so every
/// verification path in the node is exercised for real: tampering with any committed field
/// makes the corresponding check fail. Nothing here is zero-knowledge; it exists so chain,
/// mempool and wallet semantics can be tested without circuits.
#[derive(Debug, Default, Clone, Copy)]
pub struct TestCryptoProvider;

impl TestCryptoProvider {
    pub fn new() -> Self {
        Self
    }

    fn digest(domain: &str, parts: &[&[u8]]) -> [u8; 32] {
        let mut hasher = blake3::Hasher::new();
        hasher.update(domain.as_bytes());
        for part in parts {
            hasher.update(part);
        }
        *hasher.finalize().as_bytes()
    }

    fn stretch<const N: usize>(domain: &str, parts: &[&[u8]]) -> [u8; N] {
        let mut hasher = blake3::Hasher::new();
        hasher.update(domain.as_bytes());
        for part in parts {
            hasher.update(part);
        }
        let mut out = [0u8; N];
        hasher.finalize_xof().fill(&mut out);
        out
    }

    fn address_of(key_bytes: &[u8; 32], mask: u8) -> PublicAddress {
        let mut addr = [0u8; 32];
        for (i, byte) in addr.iter_mut().enumerate() {
            *byte = key_bytes[i] ^ mask;
        }
        PublicAddress::new(addr)
    }

    fn keys_from_spending_key(&self, spending_key: SpendingKey) -> AccountKeys {
        let address = PublicAddress::new(Self::digest("addr", &[spending_key.as_bytes()]));
        let mut view = [0u8; 64];
        view[..32].copy_from_slice(address.as_bytes());
        view[32..].copy_from_slice(&Self::digest("nk", &[spending_key.as_bytes()]));

        let mut ivk = [0u8; 32];
        let mut ovk = [0u8; 32];
        for i in 0..32 {
            ivk[i] = address.as_bytes()[i] ^ IVK_MASK;
            ovk[i] = address.as_bytes()[i] ^ OVK_MASK;
        }

        AccountKeys {
            spending_key: Some(spending_key),
            view_key: ViewKey::new(view),
            incoming_view_key: IncomingViewKey::new(ivk),
            outgoing_view_key: OutgoingViewKey::new(ovk),
            public_address: address,
        }
    }

    fn encrypt_note(note: &NotePlaintext) -> NoteCiphertext {
        let plaintext = note.to_bytes();
        let mut ciphertext = [0u8; NOTE_CIPHERTEXT_SIZE];
        ciphertext[..32].copy_from_slice(note.owner.as_bytes());

        let stream: [u8; NOTE_CIPHERTEXT_SIZE] =
            Self::stretch("note-stream", &[note.owner.as_bytes()]);
        for (i, byte) in plaintext.iter().enumerate() {
            ciphertext[32 + i] = byte ^ stream[i];
        }
        NoteCiphertext(ciphertext)
    }

    fn decrypt_note(ciphertext: &NoteCiphertext) -> Option<NotePlaintext> {
        let owner: [u8; 32] = ciphertext.0[..32].try_into().expect("prefix is 32 bytes");
        let stream: [u8; NOTE_CIPHERTEXT_SIZE] = Self::stretch("note-stream", &[&owner]);
        let mut plaintext = vec![0u8; NOTE_CIPHERTEXT_SIZE - 32];
        for (i, byte) in plaintext.iter_mut().enumerate() {
            *byte = ciphertext.0[32 + i] ^ stream[i];
        }
        let note = NotePlaintext::read_from_bytes(&plaintext).ok()?;
        (note.owner.as_bytes() == &owner).then_some(note)
    }

    fn spend_proof(nullifier: &Nullifier, root: &MerkleHash, tree_size: u64) -> [u8; PROOF_SIZE] {
        Self::stretch(
            "spend-proof",
            &[nullifier.as_bytes(), root.as_bytes(), &tree_size.to_le_bytes()],
        )
    }

    fn spend_signature(nullifier: &Nullifier) -> [u8; SIGNATURE_SIZE] {
        Self::stretch("spend-sig", &[nullifier.as_bytes()])
    }

    fn output_proof(commitment: &NoteCommitment) -> [u8; PROOF_SIZE] {
        Self::stretch("output-proof", &[commitment.as_bytes()])
    }

    fn mint_signature(mint: &Mint, signer: &PublicAddress) -> [u8; SIGNATURE_SIZE] {
        let transfer = mint
            .transfer_ownership_to
            .map(|address| *address.as_bytes())
            .unwrap_or([0u8; 32]);
        Self::stretch(
            "mint-sig",
            &[
                mint.creator.as_bytes(),
                mint.name.as_bytes(),
                mint.metadata.as_bytes(),
                &[mint.nonce],
                &mint.value.to_le_bytes(),
                &transfer,
                signer.as_bytes(),
            ],
        )
    }

    fn binding_signature(unsigned: &[u8]) -> [u8; SIGNATURE_SIZE] {
        Self::stretch("binding", &[unsigned])
    }
}

impl CryptoProvider for TestCryptoProvider {
    // HASHING
    // --------------------------------------------------------------------------------------------

    fn hash_header(&self, bytes: &[u8]) -> [u8; 32] {
        Self::digest("header", &[bytes])
    }

    fn hash_transaction(&self, bytes: &[u8]) -> [u8; 32] {
        Self::digest("transaction", &[bytes])
    }

    fn transaction_commitment(&self, hashes: &[TransactionHash]) -> MerkleHash {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"tx-commitment");
        for hash in hashes {
            hasher.update(hash.as_bytes());
        }
        MerkleHash::new(*hasher.finalize().as_bytes())
    }

    fn merkle_node(&self, depth: u8, left: &MerkleHash, right: &MerkleHash) -> MerkleHash {
        let mut hasher = Blake2s256::new();
        hasher.update([depth]);
        hasher.update(left.as_bytes());
        hasher.update(right.as_bytes());
        MerkleHash::new(hasher.finalize().into())
    }

    fn note_commitment(&self, note: &NotePlaintext) -> NoteCommitment {
        let mut hasher = Blake2s256::new();
        hasher.update(b"note-commitment");
        hasher.update(&note.to_bytes());
        NoteCommitment::new(hasher.finalize().into())
    }

    fn nullifier(
        &self,
        view_key: &ViewKey,
        commitment: &NoteCommitment,
        position: u64,
    ) -> Nullifier {
        Nullifier::new(Self::digest(
            "nullifier",
            &[view_key.as_bytes(), commitment.as_bytes(), &position.to_le_bytes()],
        ))
    }

    fn asset_id(
        &self,
        creator: &PublicAddress,
        name: &AssetName,
        metadata: &AssetMetadata,
        nonce: u8,
    ) -> AssetId {
        AssetId::new(Self::digest(
            "asset-id",
            &[creator.as_bytes(), name.as_bytes(), metadata.as_bytes(), &[nonce]],
        ))
    }

    // VERIFICATION
    // --------------------------------------------------------------------------------------------

    fn verify_spend(&self, spend: &Spend, _unsigned_tx_bytes: &[u8]) -> bool {
        spend.proof
            == Self::spend_proof(&spend.nullifier, &spend.commitment_root, spend.tree_size)
            && spend.authorizing_signature == Self::spend_signature(&spend.nullifier)
    }

    fn verify_output(&self, output: &Output) -> bool {
        output.proof == Self::output_proof(&output.commitment)
    }

    fn verify_mint(&self, mint: &Mint, owner: &PublicAddress, _unsigned_tx_bytes: &[u8]) -> bool {
        mint.authorizing_signature == Self::mint_signature(mint, owner)
    }

    fn verify_burn(&self, _burn: &Burn) -> bool {
        true
    }

    fn verify_binding(&self, transaction: &Transaction) -> bool {
        *transaction.binding_signature()
            == Self::binding_signature(&transaction.unsigned_bytes())
    }

    // WALLET OPERATIONS
    // --------------------------------------------------------------------------------------------

    fn post(
        &self,
        raw: &RawTransaction,
        spending_key: &SpendingKey,
    ) -> Result<Transaction, ProviderError> {
        let keys = self.keys_from_spending_key(*spending_key);

        let mut spends = Vec::with_capacity(raw.spends.len());
        for raw_spend in &raw.spends {
            if raw_spend.note.owner != keys.public_address {
                return Err(ProviderError::WrongSpendingKey);
            }
            let commitment = self.note_commitment(&raw_spend.note);
            let nullifier = self.nullifier(&keys.view_key, &commitment, raw_spend.position);
            spends.push(Spend {
                nullifier,
                commitment_root: raw_spend.root,
                tree_size: raw_spend.tree_size,
                proof: Self::spend_proof(&nullifier, &raw_spend.root, raw_spend.tree_size),
                authorizing_signature: Self::spend_signature(&nullifier),
            });
        }

        let mut outputs = Vec::with_capacity(raw.outputs.len());
        for raw_output in &raw.outputs {
            let commitment = self.note_commitment(&raw_output.note);
            outputs.push(Output {
                commitment,
                ciphertext: Self::encrypt_note(&raw_output.note),
                ephemeral_public_key: Self::stretch("epk", &[commitment.as_bytes()]),
                proof: Self::output_proof(&commitment),
            });
        }

        let mut mints = Vec::with_capacity(raw.mints.len());
        for raw_mint in &raw.mints {
            let mut mint = Mint {
                creator: raw_mint.creator,
                name: raw_mint.name,
                metadata: raw_mint.metadata,
                nonce: raw_mint.nonce,
                value: raw_mint.value,
                transfer_ownership_to: raw_mint.transfer_ownership_to,
                proof: [0u8; PROOF_SIZE],
                authorizing_signature: [0u8; SIGNATURE_SIZE],
            };
            mint.proof = Self::stretch("mint-proof", &[mint.creator.as_bytes(), &[mint.nonce]]);
            mint.authorizing_signature = Self::mint_signature(&mint, &keys.public_address);
            mints.push(mint);
        }

        let mut transaction = Transaction::new(
            raw.version,
            spends,
            outputs,
            mints,
            raw.burns.clone(),
            raw.fee,
            raw.expiration,
            Self::digest("pk-randomness", &[spending_key.as_bytes()]),
            [0u8; SIGNATURE_SIZE],
        );
        let binding = Self::binding_signature(&transaction.unsigned_bytes());
        transaction = Transaction::new(
            transaction.version(),
            transaction.spends().to_vec(),
            transaction.outputs().to_vec(),
            transaction.mints().to_vec(),
            transaction.burns().to_vec(),
            transaction.fee(),
            transaction.expiration(),
            *transaction.public_key_randomness(),
            binding,
        );
        Ok(transaction)
    }

    fn decrypt_note_for_owner(
        &self,
        ciphertext: &NoteCiphertext,
        incoming_view_key: &IncomingViewKey,
    ) -> Option<NotePlaintext> {
        let address = Self::address_of(incoming_view_key.as_bytes(), IVK_MASK);
        let note = Self::decrypt_note(ciphertext)?;
        (note.owner == address).then_some(note)
    }

    fn decrypt_note_for_spender(
        &self,
        ciphertext: &NoteCiphertext,
        outgoing_view_key: &OutgoingViewKey,
    ) -> Option<NotePlaintext> {
        let address = Self::address_of(outgoing_view_key.as_bytes(), OVK_MASK);
        let note = Self::decrypt_note(ciphertext)?;
        (note.sender == address).then_some(note)
    }

    fn derive_account(&self, seed: &[u8]) -> AccountKeys {
        let spending_key = SpendingKey::new(Self::digest("spending-key", &[seed]));
        self.keys_from_spending_key(spending_key)
    }

    // SEALING
    // --------------------------------------------------------------------------------------------

    fn derive_master_key(&self, passphrase: &str, salt: &[u8; 32]) -> [u8; 32] {
        Self::digest("master-key", &[passphrase.as_bytes(), salt])
    }

    fn seal(&self, key: &[u8; 32], plaintext: &[u8]) -> Vec<u8> {
        let tag = Self::digest("seal-tag", &[key, plaintext]);
        let mut out = Vec::with_capacity(32 + plaintext.len());
        out.extend_from_slice(&tag);

        let mut hasher = blake3::Hasher::new();
        hasher.update(b"seal-stream");
        hasher.update(key);
        let mut stream = vec![0u8; plaintext.len()];
        hasher.finalize_xof().fill(&mut stream);
        for (i, byte) in plaintext.iter().enumerate() {
            out.push(byte ^ stream[i]);
        }
        out
    }

    fn unseal(&self, key: &[u8; 32], ciphertext: &[u8]) -> Result<Vec<u8>, ProviderError> {
        if ciphertext.len() < 32 {
            return Err(ProviderError::UnsealFailed);
        }
        let (tag, body) = ciphertext.split_at(32);

        let mut hasher = blake3::Hasher::new();
        hasher.update(b"seal-stream");
        hasher.update(key);
        let mut stream = vec![0u8; body.len()];
        hasher.finalize_xof().fill(&mut stream);

        let plaintext: Vec<u8> =
            body.iter().enumerate().map(|(i, byte)| byte ^ stream[i]).collect();
        if Self::digest("seal-tag", &[key, &plaintext]) != *tag {
            return Err(ProviderError::UnsealFailed);
        }
        Ok(plaintext)
    }
}

// TESTS
// ================================================================================================

#[cfg(test)]
mod tests {
    use ironfish_protocol::note::Memo;

    use super::*;

    #[test]
    fn note_encryption_round_trips_for_owner() {
        let provider = TestCryptoProvider::new();
        let owner = provider.derive_account(b"owner");
        let sender = provider.derive_account(b"sender");

        let note = NotePlaintext {
            owner: owner.public_address,
            value: 1234,
            memo: Memo::from_str_lossy("hi"),
            asset_id: AssetId::NATIVE,
            sender: sender.public_address,
        };
        let ciphertext = TestCryptoProvider::encrypt_note(&note);

        assert_eq!(
            provider.decrypt_note_for_owner(&ciphertext, &owner.incoming_view_key),
            Some(note.clone())
        );
        assert_eq!(
            provider.decrypt_note_for_spender(&ciphertext, &sender.outgoing_view_key),
            Some(note.clone())
        );
        // the wrong keys see nothing
        assert_eq!(provider.decrypt_note_for_owner(&ciphertext, &sender.incoming_view_key), None);
        assert_eq!(provider.decrypt_note_for_spender(&ciphertext, &owner.outgoing_view_key), None);
    }

    #[test]
    fn sealing_detects_wrong_key() {
        let provider = TestCryptoProvider::new();
        let key_a = provider.derive_master_key("a", &[1u8; 32]);
        let key_b = provider.derive_master_key("b", &[1u8; 32]);

        let sealed = provider.seal(&key_a, b"secret");
        assert_eq!(provider.unseal(&key_a, &sealed).unwrap(), b"secret");
        assert!(provider.unseal(&key_b, &sealed).is_err());
    }

    #[test]
    fn tampered_proofs_fail_verification() {
        let provider = TestCryptoProvider::new();
        let keys = provider.derive_account(b"seed");
        let spending_key = keys.spending_key.unwrap();

        let note = NotePlaintext {
            owner: keys.public_address,
            value: 5,
            memo: Memo::default(),
            asset_id: AssetId::NATIVE,
            sender: keys.public_address,
        };
        let raw = RawTransaction {
            version: ironfish_protocol::transaction::TransactionVersion::V2,
            spends: vec![],
            outputs: vec![ironfish_protocol::provider::RawOutput { note }],
            mints: vec![],
            burns: vec![],
            fee: 1,
            expiration: 0,
        };
        let posted = provider.post(&raw, &spending_key).unwrap();
        assert!(provider.verify_binding(&posted));
        assert!(provider.verify_output(&posted.outputs()[0]));

        let mut tampered = posted.outputs()[0].clone();
        tampered.commitment = NoteCommitment::new([0xee; 32]);
        assert!(!provider.verify_output(&tampered));
    }
}
