use crate::asset::{AssetMetadata, AssetName};
use crate::keys::PublicAddress;
use crate::serde::{ByteReader, ByteWriter, DeserializationError, Serializable};
use crate::transaction::TransactionVersion;
use crate::{PROOF_SIZE, SIGNATURE_SIZE};

/// Creation of new supply for an asset.
///
/// The asset is identified by its full description rather than an id so that the first mint
/// can create the asset record. Only the asset's current owner may mint; `V2` transactions
/// may simultaneously hand ownership to another address.
#[derive(Clone, PartialEq, Eq)]
pub struct Mint {
    pub creator: PublicAddress,
    pub name: AssetName,
    pub metadata: AssetMetadata,
    pub nonce: u8,
    pub value: u64,
    /// New owner of the asset. Present on the wire only for `V2` and later.
    pub transfer_ownership_to: Option<PublicAddress>,
    pub proof: [u8; PROOF_SIZE],
    /// Signature by the asset owner authorizing the mint.
    pub authorizing_signature: [u8; SIGNATURE_SIZE],
}

impl Mint {
    /// Writes the mint in the layout of the given transaction version.
    ///
    /// An ownership transfer on a `V1` transaction has no wire representation; callers
    /// validate that combination away before serializing.
    pub fn write_into_versioned<W: ByteWriter + ?Sized>(
        &self,
        target: &mut W,
        version: TransactionVersion,
    ) {
        self.creator.write_into(target);
        self.name.write_into(target);
        self.metadata.write_into(target);
        target.write_u8(self.nonce);
        target.write_u64(self.value);
        if version.has_mint_transfer_ownership() {
            self.transfer_ownership_to.write_into(target);
        }
        target.write_bytes(&self.proof);
        target.write_bytes(&self.authorizing_signature);
    }

    pub fn read_from_versioned<R: ByteReader + ?Sized>(
        source: &mut R,
        version: TransactionVersion,
    ) -> Result<Self, DeserializationError> {
        Ok(Self {
            creator: source.read()?,
            name: source.read()?,
            metadata: source.read()?,
            nonce: source.read_u8()?,
            value: source.read_u64()?,
            transfer_ownership_to: if version.has_mint_transfer_ownership() {
                source.read()?
            } else {
                None
            },
            proof: source.read_array()?,
            authorizing_signature: source.read_array()?,
        })
    }
}

impl std::fmt::Debug for Mint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mint")
            .field("creator", &self.creator)
            .field("nonce", &self.nonce)
            .field("value", &self.value)
            .field("transfer_ownership_to", &self.transfer_ownership_to)
            .finish_non_exhaustive()
    }
}

