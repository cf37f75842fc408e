use ironfish_protocol::keys::AccountKeys;
use ironfish_protocol::serde::{
    ByteReader,
    ByteWriter,
    Deserializable,
    DeserializationError,
    Serializable,
};

/// One wallet account: a name, its key material, and scanning preferences.
///
/// Accounts holding only view keys can decrypt and track activity but not sign spends.
/// Multisig key packages are carried opaquely; the signing protocol itself lives outside
/// the node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: u32,
    pub name: String,
    pub keys: AccountKeys,
    /// Opaque serialized multisig key material, if this account participates in one.
    pub multisig_keys: Option<Vec<u8>>,
    /// Disabled accounts keep their data but are skipped by the scanner.
    pub scanning_enabled: bool,
}

impl Account {
    pub fn is_view_only(&self) -> bool {
        self.keys.spending_key.is_none()
    }
}

impl Serializable for Account {
    fn write_into<W: ByteWriter + ?Sized>(&self, target: &mut W) {
        target.write_u32(self.id);
        self.name.write_into(target);
        self.keys.write_into(target);
        self.multisig_keys.write_into(target);
        self.scanning_enabled.write_into(target);
    }
}

impl Deserializable for Account {
    fn read_from<R: ByteReader + ?Sized>(source: &mut R) -> Result<Self, DeserializationError> {
        Ok(Self {
            id: source.read_u32()?,
            name: source.read()?,
            keys: source.read()?,
            multisig_keys: source.read()?,
            scanning_enabled: source.read()?,
        })
    }
}

// STORED ACCOUNT
// ================================================================================================

/// The at-rest envelope of an account record: plaintext, or sealed under the wallet's
/// master key when a passphrase is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredAccount {
    Plain(Account),
    Sealed(Vec<u8>),
}

impl Serializable for StoredAccount {
    fn write_into<W: ByteWriter + ?Sized>(&self, target: &mut W) {
        match self {
            Self::Plain(account) => {
                target.write_u8(0);
                account.write_into(target);
            },
            Self::Sealed(bytes) => {
                target.write_u8(1);
                target.write_len(bytes.len());
                target.write_bytes(bytes);
            },
        }
    }
}

impl Deserializable for StoredAccount {
    fn read_from<R: ByteReader + ?Sized>(source: &mut R) -> Result<Self, DeserializationError> {
        match source.read_u8()? {
            0 => Ok(Self::Plain(source.read()?)),
            1 => {
                let len = source.read_len()?;
                Ok(Self::Sealed(source.read_slice(len)?.to_vec()))
            },
            other => {
                Err(DeserializationError::InvalidValue(format!("invalid account envelope tag {other}")))
            },
        }
    }
}

// TESTS
// ================================================================================================
