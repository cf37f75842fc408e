use std::fmt;
use std::str::FromStr;

use crate::errors::HexParseError;
use crate::serde::{
    ByteReader,
    ByteWriter,
    Deserializable,
    DeserializationError,
    Serializable,
};

/// Declares a fixed-width secret or address newtype with hex formatting.
macro_rules! key_newtype {
    ($(#[$doc:meta])* $name:ident, $size:expr) => {
        $(#[$doc])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name([u8; $size]);

        impl $name {
            pub const SIZE: usize = $size;

            pub const fn new(bytes: [u8; $size]) -> Self {
                Self(bytes)
            }

            pub const fn as_bytes(&self) -> &[u8; $size] {
                &self.0
            }

            pub fn to_hex(&self) -> String {
                hex::encode(self.0)
            }

            pub fn from_hex(value: &str) -> Result<Self, HexParseError> {
                let bytes = hex::decode(value).map_err(HexParseError::Invalid)?;
                let bytes: [u8; $size] = bytes
                    .try_into()
                    .map_err(|bytes: Vec<u8>| HexParseError::WrongLength(bytes.len()))?;
                Ok(Self(bytes))
            }
        }

        impl From<[u8; $size]> for $name {
            fn from(bytes: [u8; $size]) -> Self {
                Self(bytes)
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.to_hex())
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.to_hex())
            }
        }

        impl FromStr for $name {
            type Err = HexParseError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                Self::from_hex(value)
            }
        }

        impl Serializable for $name {
            fn write_into<W: ByteWriter + ?Sized>(&self, target: &mut W) {
                target.write_bytes(&self.0);
            }
        }

        impl Deserializable for $name {
            fn read_from<R: ByteReader + ?Sized>(
                source: &mut R,
            ) -> Result<Self, DeserializationError> {
                Ok(Self(source.read_array()?))
            }
        }
    };
}

key_newtype!(
    /// The key authorizing spends from an account. Never leaves the wallet.
    SpendingKey,
    32
);

key_newtype!(
    /// The full view key: authorizes viewing both incoming and outgoing activity.
    ViewKey,
    64
);

key_newtype!(
    /// The key under which received notes decrypt.
    IncomingViewKey,
    32
);

key_newtype!(
    /// The key under which an account's own sent outputs decrypt.
    OutgoingViewKey,
    32
);

key_newtype!(
    /// The shielded payment address notes are addressed to. The raw form is 32 bytes; the
    /// human-readable rendering is [`crate::PUBLIC_ADDRESS_LENGTH`] characters.
    PublicAddress,
    32
);

/// The key material of one account, as produced by [`crate::CryptoProvider::derive_account`].
///
/// `spending_key` is `None` for view-only accounts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountKeys {
    pub spending_key: Option<SpendingKey>,
    pub view_key: ViewKey,
    pub incoming_view_key: IncomingViewKey,
    pub outgoing_view_key: OutgoingViewKey,
    pub public_address: PublicAddress,
}

impl Serializable for AccountKeys {
    fn write_into<W: ByteWriter + ?Sized>(&self, target: &mut W) {
        self.spending_key.write_into(target);
        self.view_key.write_into(target);
        self.incoming_view_key.write_into(target);
        self.outgoing_view_key.write_into(target);
        self.public_address.write_into(target);
    }
}

impl Deserializable for AccountKeys {
    fn read_from<R: ByteReader + ?Sized>(source: &mut R) -> Result<Self, DeserializationError> {
        Ok(Self {
            spending_key: source.read()?,
            view_key: source.read()?,
            incoming_view_key: source.read()?,
            outgoing_view_key: source.read()?,
            public_address: source.read()?,
        })
    }
}
