use thiserror::Error;

// HEX PARSE ERROR
// ================================================================================================

#[derive(Debug, Error)]
pub enum HexParseError {
    #[error("invalid hex string")]
    Invalid(#[source] hex::FromHexError),
    #[error("decoded {0} bytes where a different width was required")]
    WrongLength(usize),
}

// PROVIDER ERROR
// ================================================================================================

/// Failure inside a [`crate::CryptoProvider`] operation that produces data (as opposed to
/// the boolean verification predicates).
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("spending key does not match the notes being spent")]
    WrongSpendingKey,
    #[error("raw transaction is malformed: {0}")]
    MalformedTransaction(String),
    #[error("ciphertext failed authentication")]
    UnsealFailed,
}
