use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("key not found")]
    NotFound,

    #[error("database corruption: {0}")]
    Corruption(String),

    #[error("database schema version {found} is newer than the supported version {supported}")]
    SchemaTooNew { found: u32, supported: u32 },

    #[error("migration {number} failed")]
    MigrationFailed {
        number: u32,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },

    #[error("a passphrase is required to open this database")]
    PassphraseRequired,

    #[error("the provided passphrase does not match")]
    WrongPassphrase,

    #[error("write attempted inside a read-only transaction")]
    ReadOnlyTransaction,
}

impl StorageError {
    /// Wraps a decode failure. A value that no longer decodes under its store's codec is
    /// corruption, not a recoverable condition.
    pub fn corrupt(context: impl std::fmt::Display) -> Self {
        Self::Corruption(context.to_string())
    }
}
