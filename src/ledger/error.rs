use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("ledger backend error: {0}")]
    Backend(#[from] fjall::Error),

    #[error("failed to encode record: {0}")]
    Encode(#[from] serde_json::Error),

    /// Stored bytes under `key` no longer decode into the expected record
    #[error("corrupt record {key}: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("unexpected key in ledger: {0}")]
    InvalidKey(String),

    #[error("ledger directory: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, LedgerError>;
