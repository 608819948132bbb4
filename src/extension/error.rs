use thiserror::Error;

use crate::ledger::LedgerError;

#[derive(Debug, Error)]
pub enum ExtensionError {
    #[error("extension not found")]
    NotFound(String),

    #[error("invalid extension manifest: {0}")]
    InvalidManifest(String),

    #[error("extension is updating: {0}")]
    Updating(String),

    #[error("failed to fetch extension: {0}")]
    Fetch(String),

    #[error("failed to read extension: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid extension manifest: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("storage error: {0}")]
    Ledger(#[from] LedgerError),
}

pub type Result<T> = std::result::Result<T, ExtensionError>;
