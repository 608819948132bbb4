use thiserror::Error;

use crate::ledger::LedgerError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("task not found")]
    TaskNotFound(String),

    #[error("resolve result not found")]
    ResolveNotFound(String),

    #[error("invalid request url: {0}")]
    InvalidUrl(String),

    #[error("unsupported protocol: {0}")]
    UnsupportedProtocol(String),

    #[error("storage error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
