use thiserror::Error;

use crate::{config::ConfigError, ledger::LedgerError};

/// Reasons a call aborts. Nothing a failed call touched is kept.
#[derive(Debug, Error)]
pub enum GameError {
    #[error("Only verified users")]
    UnverifiedCaller,

    #[error("Only to next table")]
    NotNextTable,

    #[error("Already verified")]
    AlreadyVerified,

    #[error("All tables completed")]
    AllTablesCompleted,

    #[error("Invalid table")]
    InvalidTable(usize),

    /// A payout or fee pull failed on the ledger.
    #[error("transfer failed: {0}")]
    TransferFailure(#[from] LedgerError),

    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("state io: {0}")]
    Io(#[from] std::io::Error),

    #[error("state json: {0}")]
    Json(#[from] serde_json::Error),
}

impl GameError {
    /// Short revert reason, as a caller would see it.
    pub fn reason(&self) -> &'static str {
        match self {
            GameError::UnverifiedCaller => "Only verified users",
            GameError::NotNextTable => "Only to next table",
            GameError::AlreadyVerified => "Already verified",
            GameError::AllTablesCompleted => "All tables completed",
            GameError::InvalidTable(_) => "Invalid table",
            GameError::TransferFailure(_) => "Transfer failed",
            GameError::Config(_) => "Invalid configuration",
            GameError::Io(_) | GameError::Json(_) => "State unavailable",
        }
    }
}
