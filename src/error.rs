use rust_decimal::Decimal;
use thiserror::Error;

/// Errors surfaced by the ledger core. The core never aborts the process;
/// every failure is returned to the caller and mapped to a user-facing
/// message at the CLI/REST boundary.
#[derive(Error, Debug)]
pub enum ChainError {
    #[error("panel {0} is already registered")]
    PanelAlreadyRegistered(String),

    #[error("panel {0} is not registered")]
    PanelUnknown(String),

    #[error("invalid panel record: {0}")]
    InvalidPanel(String),

    #[error("invalid transaction: {0}")]
    InvalidTransaction(String),

    #[error("insufficient balance for {owner}: have {balance}, need {amount}")]
    InsufficientBalance {
        owner: String,
        balance: Decimal,
        amount: Decimal,
    },

    #[error("nothing to mine: pending pool is empty")]
    EmptyPending,

    #[error("chain tip moved while mining; block discarded")]
    StaleTip,

    #[error("chain invalid at block {index}: {reason}")]
    ChainInvalid { index: u64, reason: String },

    #[error("mining cancelled")]
    MiningCancelled,

    #[error("unknown contract: {0}")]
    UnknownContract(String),

    #[error("contract execution failed: {0}")]
    ContractFailed(String),

    #[error("snapshot corrupt: {0}")]
    SnapshotCorrupt(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ChainError {
    /// Whether the error is the caller's fault (CLI exit code 1) as opposed
    /// to an internal failure (exit code 2).
    pub fn is_user_error(&self) -> bool {
        !matches!(
            self,
            ChainError::Io(_) | ChainError::SnapshotCorrupt(_) | ChainError::ChainInvalid { .. }
        )
    }
}
