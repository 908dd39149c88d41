use thiserror::Error;

#[derive(Error, Debug)]
pub enum HouseholdError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Task interval must be between 1 and 2147483647 days, got {0}")]
    InvalidInterval(u32),

    #[error("Role must be between 1 and 9, got {0}")]
    InvalidRole(u32),

    #[error("Unknown ledger kind: {0}")]
    UnknownLedgerKind(String),

    #[error("{0}")]
    Other(String),
}
