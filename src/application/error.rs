use thiserror::Error;

use crate::domain::{AccountId, LedgerError};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    #[error("Account not found: #{0}")]
    AccountNotFound(AccountId),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl AppError {
    pub fn is_insufficient_funds(&self) -> bool {
        matches!(self, AppError::Ledger(LedgerError::InsufficientFunds { .. }))
    }
}
