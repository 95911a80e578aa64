use thiserror::Error;

use super::{AccountId, Amount};

/// Errors raised by account and ledger operations.
///
/// All of them are recoverable and reported to the immediate caller; none
/// leaves an account partially modified.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Malformed or missing input (empty owner, same-account transfer, ...).
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Deposit, withdrawal or transfer amount is not strictly positive.
    #[error("Invalid amount: {amount} (must be greater than zero)")]
    InvalidAmount { amount: Amount },

    /// Amount carries more decimal places than the ledger keeps.
    #[error("Invalid amount: {amount} (at most {max_scale} decimal places)")]
    ExcessPrecision { amount: Amount, max_scale: u32 },

    #[error("Insufficient funds in account #{account}: balance {balance}, required {required}")]
    InsufficientFunds {
        account: AccountId,
        balance: Amount,
        required: Amount,
    },
}

impl LedgerError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        LedgerError::InvalidArgument(message.into())
    }
}
