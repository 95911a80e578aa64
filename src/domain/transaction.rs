use chrono::{DateTime, Utc};
use serde::Serialize;

use super::Amount;

pub const OPENING_DESCRIPTION: &str = "Account opened";
pub const DEPOSIT_DESCRIPTION: &str = "Deposit";
pub const WITHDRAWAL_DESCRIPTION: &str = "Withdrawal";
pub const INTEREST_DESCRIPTION: &str = "Interest/Charge applied";

/// One balance-affecting event in an account's history.
/// Records are immutable - they are only ever appended, never edited or removed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionRecord {
    description: String,
    /// Signed change: positive = credit, negative = debit
    amount: Amount,
    /// Account balance right after the change was applied
    balance_after: Amount,
    timestamp: DateTime<Utc>,
}

impl TransactionRecord {
    /// Records are created by the account that owns them, while it holds its lock.
    pub(crate) fn new(description: impl Into<String>, amount: Amount, balance_after: Amount) -> Self {
        Self {
            description: description.into(),
            amount,
            balance_after,
            timestamp: Utc::now(),
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }

    pub fn balance_after(&self) -> Amount {
        self.balance_after
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

impl std::fmt::Display for TransactionRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}] {:<24} Amount: {:>10} | Balance: {:>10}",
            self.timestamp.format("%Y-%m-%d %H:%M"),
            self.description,
            super::format_amount(self.amount),
            super::format_amount(self.balance_after)
        )
    }
}

/// Description of the source-side record of a transfer.
pub fn transfer_to_description(destination: super::AccountId) -> String {
    format!("Transfer to #{}", destination)
}

/// Description of the destination-side record of a transfer.
pub fn transfer_from_description(source: super::AccountId) -> String {
    format!("Transfer from #{}", source)
}
