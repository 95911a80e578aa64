use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::transaction::{
    DEPOSIT_DESCRIPTION, OPENING_DESCRIPTION, TransactionRecord, WITHDRAWAL_DESCRIPTION,
};
use super::{Amount, LedgerError, check_precision, format_amount};

/// Process-unique account identity, assigned by the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(u64);

impl AccountId {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

impl std::str::FromStr for AccountId {
    type Err = String;

    /// Accepts "7" as well as "#7", the form used in transfer records.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.trim().trim_start_matches('#');
        digits
            .parse::<u64>()
            .map(AccountId)
            .map_err(|_| format!("invalid account id '{}'", s.trim()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    /// Day-to-day account, charged a maintenance fee
    Checking,
    /// Interest-bearing account
    Savings,
}

impl AccountKind {
    pub const ALL: [AccountKind; 2] = [AccountKind::Checking, AccountKind::Savings];

    pub fn as_str(&self) -> &'static str {
        match self {
            AccountKind::Checking => "checking",
            AccountKind::Savings => "savings",
        }
    }
}

impl std::fmt::Display for AccountKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for AccountKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // "1" and "2" are the menu codes of the interactive prompt.
        match s.trim().to_lowercase().as_str() {
            "checking" | "1" => Ok(AccountKind::Checking),
            "savings" | "2" => Ok(AccountKind::Savings),
            other => Err(format!(
                "unknown account kind '{}' (expected checking or savings)",
                other
            )),
        }
    }
}

#[derive(Debug)]
struct AccountState {
    balance: Amount,
    history: Vec<TransactionRecord>,
}

/// A named holder of a balance and its transaction history.
///
/// Balance and history live behind a single mutex, so every operation on the
/// same account is mutually exclusive while independent accounts never
/// contend. The balance never goes below zero and the history is append-only.
#[derive(Debug)]
pub struct Account {
    id: AccountId,
    owner: String,
    kind: AccountKind,
    opened_at: DateTime<Utc>,
    state: Mutex<AccountState>,
}

impl Account {
    /// Open an account. Only the ledger calls this, so it alone hands out ids.
    /// A negative initial balance is clamped to zero. The ledger has already
    /// checked its precision.
    pub(crate) fn open(
        id: AccountId,
        owner: String,
        kind: AccountKind,
        initial_balance: Amount,
    ) -> Self {
        let balance = initial_balance.normalize().max(Decimal::ZERO);
        let opening = TransactionRecord::new(OPENING_DESCRIPTION, balance, balance);

        Self {
            id,
            owner,
            kind,
            opened_at: opening.timestamp(),
            state: Mutex::new(AccountState {
                balance,
                history: vec![opening],
            }),
        }
    }

    pub fn id(&self) -> AccountId {
        self.id
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn kind(&self) -> AccountKind {
        self.kind
    }

    pub fn opened_at(&self) -> DateTime<Utc> {
        self.opened_at
    }

    /// Enter this account's mutual-exclusion scope.
    ///
    /// The lock is not reentrant: never call `lock` (or any method below that
    /// takes it) on the same account while a guard for it is alive. A poisoned
    /// lock is recovered, since every mutation completes before anything
    /// that could panic.
    pub fn lock(&self) -> AccountGuard<'_> {
        AccountGuard {
            id: self.id,
            state: self.state.lock().unwrap_or_else(PoisonError::into_inner),
        }
    }

    /// Deposit a positive amount. Returns the new balance.
    pub fn deposit(&self, amount: Amount) -> Result<Amount, LedgerError> {
        self.lock().deposit(amount)
    }

    /// Withdraw a positive amount no larger than the balance. Returns the new balance.
    pub fn withdraw(&self, amount: Amount) -> Result<Amount, LedgerError> {
        self.lock().withdraw(amount)
    }

    /// Log a balance change that was already applied elsewhere.
    pub fn record_adjustment(&self, description: impl Into<String>, amount: Amount) {
        self.lock().record_adjustment(description, amount);
    }

    pub fn balance(&self) -> Amount {
        self.lock().balance()
    }

    /// Snapshot of the full history, oldest first.
    pub fn history(&self) -> Vec<TransactionRecord> {
        self.lock().history().to_vec()
    }
}

impl std::fmt::Display for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ID:{} - {} ({}) - Balance: {}",
            self.id,
            self.owner,
            self.kind,
            format_amount(self.balance())
        )
    }
}

/// Proof of holding an account's lock.
///
/// Multi-step operations (transfers, interest) run entirely under one guard,
/// so no other caller can observe them half-applied.
pub struct AccountGuard<'a> {
    id: AccountId,
    state: MutexGuard<'a, AccountState>,
}

impl AccountGuard<'_> {
    pub fn id(&self) -> AccountId {
        self.id
    }

    pub fn balance(&self) -> Amount {
        self.state.balance
    }

    pub fn history(&self) -> &[TransactionRecord] {
        &self.state.history
    }

    pub fn deposit(&mut self, amount: Amount) -> Result<Amount, LedgerError> {
        let amount = validate_amount(amount)?;
        let balance = self.credit(amount)?;
        self.push(DEPOSIT_DESCRIPTION, amount);
        tracing::debug!(account = %self.id, amount = %amount, balance = %balance, "deposit");
        Ok(balance)
    }

    pub fn withdraw(&mut self, amount: Amount) -> Result<Amount, LedgerError> {
        let amount = validate_amount(amount)?;
        let balance = self.debit(amount)?;
        self.push(WITHDRAWAL_DESCRIPTION, -amount);
        tracing::debug!(account = %self.id, amount = %amount, balance = %balance, "withdrawal");
        Ok(balance)
    }

    pub fn record_adjustment(&mut self, description: impl Into<String>, amount: Amount) {
        self.push(description, amount.normalize());
    }

    /// Add funds without writing a history record. Callers log the change
    /// themselves with `record_adjustment` before releasing the guard.
    pub(crate) fn credit(&mut self, amount: Amount) -> Result<Amount, LedgerError> {
        let amount = validate_amount(amount)?;
        let balance = self
            .state
            .balance
            .checked_add(amount)
            .ok_or(LedgerError::InvalidAmount { amount })?;
        self.state.balance = balance;
        Ok(balance)
    }

    /// Remove funds without writing a history record. Fails without touching
    /// the balance if it would go negative.
    pub(crate) fn debit(&mut self, amount: Amount) -> Result<Amount, LedgerError> {
        let amount = validate_amount(amount)?;
        if amount > self.state.balance {
            return Err(LedgerError::InsufficientFunds {
                account: self.id,
                balance: self.state.balance,
                required: amount,
            });
        }
        self.state.balance -= amount;
        Ok(self.state.balance)
    }

    fn push(&mut self, description: impl Into<String>, amount: Amount) {
        let record = TransactionRecord::new(description, amount, self.state.balance);
        self.state.history.push(record);
    }
}

fn validate_amount(amount: Amount) -> Result<Amount, LedgerError> {
    if amount <= Decimal::ZERO {
        return Err(LedgerError::InvalidAmount { amount });
    }
    check_precision(amount)
}
