use std::sync::Arc;

use crate::domain::{Account, AccountId, AccountKind, Amount, LedgerError, TransactionRecord};
use crate::storage::Ledger;

use super::{
    AppError, IntegrityReport, InterestOutcome, InterestPolicy, InterestService, LedgerSummary,
    TransferReceipt, TransferService, build_integrity_report, build_summary,
};

/// Application service providing identity-based operations over the ledger.
/// This is the primary interface for any client (shell, tests, embedders).
///
/// It is `Sync`: share it behind an `Arc` and call it from as many threads or
/// tasks as needed.
#[derive(Debug, Default)]
pub struct BankService {
    ledger: Ledger,
    transfers: TransferService,
    interest: InterestService,
}

/// Result of one account's accrual in a batch run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterestRun {
    pub account: AccountId,
    pub result: Result<InterestOutcome, LedgerError>,
}

impl BankService {
    /// Create a service over an empty ledger.
    pub fn new(policy: InterestPolicy) -> Self {
        Self {
            ledger: Ledger::new(),
            transfers: TransferService::new(),
            interest: InterestService::new(policy),
        }
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn interest_policy(&self) -> &InterestPolicy {
        self.interest.policy()
    }

    // ========================
    // Account operations
    // ========================

    /// Open a new account.
    pub fn open_account(
        &self,
        owner: &str,
        kind: AccountKind,
        initial_balance: Amount,
    ) -> Result<Arc<Account>, AppError> {
        Ok(self.ledger.create_account(owner, kind, initial_balance)?)
    }

    /// Get an account by id.
    pub fn account(&self, id: AccountId) -> Result<Arc<Account>, AppError> {
        self.ledger
            .find_account(id)
            .ok_or(AppError::AccountNotFound(id))
    }

    /// List all accounts in creation order.
    pub fn accounts(&self) -> Vec<Arc<Account>> {
        self.ledger.list_accounts()
    }

    pub fn balance(&self, id: AccountId) -> Result<Amount, AppError> {
        Ok(self.account(id)?.balance())
    }

    pub fn history(&self, id: AccountId) -> Result<Vec<TransactionRecord>, AppError> {
        Ok(self.account(id)?.history())
    }

    /// Deposit into an account. Returns the new balance.
    pub fn deposit(&self, id: AccountId, amount: Amount) -> Result<Amount, AppError> {
        Ok(self.account(id)?.deposit(amount)?)
    }

    /// Withdraw from an account. Returns the new balance.
    pub fn withdraw(&self, id: AccountId, amount: Amount) -> Result<Amount, AppError> {
        Ok(self.account(id)?.withdraw(amount)?)
    }

    // ========================
    // Transfer operations
    // ========================

    /// Transfer between two accounts by id.
    ///
    /// An unknown endpoint is an invalid argument of the transfer itself,
    /// not a lookup failure.
    pub fn transfer(
        &self,
        from: AccountId,
        to: AccountId,
        amount: Amount,
    ) -> Result<TransferReceipt, AppError> {
        let source = self.endpoint(from)?;
        let destination = self.endpoint(to)?;
        Ok(self.transfers.transfer(&source, &destination, amount)?)
    }

    fn endpoint(&self, id: AccountId) -> Result<Arc<Account>, LedgerError> {
        self.ledger.find_account(id).ok_or_else(|| {
            LedgerError::InvalidArgument(format!("account #{} does not exist", id))
        })
    }

    // ========================
    // Interest operations
    // ========================

    /// Apply interest (or the maintenance charge) to one account.
    pub fn apply_interest(&self, id: AccountId) -> Result<InterestOutcome, AppError> {
        let account = self.account(id)?;
        Ok(self.interest.apply_interest(&account)?)
    }

    /// Apply interest to every account, one account lock at a time.
    pub fn apply_interest_all(&self) -> Vec<InterestRun> {
        self.ledger
            .list_accounts()
            .iter()
            .map(|account| InterestRun {
                account: account.id(),
                result: self.interest.apply_interest(account),
            })
            .collect()
    }

    // ========================
    // Reporting
    // ========================

    pub fn summary(&self) -> LedgerSummary {
        build_summary(&self.ledger.list_accounts())
    }

    /// Check ledger integrity and return a report.
    pub fn check_integrity(&self) -> IntegrityReport {
        build_integrity_report(&self.ledger.list_accounts())
    }
}
