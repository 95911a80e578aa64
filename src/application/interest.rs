use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{Account, AccountKind, Amount, INTEREST_DESCRIPTION, LedgerError, normalize};

/// Per-kind rates applied on each accrual. A negative rate is a charge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterestPolicy {
    pub savings_rate: Decimal,
    pub checking_rate: Decimal,
}

impl Default for InterestPolicy {
    fn default() -> Self {
        Self {
            // +2% on savings, -1% maintenance charge on checking
            savings_rate: Decimal::new(2, 2),
            checking_rate: Decimal::new(-1, 2),
        }
    }
}

impl InterestPolicy {
    pub fn rate_for(&self, kind: AccountKind) -> Decimal {
        match kind {
            AccountKind::Savings => self.savings_rate,
            AccountKind::Checking => self.checking_rate,
        }
    }
}

/// What an accrual did to an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum InterestOutcome {
    /// Positive interest was added.
    Credited { delta: Amount, balance: Amount },
    /// A charge was taken.
    Charged { delta: Amount, balance: Amount },
    /// The charge exceeded the balance and was skipped for this cycle.
    ChargeSkipped { delta: Amount, balance: Amount },
    /// The computed delta was zero (empty account or zero rate).
    Unchanged { balance: Amount },
}

impl InterestOutcome {
    /// The computed adjustment, whether or not it was applied.
    pub fn delta(&self) -> Amount {
        match self {
            InterestOutcome::Credited { delta, .. }
            | InterestOutcome::Charged { delta, .. }
            | InterestOutcome::ChargeSkipped { delta, .. } => *delta,
            InterestOutcome::Unchanged { .. } => Decimal::ZERO,
        }
    }

    /// Balance after the accrual.
    pub fn balance(&self) -> Amount {
        match self {
            InterestOutcome::Credited { balance, .. }
            | InterestOutcome::Charged { balance, .. }
            | InterestOutcome::ChargeSkipped { balance, .. }
            | InterestOutcome::Unchanged { balance } => *balance,
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(
            self,
            InterestOutcome::Credited { .. } | InterestOutcome::Charged { .. }
        )
    }
}

/// Applies the rate of an account's kind to its current balance.
#[derive(Debug, Clone, Copy, Default)]
pub struct InterestService {
    policy: InterestPolicy,
}

impl InterestService {
    pub fn new(policy: InterestPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &InterestPolicy {
        &self.policy
    }

    /// Accrue interest (or take the charge) on a single account.
    ///
    /// The balance read, the adjustment and its record happen under one
    /// account lock. A charge the account cannot cover is skipped rather than
    /// reported as an error, and leaves no history record: only balance
    /// changes that actually happened are logged.
    pub fn apply_interest(&self, account: &Account) -> Result<InterestOutcome, LedgerError> {
        let rate = self.policy.rate_for(account.kind());
        let mut guard = account.lock();
        let balance = guard.balance();

        let delta = balance
            .checked_mul(rate)
            .map(normalize)
            .ok_or(LedgerError::InvalidAmount { amount: balance })?;

        let outcome = if delta > Decimal::ZERO {
            let balance = guard.credit(delta)?;
            guard.record_adjustment(INTEREST_DESCRIPTION, delta);
            InterestOutcome::Credited { delta, balance }
        } else if delta < Decimal::ZERO {
            match guard.debit(-delta) {
                Ok(balance) => {
                    guard.record_adjustment(INTEREST_DESCRIPTION, delta);
                    InterestOutcome::Charged { delta, balance }
                }
                Err(LedgerError::InsufficientFunds { .. }) => {
                    tracing::warn!(account = %guard.id(), delta = %delta, balance = %balance, "charge skipped, insufficient funds");
                    InterestOutcome::ChargeSkipped { delta, balance }
                }
                Err(err) => return Err(err),
            }
        } else {
            InterestOutcome::Unchanged { balance }
        };

        tracing::debug!(account = %guard.id(), rate = %rate, delta = %delta, "interest applied");
        Ok(outcome)
    }
}
