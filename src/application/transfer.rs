use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{
    Account, AccountGuard, AccountId, Amount, LedgerError, check_precision, transfer_from_description,
    transfer_to_description,
};

/// Outcome of a completed transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferReceipt {
    pub from: AccountId,
    pub to: AccountId,
    pub amount: Amount,
    /// Source balance right after the transfer
    pub from_balance: Amount,
    /// Destination balance right after the transfer
    pub to_balance: Amount,
}

/// Moves money between two accounts as one indivisible step.
///
/// Both account locks are held for the whole debit, credit and bookkeeping,
/// and are always taken lowest id first, so two transfers over the same pair
/// in opposite directions serialize instead of deadlocking. Transfers over
/// disjoint pairs never wait on each other.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransferService;

impl TransferService {
    pub fn new() -> Self {
        Self
    }

    /// Transfer `amount` from `source` to `destination`.
    ///
    /// On error neither account is modified.
    pub fn transfer(
        &self,
        source: &Account,
        destination: &Account,
        amount: Amount,
    ) -> Result<TransferReceipt, LedgerError> {
        if amount <= Decimal::ZERO {
            return Err(LedgerError::InvalidArgument(format!(
                "transfer amount must be greater than zero, got {}",
                amount
            )));
        }
        if source.id() == destination.id() {
            return Err(LedgerError::InvalidArgument(format!(
                "cannot transfer from account #{} to itself",
                source.id()
            )));
        }
        let amount = check_precision(amount)?;

        let (mut from, mut to) = lock_pair(source, destination);

        let from_balance = match from.debit(amount) {
            Ok(balance) => balance,
            Err(err) => {
                tracing::warn!(from = %from.id(), to = %to.id(), amount = %amount, error = %err, "transfer rejected");
                return Err(err);
            }
        };
        let to_balance = match to.credit(amount) {
            Ok(balance) => balance,
            Err(err) => {
                // Put the money back before releasing the locks.
                from.credit(amount)?;
                return Err(err);
            }
        };

        from.record_adjustment(transfer_to_description(to.id()), -amount);
        to.record_adjustment(transfer_from_description(from.id()), amount);

        let receipt = TransferReceipt {
            from: from.id(),
            to: to.id(),
            amount,
            from_balance,
            to_balance,
        };
        drop((from, to));

        tracing::info!(from = %receipt.from, to = %receipt.to, amount = %amount, "transfer completed");
        Ok(receipt)
    }
}

/// Lock two distinct accounts in ascending id order.
/// Returns the guards as (source, destination) regardless of lock order.
fn lock_pair<'a>(
    source: &'a Account,
    destination: &'a Account,
) -> (AccountGuard<'a>, AccountGuard<'a>) {
    if source.id() < destination.id() {
        let from = source.lock();
        let to = destination.lock();
        (from, to)
    } else {
        let to = destination.lock();
        let from = source.lock();
        (from, to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AccountKind;
    use crate::storage::Ledger;
    use rust_decimal_macros::dec;

    #[test]
    fn test_transfer() {
        let ledger = Ledger::new();
        let a = ledger.create_account("A", AccountKind::Checking, dec!(100)).unwrap();
        let b = ledger.create_account("B", AccountKind::Checking, dec!(0)).unwrap();

        let receipt = TransferService::new().transfer(&a, &b, dec!(40)).unwrap();

        assert_eq!(receipt.from_balance, dec!(60));
        assert_eq!(receipt.to_balance, dec!(40));
        assert_eq!(a.balance(), dec!(60));
        assert_eq!(b.balance(), dec!(40));

        let a_history = a.history();
        assert_eq!(a_history.len(), 2);
        assert_eq!(a_history[1].description(), format!("Transfer to #{}", b.id()));
        assert_eq!(a_history[1].amount(), dec!(-40));
        assert_eq!(a_history[1].balance_after(), dec!(60));

        let b_history = b.history();
        assert_eq!(b_history.len(), 2);
        assert_eq!(b_history[1].description(), format!("Transfer from #{}", a.id()));
        assert_eq!(b_history[1].amount(), dec!(40));
        assert_eq!(b_history[1].balance_after(), dec!(40));
    }

    #[test]
    fn test_transfer_insufficient_funds_is_all_or_nothing() {
        let ledger = Ledger::new();
        let a = ledger.create_account("A", AccountKind::Checking, dec!(10)).unwrap();
        let b = ledger.create_account("B", AccountKind::Checking, dec!(5)).unwrap();

        let got = TransferService::new().transfer(&a, &b, dec!(11));

        assert!(matches!(got, Err(LedgerError::InsufficientFunds { .. })));
        assert_eq!(a.balance(), dec!(10));
        assert_eq!(b.balance(), dec!(5));
        assert_eq!(a.history().len(), 1);
        assert_eq!(b.history().len(), 1);
    }

    #[test]
    fn test_transfer_rejects_non_positive_amount() {
        let ledger = Ledger::new();
        let a = ledger.create_account("A", AccountKind::Checking, dec!(10)).unwrap();
        let b = ledger.create_account("B", AccountKind::Checking, dec!(0)).unwrap();

        for amount in [dec!(0), dec!(-5)] {
            let got = TransferService::new().transfer(&a, &b, amount);
            assert!(matches!(got, Err(LedgerError::InvalidArgument(_))));
        }
        assert_eq!(a.balance(), dec!(10));
    }

    #[test]
    fn test_transfer_rejects_amount_beyond_precision() {
        let ledger = Ledger::new();
        let a = ledger.create_account("A", AccountKind::Checking, dec!(10)).unwrap();
        let b = ledger.create_account("B", AccountKind::Checking, dec!(0)).unwrap();

        for amount in [dec!(0.00004), dec!(1.00005)] {
            let got = TransferService::new().transfer(&a, &b, amount);
            assert_eq!(
                got,
                Err(LedgerError::ExcessPrecision {
                    amount,
                    max_scale: 4,
                })
            );
        }
        assert_eq!(a.balance(), dec!(10));
        assert_eq!(b.balance(), dec!(0));
        assert_eq!(a.history().len(), 1);

        let receipt = TransferService::new().transfer(&a, &b, dec!(0.0001)).unwrap();
        assert_eq!(receipt.to_balance, dec!(0.0001));
    }

    #[test]
    fn test_transfer_to_same_account_is_rejected() {
        let ledger = Ledger::new();
        let a = ledger.create_account("A", AccountKind::Checking, dec!(10)).unwrap();

        let got = TransferService::new().transfer(&a, &a, dec!(1));
        assert!(matches!(got, Err(LedgerError::InvalidArgument(_))));
        assert_eq!(a.history().len(), 1);
    }

    #[test]
    fn test_transfer_from_higher_to_lower_id() {
        let ledger = Ledger::new();
        let a = ledger.create_account("A", AccountKind::Checking, dec!(0)).unwrap();
        let b = ledger.create_account("B", AccountKind::Checking, dec!(30)).unwrap();

        let receipt = TransferService::new().transfer(&b, &a, dec!(30)).unwrap();

        assert_eq!(receipt.from, b.id());
        assert_eq!(receipt.to, a.id());
        assert_eq!(a.balance(), dec!(30));
        assert_eq!(b.balance(), dec!(0));
    }

    #[test]
    fn test_opposite_direction_transfers_do_not_deadlock() {
        let ledger = Ledger::new();
        let a = ledger.create_account("A", AccountKind::Checking, dec!(1000)).unwrap();
        let b = ledger.create_account("B", AccountKind::Checking, dec!(1000)).unwrap();
        let service = TransferService::new();

        std::thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    for _ in 0..200 {
                        service.transfer(&a, &b, dec!(1)).unwrap();
                    }
                });
                s.spawn(|| {
                    for _ in 0..200 {
                        service.transfer(&b, &a, dec!(1)).unwrap();
                    }
                });
            }
        });

        assert_eq!(a.balance(), dec!(1000));
        assert_eq!(b.balance(), dec!(1000));
        assert_eq!(a.history().len(), 1 + 1600);
        assert_eq!(b.history().len(), 1 + 1600);
    }
}
