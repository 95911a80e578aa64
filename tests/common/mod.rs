// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use std::sync::Arc;

use anyhow::Result;
use arca::application::BankService;
use arca::domain::{Account, AccountKind, Amount};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Helper to create a shareable service over an empty ledger with default rates
pub fn test_service() -> Arc<BankService> {
    Arc::new(BankService::default())
}

/// Sum of all balances, read one account at a time
pub fn sum_of_balances(service: &BankService) -> Amount {
    service
        .accounts()
        .iter()
        .fold(Decimal::ZERO, |total, account| total + account.balance())
}

/// Test fixture: Standard account setup
pub struct StandardAccounts {
    pub alice: Arc<Account>,
    pub bob: Arc<Account>,
    pub savings: Arc<Account>,
}

impl StandardAccounts {
    /// Alice (checking, 100), Bob (checking, 0), Carol (savings, 250)
    pub fn create(service: &BankService) -> Result<Self> {
        Ok(Self {
            alice: service.open_account("Alice", AccountKind::Checking, dec!(100))?,
            bob: service.open_account("Bob", AccountKind::Checking, dec!(0))?,
            savings: service.open_account("Carol", AccountKind::Savings, dec!(250))?,
        })
    }

    /// Many accounts with the same balance, for fan-out tests
    pub fn create_many(
        service: &BankService,
        count: usize,
        balance: Amount,
    ) -> Result<Vec<Arc<Account>>> {
        (0..count)
            .map(|i| {
                Ok(service.open_account(&format!("Owner {}", i), AccountKind::Checking, balance)?)
            })
            .collect()
    }
}
