use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use rust_decimal::Decimal;

use crate::domain::{
    Account, AccountGuard, AccountId, AccountKind, Amount, LedgerError, check_precision,
};

#[derive(Debug)]
struct Registry {
    /// Next identity to hand out. Never decremented, so ids are never reused.
    next_id: u64,
    /// Ids grow with creation order, so key order is creation order.
    accounts: BTreeMap<AccountId, Arc<Account>>,
}

/// In-memory registry owning every account of the process.
///
/// The ledger is the only place accounts are created, so every id it knows
/// was assigned by itself. Lookups and listings share a read lock; creation
/// takes the write lock, which makes id allocation and registration a single
/// critical section.
#[derive(Debug)]
pub struct Ledger {
    registry: RwLock<Registry>,
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

impl Ledger {
    pub fn new() -> Self {
        Self {
            registry: RwLock::new(Registry {
                next_id: 1,
                accounts: BTreeMap::new(),
            }),
        }
    }

    /// Open a new account and register it.
    ///
    /// The owner name is trimmed and must not be empty. A negative initial
    /// balance is clamped to zero; one with more than `DECIMAL_PRECISION`
    /// decimal places is rejected.
    pub fn create_account(
        &self,
        owner: &str,
        kind: AccountKind,
        initial_balance: Amount,
    ) -> Result<Arc<Account>, LedgerError> {
        let owner = owner.trim();
        if owner.is_empty() {
            return Err(LedgerError::invalid_argument("owner name cannot be empty"));
        }
        let initial_balance = check_precision(initial_balance)?;

        let account = {
            let mut registry = self.write();
            let id = AccountId::new(registry.next_id);
            registry.next_id += 1;

            let account = Arc::new(Account::open(id, owner.to_string(), kind, initial_balance));
            registry.accounts.insert(id, Arc::clone(&account));
            account
        };

        tracing::info!(
            account = %account.id(),
            owner = account.owner(),
            kind = %account.kind(),
            balance = %account.balance(),
            "account opened"
        );
        Ok(account)
    }

    pub fn find_account(&self, id: AccountId) -> Option<Arc<Account>> {
        self.read().accounts.get(&id).cloned()
    }

    /// All accounts in creation order.
    pub fn list_accounts(&self) -> Vec<Arc<Account>> {
        self.read().accounts.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.read().accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sum of all balances.
    ///
    /// Every account is locked in ascending id order, the order transfers use,
    /// and held until the sum is done: the total never sees money that left
    /// one account but has not reached the other.
    pub fn total_balance(&self) -> Amount {
        let accounts = self.list_accounts();
        let guards: Vec<AccountGuard<'_>> = accounts.iter().map(|account| account.lock()).collect();
        guards
            .iter()
            .fold(Decimal::ZERO, |total, guard| total + guard.balance())
    }

    fn read(&self) -> RwLockReadGuard<'_, Registry> {
        self.registry.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Registry> {
        self.registry.write().unwrap_or_else(PoisonError::into_inner)
    }
}
