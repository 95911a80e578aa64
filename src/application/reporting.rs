use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{Account, AccountGuard, AccountId, AccountKind, Amount, OPENING_DESCRIPTION};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerSummary {
    pub as_of: DateTime<Utc>,
    pub account_count: usize,
    pub total_balance: Amount,
    pub by_kind: Vec<KindSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindSummary {
    pub kind: AccountKind,
    pub count: usize,
    pub total: Amount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrityReport {
    pub account_count: usize,
    pub record_count: usize,
    pub total_balance: Amount,
    pub issues: Vec<String>,
}

impl IntegrityReport {
    pub fn is_healthy(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Lock all accounts in ascending id order, the same order transfers use,
/// so reports see one consistent state of the whole ledger.
pub(crate) fn lock_all(accounts: &[Arc<Account>]) -> Vec<(&Account, AccountGuard<'_>)> {
    let mut sorted: Vec<&Account> = accounts.iter().map(Arc::as_ref).collect();
    sorted.sort_by_key(|account| account.id());
    sorted
        .into_iter()
        .map(|account| (account, account.lock()))
        .collect()
}

/// Build a balance summary grouped by account kind.
pub fn build_summary(accounts: &[Arc<Account>]) -> LedgerSummary {
    let guards = lock_all(accounts);

    let by_kind = AccountKind::ALL
        .iter()
        .map(|&kind| {
            let (count, total) = guards
                .iter()
                .filter(|(account, _)| account.kind() == kind)
                .fold((0, Decimal::ZERO), |(count, total), (_, guard)| {
                    (count + 1, total + guard.balance())
                });
            KindSummary { kind, count, total }
        })
        .collect::<Vec<_>>();

    LedgerSummary {
        as_of: Utc::now(),
        account_count: guards.len(),
        total_balance: guards.iter().map(|(_, guard)| guard.balance()).sum(),
        by_kind,
    }
}

/// Verify every account's history against its balance.
///
/// Checks that each history starts with the opening record, that each record's
/// balance follows from the previous one plus its amount, that no balance is
/// negative, and that the last record matches the live balance.
pub fn build_integrity_report(accounts: &[Arc<Account>]) -> IntegrityReport {
    let guards = lock_all(accounts);
    let mut issues = Vec::new();
    let mut record_count = 0;

    for (_, guard) in &guards {
        record_count += guard.history().len();
        check_account(guard, &mut issues);
    }

    IntegrityReport {
        account_count: guards.len(),
        record_count,
        total_balance: guards.iter().map(|(_, guard)| guard.balance()).sum(),
        issues,
    }
}

fn check_account(guard: &AccountGuard<'_>, issues: &mut Vec<String>) {
    let id: AccountId = guard.id();
    let history = guard.history();

    let Some(opening) = history.first() else {
        issues.push(format!("Account #{} has no history", id));
        return;
    };
    if opening.description() != OPENING_DESCRIPTION || opening.amount() != opening.balance_after()
    {
        issues.push(format!("Account #{} does not start with an opening record", id));
    }

    for (index, pair) in history.windows(2).enumerate() {
        let expected = pair[0].balance_after() + pair[1].amount();
        if pair[1].balance_after() != expected {
            issues.push(format!(
                "Account #{} record {} ('{}'): balance {} does not follow from {} + {}",
                id,
                index + 1,
                pair[1].description(),
                pair[1].balance_after(),
                pair[0].balance_after(),
                pair[1].amount()
            ));
        }
    }

    if let Some(record) = history.iter().find(|r| r.balance_after() < Decimal::ZERO) {
        issues.push(format!(
            "Account #{} has a negative balance {} after '{}'",
            id,
            record.balance_after(),
            record.description()
        ));
    }

    if let Some(last) = history.last() {
        if last.balance_after() != guard.balance() {
            issues.push(format!(
                "Account #{} balance {} differs from last record {}",
                id,
                guard.balance(),
                last.balance_after()
            ));
        }
    }
}
