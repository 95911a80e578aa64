use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;

use crate::application::BankService;
use crate::application::reporting::lock_all;
use crate::domain::{AccountId, AccountKind, Amount, TransactionRecord};

/// Point-in-time copy of the whole ledger, for JSON export
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub accounts: Vec<AccountSnapshot>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountSnapshot {
    pub id: AccountId,
    pub owner: String,
    pub kind: AccountKind,
    pub opened_at: DateTime<Utc>,
    pub balance: Amount,
    pub history: Vec<RecordSnapshot>,
}

/// Exported copy of one history record. Records themselves can only be
/// written by their account, so reading a snapshot back yields these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordSnapshot {
    pub timestamp: DateTime<Utc>,
    pub description: String,
    pub amount: Amount,
    pub balance_after: Amount,
}

impl From<&TransactionRecord> for RecordSnapshot {
    fn from(record: &TransactionRecord) -> Self {
        Self {
            timestamp: record.timestamp(),
            description: record.description().to_string(),
            amount: record.amount(),
            balance_after: record.balance_after(),
        }
    }
}

/// Exporter for writing ledger data to various formats
pub struct Exporter<'a> {
    service: &'a BankService,
}

impl<'a> Exporter<'a> {
    pub fn new(service: &'a BankService) -> Self {
        Self { service }
    }

    /// Export one account's statement to CSV format
    pub fn export_history_csv<W: Write>(&self, id: AccountId, writer: W) -> Result<usize> {
        let history = self.service.history(id)?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record(["timestamp", "description", "amount", "balance_after"])?;

        for record in &history {
            csv_writer.write_record([
                record.timestamp().to_rfc3339(),
                record.description().to_string(),
                record.amount().to_string(),
                record.balance_after().to_string(),
            ])?;
        }

        csv_writer.flush()?;
        Ok(history.len())
    }

    /// Export balances to CSV format
    pub fn export_balances_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let accounts = self.service.accounts();
        let guards = lock_all(&accounts);
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record(["id", "owner", "kind", "balance"])?;

        for (account, guard) in &guards {
            csv_writer.write_record([
                account.id().to_string(),
                account.owner().to_string(),
                account.kind().to_string(),
                guard.balance().to_string(),
            ])?;
        }

        csv_writer.flush()?;
        Ok(guards.len())
    }

    /// Export the full ledger as a JSON snapshot.
    ///
    /// Every account stays locked until the copy is taken, so a transfer is
    /// either fully in the snapshot or not at all.
    pub fn export_snapshot_json<W: Write>(&self, mut writer: W) -> Result<LedgerSnapshot> {
        let live = self.service.accounts();
        let accounts = lock_all(&live)
            .iter()
            .map(|(account, guard)| AccountSnapshot {
                id: account.id(),
                owner: account.owner().to_string(),
                kind: account.kind(),
                opened_at: account.opened_at(),
                balance: guard.balance(),
                history: guard.history().iter().map(RecordSnapshot::from).collect(),
            })
            .collect();

        let snapshot = LedgerSnapshot {
            version: env!("CARGO_PKG_VERSION").to_string(),
            exported_at: Utc::now(),
            accounts,
        };

        let json = serde_json::to_string_pretty(&snapshot)?;
        writer.write_all(json.as_bytes())?;
        writer.flush()?;

        Ok(snapshot)
    }
}
