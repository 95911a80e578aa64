use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::application::{BankService, InterestOutcome, InterestRun};
use crate::domain::{AccountId, AccountKind, Amount, format_amount, parse_amount};
use crate::io::Exporter;

/// One line typed at the prompt
#[derive(Parser, Debug)]
#[command(name = "arca", no_binary_name = true, disable_version_flag = true)]
pub struct ShellLine {
    #[command(subcommand)]
    pub command: ShellCommand,
}

#[derive(Subcommand, Debug)]
pub enum ShellCommand {
    /// Open a new account
    Open {
        /// Owner name (may contain spaces)
        #[arg(required = true, num_args = 1..)]
        owner: Vec<String>,

        /// Account kind: checking, savings
        #[arg(short, long, default_value = "checking")]
        kind: AccountKind,

        /// Initial balance (negative values open at zero)
        #[arg(short, long, default_value = "0", value_parser = parse_amount, allow_hyphen_values = true)]
        initial: Amount,
    },

    /// Show the balance of an account
    Balance { id: AccountId },

    /// Deposit into an account
    Deposit {
        id: AccountId,
        #[arg(value_parser = parse_amount, allow_hyphen_values = true)]
        amount: Amount,
    },

    /// Withdraw from an account
    Withdraw {
        id: AccountId,
        #[arg(value_parser = parse_amount, allow_hyphen_values = true)]
        amount: Amount,
    },

    /// List all accounts
    #[command(alias = "ls")]
    List,

    /// Transfer between two accounts
    Transfer {
        from: AccountId,
        to: AccountId,
        #[arg(value_parser = parse_amount, allow_hyphen_values = true)]
        amount: Amount,
    },

    /// Show the transaction history of an account
    History { id: AccountId },

    /// Apply interest (or the maintenance charge) to an account
    Interest {
        #[arg(required_unless_present = "all", conflicts_with = "all")]
        id: Option<AccountId>,

        /// Apply to every account
        #[arg(long)]
        all: bool,
    },

    /// Balances grouped by account kind
    Summary,

    /// Verify that every history agrees with its balance
    Check,

    /// Export data to CSV or JSON
    #[command(subcommand)]
    Export(ExportCommand),

    /// Leave the shell
    #[command(alias = "quit")]
    Exit,
}

#[derive(Subcommand, Debug)]
pub enum ExportCommand {
    /// Statement of one account, as CSV
    History {
        id: AccountId,
        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Balances of all accounts, as CSV
    Balances {
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Full ledger with histories, as JSON
    Snapshot {
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Whether the shell keeps reading after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// Parse and run one prompt line, writing its output to `out`.
///
/// Usage errors (and `help`) are written to `out` as well and are not errors
/// of the shell itself; failed ledger operations are returned as `Err`.
pub fn execute<W: Write>(service: &BankService, line: &str, out: &mut W) -> Result<Flow> {
    let words = line.split_whitespace();
    let parsed = match ShellLine::try_parse_from(words) {
        Ok(parsed) => parsed,
        Err(err) => {
            write!(out, "{}", err.render())?;
            return Ok(Flow::Continue);
        }
    };

    run_command(service, parsed.command, out)
}

fn run_command<W: Write>(service: &BankService, cmd: ShellCommand, out: &mut W) -> Result<Flow> {
    match cmd {
        ShellCommand::Open {
            owner,
            kind,
            initial,
        } => {
            let account = service.open_account(&owner.join(" "), kind, initial)?;
            writeln!(out, "Created account: {}", account)?;
        }

        ShellCommand::Balance { id } => {
            let balance = service.balance(id)?;
            writeln!(out, "Balance: {}", format_amount(balance))?;
        }

        ShellCommand::Deposit { id, amount } => {
            let balance = service.deposit(id, amount)?;
            writeln!(out, "Deposit successful. New balance: {}", format_amount(balance))?;
        }

        ShellCommand::Withdraw { id, amount } => {
            let balance = service.withdraw(id, amount)?;
            writeln!(out, "Withdrawal successful. New balance: {}", format_amount(balance))?;
        }

        ShellCommand::List => run_list_command(service, out)?,

        ShellCommand::Transfer { from, to, amount } => {
            let receipt = service.transfer(from, to, amount)?;
            writeln!(
                out,
                "Transferred {} from #{} to #{} (balances: {} / {})",
                format_amount(receipt.amount),
                receipt.from,
                receipt.to,
                format_amount(receipt.from_balance),
                format_amount(receipt.to_balance)
            )?;
        }

        ShellCommand::History { id } => {
            let account = service.account(id)?;
            writeln!(out, "History of {} (#{}):", account.owner(), account.id())?;
            for record in account.history() {
                writeln!(out, "  {}", record)?;
            }
        }

        ShellCommand::Interest { id, all } => {
            if all {
                let runs = service.apply_interest_all();
                for run in &runs {
                    write_interest_run(out, run)?;
                }
                let applied = runs
                    .iter()
                    .filter(|run| run.result.as_ref().is_ok_and(InterestOutcome::is_applied))
                    .count();
                writeln!(out, "Applied to {} of {} accounts.", applied, runs.len())?;
            } else if let Some(id) = id {
                let outcome = service.apply_interest(id)?;
                writeln!(out, "#{}: {}", id, describe_outcome(&outcome))?;
            }
        }

        ShellCommand::Summary => run_summary_command(service, out)?,

        ShellCommand::Check => run_check_command(service, out)?,

        ShellCommand::Export(export_cmd) => run_export_command(service, export_cmd, out)?,

        ShellCommand::Exit => {
            writeln!(out, "Goodbye.")?;
            return Ok(Flow::Exit);
        }
    }

    Ok(Flow::Continue)
}

fn run_list_command<W: Write>(service: &BankService, out: &mut W) -> Result<()> {
    let accounts = service.accounts();
    if accounts.is_empty() {
        writeln!(out, "No accounts registered.")?;
        return Ok(());
    }

    writeln!(out, "{:<6} {:<24} {:<10} {:>12}", "ID", "OWNER", "KIND", "BALANCE")?;
    writeln!(out, "{}", "-".repeat(55))?;
    for account in accounts {
        writeln!(
            out,
            "{:<6} {:<24} {:<10} {:>12}",
            account.id(),
            account.owner(),
            account.kind().as_str(),
            format_amount(account.balance())
        )?;
    }
    Ok(())
}

fn write_interest_run<W: Write>(out: &mut W, run: &InterestRun) -> Result<()> {
    match &run.result {
        Ok(outcome) => writeln!(out, "#{}: {}", run.account, describe_outcome(outcome))?,
        Err(err) => writeln!(out, "#{}: failed: {}", run.account, err)?,
    }
    Ok(())
}

fn describe_outcome(outcome: &InterestOutcome) -> String {
    match outcome {
        InterestOutcome::Credited { delta, balance } => format!(
            "interest of {} applied. New balance: {}",
            format_amount(*delta),
            format_amount(*balance)
        ),
        InterestOutcome::Charged { delta, balance } => format!(
            "charge of {} applied. New balance: {}",
            format_amount(-*delta),
            format_amount(*balance)
        ),
        InterestOutcome::ChargeSkipped { delta, balance } => format!(
            "charge of {} skipped, insufficient funds. Balance: {}",
            format_amount(-*delta),
            format_amount(*balance)
        ),
        InterestOutcome::Unchanged { balance } => {
            format!("nothing to apply. Balance: {}", format_amount(*balance))
        }
    }
}

fn run_summary_command<W: Write>(service: &BankService, out: &mut W) -> Result<()> {
    let summary = service.summary();

    writeln!(out, "Accounts: {}", summary.account_count)?;
    for kind in &summary.by_kind {
        writeln!(
            out,
            "  {:<10} {:>4} {:>14}",
            format!("{}:", kind.kind),
            kind.count,
            format_amount(kind.total)
        )?;
    }
    writeln!(out, "  {}", "-".repeat(30))?;
    writeln!(
        out,
        "  {:<10} {:>4} {:>14}",
        "Total:",
        summary.account_count,
        format_amount(summary.total_balance)
    )?;
    Ok(())
}

fn run_check_command<W: Write>(service: &BankService, out: &mut W) -> Result<()> {
    writeln!(out, "Checking ledger integrity...")?;

    let report = service.check_integrity();

    writeln!(out, "Accounts: {}", report.account_count)?;
    writeln!(out, "Records:  {}", report.record_count)?;
    writeln!(out, "Total:    {}", format_amount(report.total_balance))?;

    if report.is_healthy() {
        writeln!(out, "Ledger is consistent.")?;
    } else {
        writeln!(out, "Issues found:")?;
        for issue in &report.issues {
            writeln!(out, "  - {}", issue)?;
        }
        anyhow::bail!("Ledger integrity check failed");
    }
    Ok(())
}

fn run_export_command<W: Write>(
    service: &BankService,
    cmd: ExportCommand,
    out: &mut W,
) -> Result<()> {
    let exporter = Exporter::new(service);

    match cmd {
        ExportCommand::History { id, output } => match output {
            Some(path) => {
                // Unknown ids fail before the file is created.
                service.account(id)?;
                let count = exporter.export_history_csv(id, create_output(&path)?)?;
                writeln!(out, "Exported {} records to {}", count, path.display())?;
            }
            None => {
                exporter.export_history_csv(id, &mut *out)?;
            }
        },
        ExportCommand::Balances { output } => match output {
            Some(path) => {
                let count = exporter.export_balances_csv(create_output(&path)?)?;
                writeln!(out, "Exported {} balances to {}", count, path.display())?;
            }
            None => {
                exporter.export_balances_csv(&mut *out)?;
            }
        },
        ExportCommand::Snapshot { output } => match output {
            Some(path) => {
                let snapshot = exporter.export_snapshot_json(create_output(&path)?)?;
                writeln!(
                    out,
                    "Exported {} accounts to {}",
                    snapshot.accounts.len(),
                    path.display()
                )?;
            }
            None => {
                exporter.export_snapshot_json(&mut *out)?;
                writeln!(out)?;
            }
        },
    }

    Ok(())
}

fn create_output(path: &Path) -> Result<File> {
    File::create(path)
        .with_context(|| format!("Failed to create output file: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn run(service: &BankService, line: &str) -> (Result<Flow>, String) {
        let mut out = Vec::new();
        let flow = execute(service, line, &mut out);
        (flow, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_open_with_spaces_in_owner() {
        let service = BankService::default();

        let (flow, text) = run(&service, "open Alejo Fontecha --kind savings --initial 18");

        assert_eq!(flow.unwrap(), Flow::Continue);
        assert_eq!(
            text,
            "Created account: ID:1 - Alejo Fontecha (savings) - Balance: 18.00\n"
        );
    }

    #[test]
    fn test_open_with_menu_kind_code_and_negative_initial() {
        let service = BankService::default();

        run(&service, "open Ada -k 2 -i -50").0.unwrap();

        let account = service.account(AccountId::new(1)).unwrap();
        assert_eq!(account.kind(), AccountKind::Savings);
        assert_eq!(account.balance(), dec!(0));
    }

    #[test]
    fn test_deposit_and_withdraw() {
        let service = BankService::default();
        run(&service, "open Ada --initial 10").0.unwrap();

        let (_, text) = run(&service, "deposit 1 5,5");
        assert_eq!(text, "Deposit successful. New balance: 15.50\n");

        let (_, text) = run(&service, "withdraw #1 0.5");
        assert_eq!(text, "Withdrawal successful. New balance: 15.00\n");
    }

    #[test]
    fn test_operation_errors_are_returned() {
        let service = BankService::default();
        run(&service, "open Ada --initial 30").0.unwrap();

        let (flow, _) = run(&service, "withdraw 1 50");
        let err = flow.unwrap_err();
        assert!(err.to_string().contains("Insufficient funds"));

        let (flow, _) = run(&service, "deposit 1 -5");
        assert!(flow.unwrap_err().to_string().contains("Invalid amount"));

        let (flow, _) = run(&service, "deposit 1 1.00005");
        assert!(flow.unwrap_err().to_string().contains("at most 4 decimal places"));
        assert_eq!(service.balance(AccountId::new(1)), Ok(dec!(30)));

        let (flow, _) = run(&service, "balance 9");
        assert!(flow.unwrap_err().to_string().contains("Account not found"));
    }

    #[test]
    fn test_usage_errors_are_printed() {
        let service = BankService::default();

        let (flow, text) = run(&service, "deposit one 5");
        assert_eq!(flow.unwrap(), Flow::Continue);
        assert!(text.contains("invalid account id"));

        let (flow, text) = run(&service, "frobnicate");
        assert_eq!(flow.unwrap(), Flow::Continue);
        assert!(text.contains("unrecognized subcommand"));
    }

    #[test]
    fn test_help_lists_commands() {
        let service = BankService::default();
        let (flow, text) = run(&service, "help");
        assert_eq!(flow.unwrap(), Flow::Continue);
        assert!(text.contains("transfer"));
        assert!(text.contains("interest"));
    }

    #[test]
    fn test_transfer_and_history() {
        let service = BankService::default();
        run(&service, "open A --initial 100").0.unwrap();
        run(&service, "open B").0.unwrap();

        let (_, text) = run(&service, "transfer 1 2 40");
        assert_eq!(
            text,
            "Transferred 40.00 from #1 to #2 (balances: 60.00 / 40.00)\n"
        );

        let (_, text) = run(&service, "history 1");
        assert!(text.starts_with("History of A (#1):\n"));
        assert!(text.contains("Account opened"));
        assert!(text.contains("Transfer to #2"));
    }

    #[test]
    fn test_interest_all() {
        let service = BankService::default();
        run(&service, "open A --kind savings --initial 100").0.unwrap();
        run(&service, "open B --initial 0").0.unwrap();

        let (_, text) = run(&service, "interest --all");

        assert_eq!(
            text,
            "#1: interest of 2.00 applied. New balance: 102.00\n\
             #2: nothing to apply. Balance: 0.00\n\
             Applied to 1 of 2 accounts.\n"
        );
    }

    #[test]
    fn test_interest_requires_id_or_all() {
        let service = BankService::default();
        let (flow, text) = run(&service, "interest");
        assert_eq!(flow.unwrap(), Flow::Continue);
        assert!(text.contains("required"));
    }

    #[test]
    fn test_list_and_summary() {
        let service = BankService::default();
        let (_, text) = run(&service, "list");
        assert_eq!(text, "No accounts registered.\n");

        run(&service, "open A --kind savings --initial 5").0.unwrap();
        run(&service, "open B --initial 7").0.unwrap();

        let (_, text) = run(&service, "ls");
        assert!(text.contains("ID"));
        assert!(text.contains("savings"));
        assert!(text.contains("7.00"));

        let (_, text) = run(&service, "summary");
        assert!(text.contains("Accounts: 2"));
        assert!(text.contains("12.00"));
    }

    #[test]
    fn test_check() {
        let service = BankService::default();
        run(&service, "open A --initial 5").0.unwrap();

        let (flow, text) = run(&service, "check");
        assert_eq!(flow.unwrap(), Flow::Continue);
        assert!(text.contains("Ledger is consistent."));
    }

    #[test]
    fn test_export_balances_to_stdout() {
        let service = BankService::default();
        run(&service, "open A --initial 5").0.unwrap();

        let (_, text) = run(&service, "export balances");
        assert_eq!(text, "id,owner,kind,balance\n1,A,checking,5\n");
    }

    #[test]
    fn test_exit_and_quit() {
        let service = BankService::default();
        assert_eq!(run(&service, "exit").0.unwrap(), Flow::Exit);
        assert_eq!(run(&service, "quit").0.unwrap(), Flow::Exit);
    }
}
