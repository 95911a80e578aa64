mod shell;

pub use shell::*;

use std::io::Write;

use anyhow::Result;
use clap::{ArgAction, Parser};
use rust_decimal::Decimal;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::application::{BankService, InterestPolicy};
use crate::domain::AccountKind;
use crate::telemetry::{self, LogFormat};

/// Owner of the account every session starts with, unless `--no-demo` is given.
pub const DEMO_OWNER: &str = "Alejo Fontecha";

/// Arca - In-memory Bank Ledger
#[derive(Parser, Debug)]
#[command(name = "arca")]
#[command(about = "An in-memory bank ledger with an interactive prompt")]
#[command(version)]
pub struct Cli {
    /// Rate applied to savings accounts on each accrual (e.g. 0.02 for +2%)
    #[arg(long, env = "ARCA_SAVINGS_RATE", default_value = "0.02", value_parser = parse_rate, allow_hyphen_values = true)]
    pub savings_rate: Decimal,

    /// Rate applied to checking accounts on each accrual (negative is a charge)
    #[arg(long, env = "ARCA_CHECKING_RATE", default_value = "-0.01", value_parser = parse_rate, allow_hyphen_values = true)]
    pub checking_rate: Decimal,

    /// Start with an empty ledger instead of the demo account
    #[arg(long)]
    pub no_demo: bool,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

fn parse_rate(input: &str) -> Result<Decimal, String> {
    input
        .trim()
        .parse::<Decimal>()
        .map_err(|e| format!("invalid rate '{}': {}", input, e))
}

impl Cli {
    pub fn interest_policy(&self) -> InterestPolicy {
        InterestPolicy {
            savings_rate: self.savings_rate,
            checking_rate: self.checking_rate,
        }
    }

    /// Build the service this session runs against.
    pub fn build_service(&self) -> Result<BankService> {
        let service = BankService::new(self.interest_policy());
        if !self.no_demo {
            service.open_account(DEMO_OWNER, AccountKind::Checking, Decimal::new(18, 0))?;
        }
        Ok(service)
    }

    pub async fn run(self) -> Result<()> {
        telemetry::init(self.log_format, self.verbose);

        let service = self.build_service()?;
        let policy = service.interest_policy();
        tracing::info!(
            savings_rate = %policy.savings_rate,
            checking_rate = %policy.checking_rate,
            accounts = service.ledger().len(),
            "session started"
        );

        println!("========= ARCA =========");
        println!("Type 'help' for the list of commands, 'exit' to leave.");

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut stdout = std::io::stdout();

        loop {
            print!("arca> ");
            stdout.flush()?;

            // End of input leaves the shell like `exit`.
            let Some(line) = lines.next_line().await? else {
                println!();
                break;
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            match execute(&service, line, &mut stdout) {
                Ok(Flow::Continue) => {}
                Ok(Flow::Exit) => break,
                Err(err) => println!("Error: {:#}", err),
            }
        }

        tracing::info!(accounts = service.ledger().len(), "session ended");
        Ok(())
    }
}
