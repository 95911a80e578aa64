pub mod application;
pub mod cli;
pub mod domain;
pub mod io;
pub mod storage;
pub mod telemetry;

pub use application::BankService;
pub use domain::*;
pub use storage::Ledger;
