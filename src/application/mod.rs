// Application layer - use cases and orchestration over the in-memory ledger.
// Transfers and interest are stateless coordinators over borrowed accounts;
// `BankService` ties them to the ledger for identity-based callers.

pub mod error;
pub mod interest;
pub mod reporting;
pub mod service;
pub mod transfer;

pub use error::*;
pub use interest::*;
pub use reporting::*;
pub use service::*;
pub use transfer::*;
