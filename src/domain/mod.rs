mod account;
mod error;
mod money;
mod transaction;

pub use account::*;
pub use error::*;
pub use money::*;
pub use transaction::*;
