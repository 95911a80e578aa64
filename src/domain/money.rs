use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use thiserror::Error;

use super::LedgerError;

/// Money is a signed decimal, so interest rates apply without float drift.
/// Positive amounts are credits, negative amounts are debits.
pub type Amount = Decimal;

/// Amounts entering the ledger may carry at most this many decimal places.
/// Computed amounts (interest deltas) are rounded to it.
pub const DECIMAL_PRECISION: u32 = 4;

/// Round a computed amount to the ledger precision (banker's rounding).
pub fn normalize(amount: Amount) -> Amount {
    amount.round_dp(DECIMAL_PRECISION).normalize()
}

/// Accept an amount only if it fits the ledger precision. The value comes
/// back unchanged apart from trailing zeros; nothing is rounded.
pub fn check_precision(amount: Amount) -> Result<Amount, LedgerError> {
    let exact = amount.normalize();
    if exact.scale() > DECIMAL_PRECISION {
        return Err(LedgerError::ExcessPrecision {
            amount,
            max_scale: DECIMAL_PRECISION,
        });
    }
    Ok(exact)
}

/// Format an amount as a human-readable string with two decimals.
/// Example: 50 -> "50.00", -12.345 -> "-12.35"
pub fn format_amount(amount: Amount) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    format!("{:.2}", rounded)
}

/// Parse a decimal string into an amount. Precision is left to the ledger.
/// Example: "50.00" -> 50, "12.5" -> 12.5, "-3" -> -3
pub fn parse_amount(input: &str) -> Result<Amount, ParseAmountError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(ParseAmountError::Empty);
    }

    // Accept a decimal comma as well ("12,50"), as typed on many keyboards.
    let normalized = input.replace(',', ".");
    let amount = Decimal::from_str(&normalized)
        .map_err(|_| ParseAmountError::InvalidFormat(input.to_string()))?;

    Ok(amount.normalize())
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseAmountError {
    #[error("empty amount")]
    Empty,

    #[error("invalid money format: '{0}'")]
    InvalidFormat(String),
}
