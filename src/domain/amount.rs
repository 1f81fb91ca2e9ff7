//! Amount type
//!
//! Domain primitive for transfer amounts. Values are integers in the smallest
//! currency unit, so sums never drift.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Maximum single amount (10^15 minor units)
const MAX_AMOUNT: i64 = 1_000_000_000_000_000;

/// Amount represents a validated, strictly positive movement of money.
///
/// # Invariants
/// - Value is always positive (> 0)
/// - Value never exceeds `MAX_AMOUNT`, so negating it or adding it to a
///   balance of the same magnitude cannot overflow `i64`
///
/// # Example
/// ```
/// use koin_ledger::domain::Amount;
///
/// let amount = Amount::new(3000).unwrap();
/// assert_eq!(amount.value(), 3000);
/// assert_eq!(amount.negated(), -3000);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Amount(i64);

/// Errors that can occur when creating an Amount
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    #[error("amount must be greater than zero (got {0})")]
    NotPositive(i64),

    #[error("amount exceeds maximum allowed value (10^15 minor units)")]
    Overflow,

    #[error("invalid amount format: {0}")]
    ParseError(String),
}

impl Amount {
    /// Create a new Amount with validation.
    ///
    /// # Errors
    /// - `AmountError::NotPositive` if value <= 0
    /// - `AmountError::Overflow` if value > `MAX_AMOUNT`
    pub fn new(value: i64) -> Result<Self, AmountError> {
        if value <= 0 {
            return Err(AmountError::NotPositive(value));
        }

        if value > MAX_AMOUNT {
            return Err(AmountError::Overflow);
        }

        Ok(Self(value))
    }

    /// Magnitude of a signed entry amount.
    ///
    /// # Errors
    /// - `AmountError::NotPositive` if value == 0
    /// - `AmountError::Overflow` if |value| > `MAX_AMOUNT`
    pub fn from_signed(value: i64) -> Result<Self, AmountError> {
        if value == 0 {
            return Err(AmountError::NotPositive(0));
        }
        check_bounds(value)?;
        Ok(Self(value.abs()))
    }

    /// Get the underlying value in minor units.
    pub fn value(&self) -> i64 {
        self.0
    }

    /// Signed value of the debit side of a movement.
    pub fn negated(&self) -> i64 {
        -self.0
    }

    /// Check if a balance covers this amount.
    pub fn is_covered_by(&self, balance: i64) -> bool {
        balance >= self.0
    }
}

/// Accept any signed value (zero included) whose magnitude stays within
/// `MAX_AMOUNT`, such as an opening balance.
pub fn check_bounds(value: i64) -> Result<i64, AmountError> {
    if value.unsigned_abs() > MAX_AMOUNT.unsigned_abs() {
        return Err(AmountError::Overflow);
    }
    Ok(value)
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s
            .trim()
            .parse::<i64>()
            .map_err(|e| AmountError::ParseError(e.to_string()))?;
        Amount::new(value)
    }
}

impl TryFrom<i64> for Amount {
    type Error = AmountError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Amount::new(value)
    }
}

impl From<Amount> for i64 {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}
