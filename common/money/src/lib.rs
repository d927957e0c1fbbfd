use std::str::FromStr;

use bigdecimal::{BigDecimal, ToPrimitive};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Centimes per dinar. The gateway only accepts amounts in minor units.
pub const MINOR_UNITS_PER_MAJOR: i64 = 100;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MoneyError {
    #[error("price is not a number: '{0}'")]
    NotNumeric(String),
    #[error("price '{0}' has more than two decimal places")]
    SubMinorPrecision(String),
    #[error("price '{0}' does not fit in minor units")]
    OutOfRange(String),
}

/// Parse a caller-declared price in major units. Whitespace is ignored; anything else non-numeric is rejected.
pub fn parse_price(raw: &str) -> Result<BigDecimal, MoneyError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(MoneyError::NotNumeric(raw.to_string()));
    }
    BigDecimal::from_str(trimmed).map_err(|_| MoneyError::NotNumeric(raw.to_string()))
}

/// Exact major -> minor conversion. Values that would need rounding are refused instead of rounded.
pub fn to_minor_units(price: &BigDecimal) -> Result<i64, MoneyError> {
    let scaled = price.clone() * BigDecimal::from(MINOR_UNITS_PER_MAJOR);
    if scaled.with_scale(0) != scaled {
        return Err(MoneyError::SubMinorPrecision(price.to_string()));
    }
    scaled
        .to_i64()
        .ok_or_else(|| MoneyError::OutOfRange(price.to_string()))
}

pub fn is_strictly_positive(value: &BigDecimal) -> bool {
    *value > BigDecimal::from(0)
}

/// Render a monetary value with exactly 2 decimal places (truncating extra digits).
pub fn normalize_scale(value: &BigDecimal) -> BigDecimal {
    value.with_scale(2)
}

/// A price already validated as convertible to whole minor units.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MinorAmount {
    major: BigDecimal,
    minor: i64,
}

impl MinorAmount {
    pub fn from_major(major: BigDecimal) -> Result<Self, MoneyError> {
        let minor = to_minor_units(&major)?;
        Ok(Self { major, minor })
    }
    pub fn major(&self) -> &BigDecimal { &self.major }
    pub fn minor(&self) -> i64 { self.minor }
}
