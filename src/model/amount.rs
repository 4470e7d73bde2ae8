//! Amount type for monetary values in the ledger.
//!
//! Amounts are plain `f64` values. They are rounded to two decimals only when displayed. Parsing
//! is lenient because persisted data and user input are both allowed to be sloppy: anything that
//! is not a number becomes zero rather than an error.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::fmt::{Debug, Display, Formatter};
use std::str::FromStr;

/// Two amounts closer than this are considered the same amount when matching rows to templates.
const MATCH_TOLERANCE: f64 = 0.005;

/// Represents a money value.
///
/// # Examples
///
/// Parsing with a currency symbol and thousands separators:
/// ```
/// # use carryover::model::Amount;
/// # use std::str::FromStr;
/// let amount = Amount::from_str("$1,250.50").unwrap();
/// assert_eq!(amount.value(), 1250.5);
/// assert_eq!(amount.to_string(), "1,250.50");
/// ```
///
/// Lenient parsing turns garbage into zero:
/// ```
/// # use carryover::model::Amount;
/// assert!(Amount::parse_lenient("twelve").is_zero());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct Amount(f64);

impl Amount {
    /// A zero amount.
    pub const ZERO: Amount = Amount(0.0);

    /// Creates a new `Amount`. Non-finite values (NaN, infinity) are coerced to zero.
    pub fn new(value: f64) -> Self {
        if value.is_finite() {
            Self(value)
        } else {
            Self::ZERO
        }
    }

    /// Returns the underlying value.
    pub fn value(&self) -> f64 {
        self.0
    }

    /// Returns true if the amount is zero.
    pub fn is_zero(&self) -> bool {
        self.0 == 0.0
    }

    /// Returns true if the amount is negative.
    pub fn is_negative(&self) -> bool {
        self.0 < 0.0
    }

    /// Returns the amount, or zero if it is negative.
    pub fn clamp_non_negative(self) -> Self {
        if self.is_negative() {
            Self::ZERO
        } else {
            self
        }
    }

    /// Returns the value rounded to two decimal places.
    pub fn rounded(&self) -> f64 {
        (self.0 * 100.0).round() / 100.0
    }

    /// True when both amounts display as the same value.
    pub fn matches(&self, other: Amount) -> bool {
        (self.0 - other.0).abs() < MATCH_TOLERANCE
    }

    /// Parses `s` as an amount, returning zero when it cannot be parsed.
    pub fn parse_lenient(s: &str) -> Self {
        Self::from_str(s).unwrap_or_default()
    }

    /// Parses an amount typed by the user into a field. Amounts in the ledger are never negative,
    /// so a minus sign is ignored.
    pub fn parse_input(s: &str) -> Self {
        Self::new(Self::parse_lenient(s).0.abs())
    }

    /// Coerces any JSON value to an amount. Numbers are taken as-is, strings are parsed leniently
    /// and everything else is zero.
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Number(n) => Self::new(n.as_f64().unwrap_or_default()),
            serde_json::Value::String(s) => Self::parse_lenient(s),
            _ => Self::ZERO,
        }
    }
}

impl From<f64> for Amount {
    fn from(value: f64) -> Self {
        Self::new(value)
    }
}

impl From<Amount> for f64 {
    fn from(value: Amount) -> Self {
        value.0
    }
}

/// An error that can occur when parsing strings into `Amount` values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmountError(String);

impl Display for AmountError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Unable to parse '{}' as an amount", self.0)
    }
}

impl std::error::Error for AmountError {}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();

        if trimmed.is_empty() {
            return Ok(Amount::default());
        }

        let (negative, unsigned) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest.trim_start()),
            None => (false, trimmed),
        };

        // Drop a leading currency symbol, e.g. "$50.00" or "₹50.00"
        let without_symbol = unsigned.trim_start_matches(['$', '₹', '€', '£']);
        let without_commas = without_symbol.replace(',', "");

        let value: f64 = without_commas
            .parse()
            .map_err(|_| AmountError(s.to_string()))?;
        if !value.is_finite() {
            return Err(AmountError(s.to_string()));
        }
        Ok(Amount::new(if negative { -value } else { value }))
    }
}

impl Display for Amount {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let rounded = self.rounded();
        let sign = if rounded < 0.0 { "-" } else { "" };
        let num = format_num::format_num!(",.2", rounded.abs());
        write!(f, "{sign}{num}")
    }
}

impl Serialize for Amount {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(self.0)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(Amount::from_json(&value))
    }
}
