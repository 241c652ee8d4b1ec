//! The caller's price ceiling.
//!
//! Amounts are exact decimals ([`Decimal`]), never floats. The STREAM send
//! total is compared against the ceiling without rounding.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Maximum amount a single payment session may send, in the sender's asset units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MaxPrice(Decimal);

/// Errors when building a [`MaxPrice`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MaxPriceError {
    /// The value is not a decimal number.
    #[error("invalid max price {0:?}")]
    Invalid(String),
    /// The value is below zero.
    #[error("max price must not be negative, got {0}")]
    Negative(Decimal),
}

impl MaxPrice {
    /// Creates a ceiling from a decimal amount.
    ///
    /// # Errors
    ///
    /// Returns [`MaxPriceError::Negative`] if `amount` is below zero.
    pub fn new(amount: Decimal) -> Result<Self, MaxPriceError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(MaxPriceError::Negative(amount));
        }
        Ok(Self(amount.normalize()))
    }

    /// Returns the ceiling as a decimal.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }
}

impl From<u64> for MaxPrice {
    fn from(value: u64) -> Self {
        Self(Decimal::from(value))
    }
}

impl TryFrom<Decimal> for MaxPrice {
    type Error = MaxPriceError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl FromStr for MaxPrice {
    type Err = MaxPriceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let amount = Decimal::from_str_exact(s)
            .or_else(|_| Decimal::from_scientific(s))
            .map_err(|_| MaxPriceError::Invalid(s.to_owned()))?;
        Self::new(amount)
    }
}

impl Display for MaxPrice {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl Serialize for MaxPrice {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for MaxPrice {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_integer_and_fraction() {
        assert_eq!("100".parse::<MaxPrice>().unwrap(), MaxPrice::from(100));
        assert_eq!(
            "0.000001".parse::<MaxPrice>().unwrap().amount(),
            Decimal::new(1, 6)
        );
    }

    #[test]
    fn test_parse_beyond_u64() {
        let price: MaxPrice = "340282366920938463463".parse().unwrap();
        assert!(price.amount() > Decimal::from(u64::MAX));
        assert_eq!(price.to_string(), "340282366920938463463");
    }

    #[test]
    fn test_parse_rejects_negative_and_garbage() {
        assert!(matches!(
            "-1".parse::<MaxPrice>(),
            Err(MaxPriceError::Negative(_))
        ));
        assert!(matches!(
            "ten".parse::<MaxPrice>(),
            Err(MaxPriceError::Invalid(_))
        ));
        assert!(matches!("".parse::<MaxPrice>(), Err(MaxPriceError::Invalid(_))));
    }

    #[test]
    fn test_zero_is_allowed() {
        let zero: MaxPrice = "0".parse().unwrap();
        assert_eq!(zero.amount(), Decimal::ZERO);
    }

    #[test]
    fn test_display_normalizes_trailing_zeros() {
        let price: MaxPrice = "100.000".parse().unwrap();
        assert_eq!(price.to_string(), "100");
    }

    #[test]
    fn test_serde_as_string() {
        let price: MaxPrice = serde_json::from_str("\"12.5\"").unwrap();
        assert_eq!(serde_json::to_string(&price).unwrap(), "\"12.5\"");
        assert!(serde_json::from_str::<MaxPrice>("\"-3\"").is_err());
    }
}
