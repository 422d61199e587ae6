//! Exact nanoton amounts
//!
//! User-facing amounts are decimal strings in TON; everything that reaches a
//! cell or a transaction is an integer number of nanotons.

use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Decimal places between TON and nanoton
pub const DECIMALS: u32 = 9;

const NANO_PER_TON: u128 = 10u128.pow(DECIMALS);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    #[error("amount is empty")]
    Empty,

    #[error("negative amounts are not allowed: {0}")]
    Negative(String),

    #[error("amount is not a decimal number: {0}")]
    NotNumeric(String),

    #[error("amount has more than 9 fractional digits: {0}")]
    TooPrecise(String),

    #[error("amount exceeds the maximum representable value: {0}")]
    Overflow(String),
}

/// A non-negative quantity of nanotons, bounded by the `VarUInteger 16` maximum
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Coins(u128);

impl Coins {
    pub const ZERO: Coins = Coins(0);

    /// Largest value a `coins` field can hold (15 bytes)
    pub const MAX: Coins = Coins((1u128 << 120) - 1);

    /// Value attached to every contract message for fees (0.05 TON)
    pub const DEFAULT_GAS: Coins = Coins(50_000_000);

    pub fn from_nano(nano: u128) -> Result<Self, AmountError> {
        if nano > Self::MAX.0 {
            return Err(AmountError::Overflow(nano.to_string()));
        }
        Ok(Self(nano))
    }

    pub const fn nano(self) -> u128 {
        self.0
    }

    /// Parse a decimal amount denominated in TON, e.g. `"12.5"`
    pub fn from_decimal_str(input: &str) -> Result<Self, AmountError> {
        let s = input.trim();
        if s.is_empty() {
            return Err(AmountError::Empty);
        }
        if s.starts_with('-') {
            return Err(AmountError::Negative(input.to_string()));
        }

        let (whole, frac) = match s.split_once('.') {
            Some((whole, frac)) => (whole, frac),
            None => (s, ""),
        };
        if whole.is_empty() && frac.is_empty() {
            return Err(AmountError::NotNumeric(input.to_string()));
        }
        let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if !all_digits(whole) || !all_digits(frac) {
            return Err(AmountError::NotNumeric(input.to_string()));
        }
        if frac.len() > DECIMALS as usize {
            return Err(AmountError::TooPrecise(input.to_string()));
        }

        let overflow = || AmountError::Overflow(input.to_string());

        let whole_nano = if whole.is_empty() {
            0
        } else {
            whole
                .parse::<u128>()
                .map_err(|_| overflow())?
                .checked_mul(NANO_PER_TON)
                .ok_or_else(overflow)?
        };
        let frac_nano = if frac.is_empty() {
            0
        } else {
            let padded = format!("{frac:0<width$}", width = DECIMALS as usize);
            padded.parse::<u128>().map_err(|_| overflow())?
        };

        let nano = whole_nano.checked_add(frac_nano).ok_or_else(overflow)?;
        Self::from_nano(nano).map_err(|_| overflow())
    }

    /// Render in TON with trailing zeros trimmed, e.g. `12.5`
    pub fn to_decimal_string(self) -> String {
        let whole = self.0 / NANO_PER_TON;
        let frac = self.0 % NANO_PER_TON;
        if frac == 0 {
            return whole.to_string();
        }
        let frac = format!("{frac:0>width$}", width = DECIMALS as usize);
        format!("{whole}.{}", frac.trim_end_matches('0'))
    }
}

impl FromStr for Coins {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_decimal_str(s)
    }
}

/// Displays the nanoton integer; use [`Coins::to_decimal_string`] for TON
impl fmt::Display for Coins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for Coins {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whole_and_fractional_amounts() {
        assert_eq!(Coins::from_decimal_str("12.5").unwrap().nano(), 12_500_000_000);
        assert_eq!(Coins::from_decimal_str("0.05").unwrap().nano(), 50_000_000);
        assert_eq!(Coins::from_decimal_str("1").unwrap().nano(), 1_000_000_000);
        assert_eq!(Coins::from_decimal_str("0").unwrap(), Coins::ZERO);
        assert_eq!(Coins::from_decimal_str(".5").unwrap().nano(), 500_000_000);
        assert_eq!(Coins::from_decimal_str("3.").unwrap().nano(), 3_000_000_000);
        assert_eq!(Coins::from_decimal_str("0.000000001").unwrap().nano(), 1);
        assert_eq!(Coins::from_decimal_str(" 7 ").unwrap().nano(), 7_000_000_000);
    }

    #[test]
    fn test_rejects_negative() {
        assert!(matches!(
            Coins::from_decimal_str("-1"),
            Err(AmountError::Negative(_))
        ));
        assert!(matches!(
            Coins::from_decimal_str("-0.5"),
            Err(AmountError::Negative(_))
        ));
    }

    #[test]
    fn test_rejects_non_numeric() {
        for input in ["abc", "1e9", "1.2.3", "+5", "0x10", ".", "1,5", "1 000", "NaN"] {
            assert!(
                matches!(Coins::from_decimal_str(input), Err(AmountError::NotNumeric(_))),
                "expected NotNumeric for {input:?}"
            );
        }
        assert_eq!(Coins::from_decimal_str(""), Err(AmountError::Empty));
    }

    #[test]
    fn test_rejects_excess_precision() {
        assert!(matches!(
            Coins::from_decimal_str("0.0000000001"),
            Err(AmountError::TooPrecise(_))
        ));
    }

    #[test]
    fn test_rejects_overflow() {
        // 2^120 nanotons is one past the coins maximum
        let too_big = "1329227995784915872903807060.280344576";
        assert!(matches!(
            Coins::from_decimal_str(too_big),
            Err(AmountError::Overflow(_))
        ));
        let max = "1329227995784915872903807060.280344575";
        assert_eq!(Coins::from_decimal_str(max).unwrap(), Coins::MAX);
        assert!(matches!(
            Coins::from_decimal_str(&"9".repeat(60)),
            Err(AmountError::Overflow(_))
        ));
        assert!(Coins::from_nano(1u128 << 120).is_err());
        assert_eq!(Coins::from_nano((1u128 << 120) - 1).unwrap(), Coins::MAX);
    }

    #[test]
    fn test_decimal_rendering() {
        assert_eq!(Coins::from_decimal_str("12.5").unwrap().to_decimal_string(), "12.5");
        assert_eq!(Coins::from_decimal_str("100").unwrap().to_decimal_string(), "100");
        assert_eq!(Coins::from_nano(1).unwrap().to_decimal_string(), "0.000000001");
        assert_eq!(Coins::ZERO.to_string(), "0");
    }

    #[test]
    fn test_serializes_as_nano_string() {
        let coins = Coins::from_decimal_str("0.05").unwrap();
        assert_eq!(serde_json::to_string(&coins).unwrap(), "\"50000000\"");
    }
}
