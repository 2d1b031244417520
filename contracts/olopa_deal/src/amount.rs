//! # Amount
//!
//! Deal amounts are fixed-point values at the ledger's drop scale: six
//! fractional digits, stored as a `u64` count of drops.
//!
//! `Amount` is parsed from the decimal string a form submits (`"500"`,
//! `"12.5"`, `".25"`) and serialized back to the shortest decimal string, so
//! a deal never carries a float.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of fractional digits an amount may carry.
pub const AMOUNT_SCALE: u32 = 6;

/// Drops per whole unit.
const DROPS_PER_UNIT: u64 = 10u64.pow(AMOUNT_SCALE);

#[derive(Clone, Copy, Debug, Eq, PartialEq, Error)]
pub enum AmountParseError {
    #[error("amount is empty")]
    Empty,
    #[error("amount is not a decimal number")]
    Malformed,
    #[error("amount has more than 6 fractional digits")]
    TooPrecise,
    #[error("amount is too large")]
    Overflow,
}

/// A non-negative monetary quantity in drops (1 unit = 1_000_000 drops).
///
/// There is no `From<u64>`; use [`Amount::from_drops`] when a raw integer is
/// known to be a drop count.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Amount(u64);

impl Amount {
    #[inline]
    pub const fn from_drops(drops: u64) -> Self {
        Amount(drops)
    }

    #[inline]
    pub const fn drops(self) -> u64 {
        self.0
    }

    #[inline]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }
}

impl FromStr for Amount {
    type Err = AmountParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(AmountParseError::Empty);
        }

        let (whole, frac) = s.split_once('.').unwrap_or((s, ""));
        if whole.is_empty() && frac.is_empty() {
            return Err(AmountParseError::Malformed);
        }
        let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if !all_digits(whole) || !all_digits(frac) {
            return Err(AmountParseError::Malformed);
        }
        if frac.len() > AMOUNT_SCALE as usize {
            return Err(AmountParseError::TooPrecise);
        }

        let whole_drops = if whole.is_empty() {
            0
        } else {
            whole
                .parse::<u64>()
                .map_err(|_| AmountParseError::Overflow)?
                .checked_mul(DROPS_PER_UNIT)
                .ok_or(AmountParseError::Overflow)?
        };
        let frac_drops = if frac.is_empty() {
            0
        } else {
            // At most six digits, so this cannot overflow.
            let raw: u64 = frac.parse().map_err(|_| AmountParseError::Malformed)?;
            raw * 10u64.pow(AMOUNT_SCALE - frac.len() as u32)
        };

        whole_drops
            .checked_add(frac_drops)
            .map(Amount)
            .ok_or(AmountParseError::Overflow)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / DROPS_PER_UNIT;
        let frac = self.0 % DROPS_PER_UNIT;
        if frac == 0 {
            return write!(f, "{whole}");
        }
        let digits = format!("{frac:06}");
        write!(f, "{whole}.{}", digits.trim_end_matches('0'))
    }
}

impl TryFrom<String> for Amount {
    type Error = AmountParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Amount> for String {
    fn from(amount: Amount) -> Self {
        amount.to_string()
    }
}
