use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};
use std::str::FromStr;

use crate::error::Error;

/// Display wrapper for an amount held in the smallest currency unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Money(i64);

impl Money {
    pub fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    pub fn cents(self) -> i64 {
        self.0
    }

    pub fn zero() -> Self {
        Money(0)
    }

    pub fn abs(self) -> Self {
        Money(self.0.saturating_abs())
    }

    fn as_decimal(self) -> Decimal {
        Decimal::new(self.0, 2)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let d = self.as_decimal();
        if d.is_sign_negative() {
            write!(f, "-${:.2}", d.abs())
        } else {
            write!(f, "${:.2}", d)
        }
    }
}

/// Parses a decimal amount such as `500`, `-12.5` or `$1,234.56`, rounding
/// to whole cents.
impl FromStr for Money {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        let (negative, raw) = match raw.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, raw),
        };
        let cleaned: String = raw
            .trim_start_matches('$')
            .chars()
            .filter(|c| *c != ',')
            .collect();
        let amount = Decimal::from_str(&cleaned)
            .map_err(|_| Error::validation(format!("invalid amount '{s}'")))?;
        let cents = (amount * Decimal::ONE_HUNDRED)
            .round()
            .to_i64()
            .ok_or_else(|| Error::validation(format!("amount out of range '{s}'")))?;
        Ok(Money(if negative { -cents } else { cents }))
    }
}

impl Add for Money {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Money(self.0.saturating_add(rhs.0))
    }
}

impl Sub for Money {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Money(self.0.saturating_sub(rhs.0))
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |a, b| a + b)
    }
}
