use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub, SubAssign};
use std::str::FromStr;

use crate::errors::{LoanError, Result};

/// amount in integer minor currency units (cents, satang, dong)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    /// create from minor units
    pub const fn from_minor(amount: i64) -> Self {
        Money(amount)
    }

    /// create from a major amount given the currency's minor unit exponent
    pub fn from_major(amount: i64, exponent: u32) -> Option<Self> {
        10_i64
            .checked_pow(exponent)
            .and_then(|factor| amount.checked_mul(factor))
            .map(Money)
    }

    /// minor units
    pub const fn minor(&self) -> i64 {
        self.0
    }

    /// minor units as an exact decimal
    pub fn as_decimal(&self) -> Decimal {
        Decimal::from(self.0)
    }

    /// major units, e.g. 1050 with exponent 2 is 10.50
    pub fn to_major(&self, exponent: u32) -> Decimal {
        let mut d = Decimal::from(self.0);
        // exponent beyond decimal precision leaves the value unscaled
        if d.set_scale(exponent).is_err() {
            return Decimal::from(self.0);
        }
        d
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// strictly greater than zero
    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    pub fn min(self, other: Self) -> Self {
        Money(self.0.min(other.0))
    }

    pub fn max(self, other: Self) -> Self {
        Money(self.0.max(other.0))
    }

    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Money)
    }

    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Money)
    }

    pub fn checked_mul(self, factor: i64) -> Option<Self> {
        self.0.checked_mul(factor).map(Money)
    }

    /// floor division into `parts` equal shares plus the leftover
    pub fn split_floor(self, parts: u32) -> Option<(Money, Money)> {
        if parts == 0 {
            return None;
        }
        let divisor = i64::from(parts);
        let share = self.0.div_euclid(divisor);
        let leftover = self.0.rem_euclid(divisor);
        Some((Money(share), Money(leftover)))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Money {
    fn from(amount: i64) -> Self {
        Money(amount)
    }
}

impl From<i32> for Money {
    fn from(amount: i32) -> Self {
        Money(i64::from(amount))
    }
}

impl From<u32> for Money {
    fn from(amount: u32) -> Self {
        Money(i64::from(amount))
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, other: Money) -> Money {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, other: Money) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, other: Money) -> Money {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, other: Money) {
        self.0 -= other.0;
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, |acc, x| acc + x)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, |acc, x| acc + *x)
    }
}

/// three letter currency tag, carried but never converted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyCode([u8; 3]);

impl CurrencyCode {
    /// parse a code, normalising to upper case
    pub fn new(code: &str) -> Result<Self> {
        let bytes = code.trim().as_bytes();
        if bytes.len() != 3 || !bytes.iter().all(u8::is_ascii_alphabetic) {
            return Err(LoanError::invalid(format!(
                "currency code must be three letters, got {:?}",
                code
            )));
        }
        let mut tag = [0u8; 3];
        for (slot, b) in tag.iter_mut().zip(bytes) {
            *slot = b.to_ascii_uppercase();
        }
        Ok(CurrencyCode(tag))
    }

    pub fn as_str(&self) -> &str {
        // only ascii letters are ever stored
        std::str::from_utf8(&self.0).unwrap_or("???")
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CurrencyCode {
    type Err = LoanError;

    fn from_str(s: &str) -> Result<Self> {
        CurrencyCode::new(s)
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = LoanError;

    fn try_from(value: String) -> Result<Self> {
        CurrencyCode::new(&value)
    }
}

impl From<CurrencyCode> for String {
    fn from(code: CurrencyCode) -> Self {
        code.as_str().to_string()
    }
}
