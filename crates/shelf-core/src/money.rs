//! # Money
//!
//! Penalty rates and fine amounts, held as integer cents.
//!
//! ```text
//!  penalty rate (cents/day) × overdue days = fine (cents)
//!        100               ×      10       =   1000   → "10.00"
//! ```
//!
//! Fines never go through floating point, so a rendered amount always has
//! exactly two decimals.
//!
//! ```rust
//! use shelf_core::money::Money;
//!
//! let fine = Money::from_cents(100).times(10);
//! assert_eq!(fine.to_string(), "10.00");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul};

/// An amount in cents of the library's single currency.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// A per-day rate charged for `days` days, saturating at the `i64` bounds.
    #[inline]
    pub const fn times(&self, days: i64) -> Self {
        Money(self.0.saturating_mul(days))
    }
}

/// `10.00`, `0.25`, `-5.50`.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    fn mul(self, days: i64) -> Self {
        self.times(days)
    }
}

/// Totals a person's fines.
impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}
