//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In floating point:                                                     │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  A till that sums 400 float payments drifts away from the cash         │
//! │  drawer, and the drift shows up as a fake shortage.                    │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents + explicit 1 cent tolerance               │
//! │    5100 cents - 4900 cents = -200 cents, exactly                       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use tally_core::money::Money;
//!
//! let price = Money::from_cents(10_000); // 100.00
//! let total = price.multiply_quantity(3);
//! assert_eq!(total.cents(), 30_000);
//!
//! let threshold = Money::parse_decimal("100.00").unwrap();
//! assert_eq!(threshold, price);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};
use ts_rs::TS;

use crate::error::ValidationError;

/// Tolerance used for every "equal to" or "at least" money comparison.
pub const MONEY_EPSILON: Money = Money::from_cents(1);

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (cents).
///
/// ## Design Decisions
/// - **i64 (signed)**: variances are negative for shortages
/// - **Single field tuple struct**: zero-cost abstraction over i64
/// - **Serialized as a bare integer** so API payloads carry `*_cents` fields
///
/// ## Where Money Flows
/// ```text
/// Product.selling_price ──► Sale.total_amount ──► SalePayment.amount
///                                   │                     │
///                                   ▼                     ▼
///                           Debt.balance        SystemCount per method
///                                                         │
///                                   physical count ──► Variance
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    ///
    /// ```rust
    /// use tally_core::money::Money;
    ///
    /// let float = Money::from_cents(500_000); // 5000.00
    /// assert_eq!(float.cents(), 500_000);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from major and minor units.
    ///
    /// For negative amounts only the major unit carries the sign:
    /// `from_major_minor(-5, 50)` is -5.50.
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    /// Parses a plain decimal string such as `"100"`, `"100.5"` or `"-12.34"`.
    ///
    /// ## Rules
    /// - At most two fractional digits (no silent rounding)
    /// - No thousands separators, no currency symbol
    ///
    /// ```rust
    /// use tally_core::money::Money;
    ///
    /// assert_eq!(Money::parse_decimal("100.00").unwrap().cents(), 10_000);
    /// assert_eq!(Money::parse_decimal("0.5").unwrap().cents(), 50);
    /// assert!(Money::parse_decimal("1.005").is_err());
    /// ```
    pub fn parse_decimal(input: &str) -> Result<Money, ValidationError> {
        let invalid = |reason: &str| ValidationError::InvalidFormat {
            field: "amount".to_string(),
            reason: reason.to_string(),
        };

        let trimmed = input.trim();
        let (negative, digits) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };

        let (major_str, minor_str) = match digits.split_once('.') {
            Some((major, minor)) => (major, minor),
            None => (digits, ""),
        };

        if major_str.is_empty() || !major_str.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid("expected digits before the decimal point"));
        }
        if minor_str.len() > 2 || !minor_str.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid("at most two decimal places are allowed"));
        }

        let major: i64 = major_str
            .parse()
            .map_err(|_| invalid("amount is too large"))?;
        let minor: i64 = match minor_str.len() {
            0 => 0,
            1 => minor_str.parse::<i64>().map_err(|_| invalid("bad fraction"))? * 10,
            _ => minor_str.parse().map_err(|_| invalid("bad fraction"))?,
        };

        let cents = major
            .checked_mul(100)
            .and_then(|c| c.checked_add(minor))
            .ok_or_else(|| invalid("amount is too large"))?;

        Ok(Money(if negative { -cents } else { cents }))
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit portion.
    #[inline]
    pub const fn dollars(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns the absolute value.
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Multiplies money by a quantity.
    ///
    /// ```rust
    /// use tally_core::money::Money;
    ///
    /// let unit_price = Money::from_cents(10_000);
    /// assert_eq!(unit_price.multiply_quantity(3).cents(), 30_000);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// `self + other`, or `None` on overflow.
    #[inline]
    pub const fn checked_add(&self, other: Money) -> Option<Money> {
        match self.0.checked_add(other.0) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// `self - other`, or `None` on overflow.
    #[inline]
    pub const fn checked_sub(&self, other: Money) -> Option<Money> {
        match self.0.checked_sub(other.0) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// `self × qty`, or `None` on overflow.
    ///
    /// ```rust
    /// use tally_core::money::Money;
    ///
    /// assert!(Money::from_cents(i64::MAX / 2).checked_multiply_quantity(3).is_none());
    /// ```
    #[inline]
    pub const fn checked_multiply_quantity(&self, qty: i64) -> Option<Money> {
        match self.0.checked_mul(qty) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Sums `amounts`, or `None` on overflow.
    pub fn checked_sum<'a>(amounts: impl IntoIterator<Item = &'a Money>) -> Option<Money> {
        amounts
            .into_iter()
            .try_fold(Money::zero(), |acc, m| acc.checked_add(*m))
    }

    /// True when `self` and `other` differ by no more than [`MONEY_EPSILON`].
    ///
    /// ```rust
    /// use tally_core::money::Money;
    ///
    /// assert!(Money::from_cents(30_000).approx_eq(Money::from_cents(30_001)));
    /// assert!(!Money::from_cents(30_000).approx_eq(Money::from_cents(30_002)));
    /// ```
    #[inline]
    pub const fn approx_eq(&self, other: Money) -> bool {
        self.0.abs_diff(other.0) <= MONEY_EPSILON.0 as u64
    }

    /// Formats the amount as a plain decimal (`"100.00"`, `"-2.50"`), without a
    /// currency symbol. Used in stored notes and alerts.
    pub fn to_decimal_string(&self) -> String {
        let sign = if self.0 < 0 { "-" } else { "" };
        format!("{}{}.{:02}", sign, self.dollars().abs(), self.cents_part())
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Debug-style display with a currency marker. UI formatting is the client's job.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}${}.{:02}", sign, self.dollars().abs(), self.cents_part())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + *m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cents() {
        let money = Money::from_cents(1099);
        assert_eq!(money.cents(), 1099);
        assert_eq!(money.dollars(), 10);
        assert_eq!(money.cents_part(), 99);
    }

    #[test]
    fn test_from_major_minor() {
        assert_eq!(Money::from_major_minor(100, 0).cents(), 10_000);
        assert_eq!(Money::from_major_minor(-5, 50).cents(), -550);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Money::from_cents(1099)), "$10.99");
        assert_eq!(format!("{}", Money::from_cents(-20_000)), "-$200.00");
        assert_eq!(format!("{}", Money::zero()), "$0.00");
    }

    #[test]
    fn test_decimal_string() {
        assert_eq!(Money::from_cents(10_000).to_decimal_string(), "100.00");
        assert_eq!(Money::from_cents(-250).to_decimal_string(), "-2.50");
        assert_eq!(Money::from_cents(7).to_decimal_string(), "0.07");
    }

    #[test]
    fn test_parse_decimal() {
        assert_eq!(Money::parse_decimal("100").unwrap().cents(), 10_000);
        assert_eq!(Money::parse_decimal("100.5").unwrap().cents(), 10_050);
        assert_eq!(Money::parse_decimal(" 0.07 ").unwrap().cents(), 7);
        assert_eq!(Money::parse_decimal("-12.34").unwrap().cents(), -1234);
    }

    #[test]
    fn test_parse_decimal_rejects_garbage() {
        assert!(Money::parse_decimal("").is_err());
        assert!(Money::parse_decimal(".50").is_err());
        assert!(Money::parse_decimal("1.005").is_err());
        assert!(Money::parse_decimal("1,000.00").is_err());
        assert!(Money::parse_decimal("$5").is_err());
        assert!(Money::parse_decimal("99999999999999999999").is_err());
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        assert_eq!((b - a).cents(), -500);
        assert_eq!((-a).cents(), -1000);
        assert_eq!((a * 3).cents(), 3000);
    }

    #[test]
    fn test_sum() {
        let parts = [Money::from_cents(60_000), Money::from_cents(30_000)];
        let total: Money = parts.iter().sum();
        assert_eq!(total.cents(), 90_000);

        let empty: Vec<Money> = Vec::new();
        assert!(empty.into_iter().sum::<Money>().is_zero());
    }

    #[test]
    fn test_approx_eq_uses_one_cent() {
        let base = Money::from_cents(100_000);
        assert!(base.approx_eq(Money::from_cents(99_999)));
        assert!(base.approx_eq(Money::from_cents(100_001)));
        assert!(!base.approx_eq(Money::from_cents(99_998)));
    }

    #[test]
    fn test_checked_arithmetic_at_the_boundary() {
        let max = Money::from_cents(i64::MAX);
        assert!(max.checked_add(Money::from_cents(1)).is_none());
        assert!(Money::from_cents(i64::MIN).checked_sub(Money::from_cents(1)).is_none());
        assert!(Money::from_cents(i64::MAX / 2).checked_multiply_quantity(3).is_none());
        assert!(Money::checked_sum(&[max, max]).is_none());

        assert_eq!(
            Money::from_cents(10_000).checked_multiply_quantity(3),
            Some(Money::from_cents(30_000))
        );
        assert_eq!(
            Money::checked_sum(&[Money::from_cents(60_000), Money::from_cents(30_000)]),
            Some(Money::from_cents(90_000))
        );
    }

    #[test]
    fn test_approx_eq_far_apart_does_not_overflow() {
        assert!(!Money::from_cents(i64::MAX).approx_eq(Money::from_cents(i64::MIN)));
    }

    #[test]
    fn test_zero_and_checks() {
        assert!(Money::zero().is_zero());
        assert!(Money::from_cents(100).is_positive());
        assert!(Money::from_cents(-100).is_negative());
        assert_eq!(Money::from_cents(-550).abs().cents(), 550);
    }

    #[test]
    fn test_serializes_as_integer() {
        let json = serde_json::to_string(&Money::from_cents(30_000)).unwrap();
        assert_eq!(json, "30000");
    }
}
