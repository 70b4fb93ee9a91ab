//! # Money Module
//!
//! Provides the `Money` type for ledger amounts.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  Summing a month of expenses as f64:                                    │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents                                            │
//! │    Amounts are parsed ONCE from text into cents and stay integers      │
//! │    through the store, the summaries and the budget check.              │
//! │    Only the spreadsheet cell sees a decimal number.                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use ledger_core::money::Money;
//!
//! let lunch = Money::from_cents(12050);          // 120.50
//! let total = lunch + Money::from_cents(4000);   // 160.50
//! assert_eq!(total.to_decimal_string(), "160.50");
//!
//! // Text from a form or a spreadsheet cell
//! assert_eq!(Money::parse_decimal(" $1,200 ").unwrap().cents(), 120000);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub, SubAssign};

/// Symbols accepted in front of an amount (`$120`, `NT$120`, `¥120`).
const CURRENCY_PREFIX_CHARS: &[char] = &['$', '¥', '￥', '€', '£', 'N', 'T', 'n', 't'];

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (cents).
///
/// ## Design Decisions
/// - **i64 (signed)**: balances (income - expense) can be negative
/// - **Single field tuple struct**: Zero-cost abstraction over i64
/// - **Derives**: serde serializes as a bare integer of cents
///
/// Entry amounts themselves are never negative; that rule lives in
/// [`crate::validation::validate_amount`], not in this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    ///
    /// ## Example
    /// ```rust
    /// use ledger_core::money::Money;
    ///
    /// let coffee = Money::from_cents(6500); // 65.00
    /// assert_eq!(coffee.cents(), 6500);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from whole units (no fractional part).
    #[inline]
    pub const fn from_major(major: i64) -> Self {
        Money(major * 100)
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the whole-unit portion (truncated toward zero).
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the cents portion (always 0-99).
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

    /// Parses a human-written decimal amount.
    ///
    /// ## Accepted Forms
    /// ```text
    /// ┌──────────────────────┬──────────────┐
    /// │ Input                │ Cents        │
    /// ├──────────────────────┼──────────────┤
    /// │ "120"                │ 12000        │
    /// │ " 120.5 "            │ 12050        │
    /// │ "1,250.75"           │ 125075       │
    /// │ "$80" / "NT$80"      │ 8000         │
    /// │ "-15.25"             │ -1525        │
    /// │ "0.125"              │ 13 (half-up) │
    /// │ "abc" / "" / "1.2.3" │ None         │
    /// └──────────────────────┴──────────────┘
    /// ```
    ///
    /// Digits past the second fraction digit are rounded half away from zero.
    /// Returns `None` for anything that is not a number or would overflow.
    ///
    /// ## Example
    /// ```rust
    /// use ledger_core::money::Money;
    ///
    /// assert_eq!(Money::parse_decimal("99.999").unwrap().cents(), 10000);
    /// assert!(Money::parse_decimal("lunch").is_none());
    /// ```
    pub fn parse_decimal(input: &str) -> Option<Money> {
        let compact: String = input
            .chars()
            .filter(|c| !c.is_whitespace() && *c != ',')
            .collect();

        let (negative, rest) = split_sign(&compact);
        let rest = rest.trim_start_matches(CURRENCY_PREFIX_CHARS);
        // A sign may also follow the symbol: "$-5"
        let (negative, rest) = match split_sign(rest) {
            (true, tail) if !negative => (true, tail),
            (false, tail) => (negative, tail),
            (true, _) => return None,
        };

        let (whole, fraction) = match rest.split_once('.') {
            Some((w, f)) => (w, f),
            None => (rest, ""),
        };

        if whole.is_empty() && fraction.is_empty() {
            return None;
        }
        if !whole.chars().all(|c| c.is_ascii_digit())
            || !fraction.chars().all(|c| c.is_ascii_digit())
        {
            return None;
        }

        let mut cents: i64 = 0;
        for digit in whole.bytes() {
            cents = cents.checked_mul(10)?.checked_add(i64::from(digit - b'0'))?;
        }
        cents = cents.checked_mul(100)?;

        let mut fraction_digits = fraction.bytes().map(|b| i64::from(b - b'0'));
        let tenths = fraction_digits.next().unwrap_or(0);
        let hundredths = fraction_digits.next().unwrap_or(0);
        cents = cents.checked_add(tenths * 10 + hundredths)?;

        if fraction_digits.next().unwrap_or(0) >= 5 {
            cents = cents.checked_add(1)?;
        }

        Some(Money(if negative { -cents } else { cents }))
    }

    /// Formats as a plain decimal with two fraction digits (`"1250.50"`).
    ///
    /// This is the form used for CLI input echo and log fields; it never
    /// carries a currency symbol or thousands separators.
    pub fn to_decimal_string(&self) -> String {
        let sign = if self.0 < 0 { "-" } else { "" };
        format!("{}{}.{:02}", sign, self.major().abs(), self.cents_part())
    }

    /// Converts to a floating point number of whole units.
    ///
    /// ## Warning
    /// Only for handing the value to the spreadsheet, which stores numbers
    /// as doubles anyway. Never do arithmetic on the result.
    pub fn to_major_f64(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Computes `self` as a whole percentage of `total`, truncated.
    ///
    /// Returns 0 when `total` is not positive.
    pub fn percent_of(&self, total: Money) -> i64 {
        if total.0 <= 0 {
            return 0;
        }
        ((self.0 as i128 * 100) / total.0 as i128) as i64
    }
}

fn split_sign(s: &str) -> (bool, &str) {
    if let Some(rest) = s.strip_prefix('-') {
        (true, rest)
    } else if let Some(rest) = s.strip_prefix('+') {
        (false, rest)
    } else {
        (false, s)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display with a currency symbol and thousands separators: `$1,250.50`.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let digits = self.major().abs().to_string();

        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, ch) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(ch);
        }

        write!(f, "{}${}.{:02}", sign, grouped, self.cents_part())
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

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
