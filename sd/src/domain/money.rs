//! Fixed-point EUR amounts
//!
//! All monetary values in legal documents carry exactly two decimal
//! digits. Amounts are stored as integer cents; every division rounds
//! half-up so that repeated calculations stay reproducible.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

/// An EUR amount in cents
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    /// Construct from cents
    pub fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Construct from whole euros
    pub fn from_eur(eur: i64) -> Self {
        Money(eur * 100)
    }

    /// Amount in cents
    pub fn cents(&self) -> i64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Multiply by the rational `numerator / denominator`, rounding
    /// half-up (away from zero on the .5 boundary).
    ///
    /// This is the allocation primitive: a creditor's pro-rata share is
    /// `allocable.mul_ratio(claim_cents, total_cents)`.
    pub fn mul_ratio(&self, numerator: i64, denominator: i64) -> Money {
        debug_assert!(denominator > 0, "mul_ratio denominator must be positive");
        let scaled = self.0 as i128 * numerator as i128;
        Money(div_round_half_up(scaled, denominator as i128))
    }

    /// This amount as a percentage of `total` (for quota display)
    pub fn percentage_of(&self, total: Money) -> f64 {
        if total.0 == 0 {
            return 0.0;
        }
        self.0 as f64 / total.0 as f64 * 100.0
    }

    /// German number format: "1.234,56"
    pub fn format_de(&self) -> String {
        let negative = self.0 < 0;
        let abs = self.0.unsigned_abs();
        let whole = abs / 100;
        let cents = abs % 100;

        let digits = whole.to_string();
        let mut grouped = String::new();
        for (i, c) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push('.');
            }
            grouped.push(c);
        }

        format!("{}{},{:02}", if negative { "-" } else { "" }, grouped, cents)
    }

    /// German currency format: "1.234,56 EUR"
    pub fn format_eur_de(&self) -> String {
        format!("{} EUR", self.format_de())
    }
}

/// Divide with round-half-up, away from zero on the boundary
fn div_round_half_up(numerator: i128, denominator: i128) -> i64 {
    debug_assert!(denominator > 0);
    if numerator >= 0 {
        ((2 * numerator + denominator) / (2 * denominator)) as i64
    } else {
        -(((2 * -numerator + denominator) / (2 * denominator)) as i64)
    }
}

impl Add for Money {
    type Output = Money;
    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.0 += rhs.0;
    }
}

impl Sub for Money {
    type Output = Money;
    fn sub(self, rhs: Money) -> Money {
        Money(self.0 - rhs.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Money) {
        self.0 -= rhs.0;
    }
}

impl Neg for Money {
    type Output = Money;
    fn neg(self) -> Money {
        Money(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        Money(iter.map(|m| m.0).sum())
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_eur_de())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mul_ratio_rounds_half_up() {
        // 1.00 * 1/8 = 0.125 -> 0.13
        assert_eq!(Money::from_cents(100).mul_ratio(1, 8), Money::from_cents(13));
        // 1.00 * 1/3 = 0.333.. -> 0.33
        assert_eq!(Money::from_cents(100).mul_ratio(1, 3), Money::from_cents(33));
        // exactly half a cent rounds up
        assert_eq!(Money::from_cents(1).mul_ratio(1, 2), Money::from_cents(1));
    }

    #[test]
    fn test_mul_ratio_negative_rounds_away_from_zero() {
        assert_eq!(Money::from_cents(-1).mul_ratio(1, 2), Money::from_cents(-1));
        assert_eq!(Money::from_cents(-100).mul_ratio(1, 3), Money::from_cents(-33));
    }

    #[test]
    fn test_format_de() {
        assert_eq!(Money::from_cents(123456).format_de(), "1.234,56");
        assert_eq!(Money::from_cents(5).format_de(), "0,05");
        assert_eq!(Money::from_cents(-123456789).format_de(), "-1.234.567,89");
        assert_eq!(Money::from_eur(1000).format_eur_de(), "1.000,00 EUR");
    }

    #[test]
    fn test_percentage_of() {
        let part = Money::from_eur(800);
        let total = Money::from_eur(1000);
        assert!((part.percentage_of(total) - 80.0).abs() < f64::EPSILON);
        assert_eq!(part.percentage_of(Money::ZERO), 0.0);
    }

    #[test]
    fn test_sum() {
        let total: Money = [Money::from_eur(1), Money::from_eur(2), Money::from_cents(50)]
            .into_iter()
            .sum();
        assert_eq!(total, Money::from_cents(350));
    }
}
