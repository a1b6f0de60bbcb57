//! Garnishable income per the German attachment table (Pfaendungstabelle)
//!
//! Closed form of the official 2025/2026 table (valid July 2025 through
//! June 2026). The published table is stepwise in 10-EUR brackets; per
//! dependent count it reduces to an exemption floor plus a constant
//! marginal rate, with full garnishment above the table ceiling.

use crate::domain::Money;

/// Exemption floors in cents, indexed by dependents (0..=5)
const EXEMPTION_FLOOR: [i64; 6] = [156_499, 215_021, 247_627, 280_229, 312_834, 345_439];

/// Marginal garnishment rate above the floor, as tenths (7 = 70%)
const MARGINAL_RATE_TENTHS: [i64; 6] = [7, 5, 4, 3, 2, 1];

/// Income above this is fully garnishable (cents)
const TABLE_CEILING: i64 = 476_699;

/// Garnishable amount at the ceiling, indexed by dependents (cents)
const CEILING_AMOUNT: [i64; 6] = [224_350, 130_989, 91_749, 59_031, 32_833, 13_156];

/// Monthly garnishable income for a net income and dependent count.
///
/// Never negative and never more than the net income itself.
pub fn garnishable_income(net_income: Money, dependents: u8) -> Money {
    let idx = (dependents as usize).min(5);
    let net = net_income.cents();

    if net <= EXEMPTION_FLOOR[idx] {
        return Money::ZERO;
    }

    let garnishable = if net > TABLE_CEILING {
        CEILING_AMOUNT[idx] + (net - TABLE_CEILING)
    } else {
        // marginal rate applied to the excess over the floor, half-up
        Money::from_cents(net - EXEMPTION_FLOOR[idx])
            .mul_ratio(MARGINAL_RATE_TENTHS[idx], 10)
            .cents()
    };

    Money::from_cents(garnishable.min(net))
}
