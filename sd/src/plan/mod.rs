//! Plan Calculator
//!
//! Pure computation: financial snapshot + creditor claims in, settlement
//! plan out. No I/O, no state; the daemon calls this once per case and
//! persists the result on the Case record.

mod calculator;
mod garnishment;

pub use calculator::{Allocation, PlanKind, SettlementPlan, ValidationError, calculate};
pub use garnishment::garnishable_income;

/// Fixed settlement term used in all plans (months)
pub const PLAN_DURATION_MONTHS: u32 = 36;
