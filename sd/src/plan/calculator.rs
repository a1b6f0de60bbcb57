//! Settlement plan calculation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::domain::{Creditor, FinancialSnapshot, Money};

use super::{PLAN_DURATION_MONTHS, garnishable_income};

/// Rejected input data; nothing is computed or persisted
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Creditor '{0}' has a negative claim amount")]
    NegativeClaim(String),

    #[error("Total claims are zero; no plan can be calculated")]
    NoClaims,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanKind {
    /// Pro-rata repayment of the garnishable income
    QuotaPlan,
    /// No garnishable income; creditors are offered zero payment
    ZeroPlan,
}

/// One creditor's share of the plan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Allocation {
    pub creditor_id: String,
    pub creditor_name: String,
    pub claim_amount: Money,
    /// Monthly payment to this creditor
    pub monthly_amount: Money,
    /// Share of total debt, in percent
    pub quota_percent: f64,
}

/// Result of the plan calculation, stored on the Case record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementPlan {
    pub kind: PlanKind,
    /// Monthly garnishable income distributed across creditors
    pub garnishable_amount: Money,
    pub duration_months: u32,
    pub total_debt: Money,
    pub allocations: Vec<Allocation>,
    pub calculated_at: DateTime<Utc>,
}

impl SettlementPlan {
    /// Total paid over the whole term
    pub fn total_payment(&self) -> Money {
        self.garnishable_amount.mul_ratio(self.duration_months as i64, 1)
    }

    /// Repayment quota over the term, in percent of total debt
    pub fn repayment_quota_percent(&self) -> f64 {
        self.total_payment().percentage_of(self.total_debt)
    }
}

/// Calculate the settlement plan for a case snapshot.
///
/// Allocations always sum to the monthly garnishable amount to the
/// cent: each share is rounded half-up, and the residual cent
/// difference lands on the largest claim (tie-break: largest amount,
/// then lexicographically smallest creditor name).
pub fn calculate(financials: &FinancialSnapshot, creditors: &[Creditor]) -> Result<SettlementPlan, ValidationError> {
    for creditor in creditors {
        if creditor.claim_amount.is_negative() {
            return Err(ValidationError::NegativeClaim(creditor.name.clone()));
        }
    }

    let total_debt: Money = creditors.iter().map(|c| c.claim_amount).sum();
    if total_debt.is_zero() {
        return Err(ValidationError::NoClaims);
    }

    let garnishable = garnishable_income(financials.net_income, financials.dependents);
    debug!(
        net_income = %financials.net_income,
        dependents = financials.dependents,
        garnishable = %garnishable,
        "Plan calculation"
    );

    let kind = if garnishable.is_positive() {
        PlanKind::QuotaPlan
    } else {
        PlanKind::ZeroPlan
    };

    let mut allocations: Vec<Allocation> = creditors
        .iter()
        .map(|c| {
            let monthly = match kind {
                PlanKind::QuotaPlan => garnishable.mul_ratio(c.claim_amount.cents(), total_debt.cents()),
                PlanKind::ZeroPlan => Money::ZERO,
            };
            Allocation {
                creditor_id: c.id.clone(),
                creditor_name: c.name.clone(),
                claim_amount: c.claim_amount,
                monthly_amount: monthly,
                quota_percent: c.claim_amount.percentage_of(total_debt),
            }
        })
        .collect();

    if kind == PlanKind::QuotaPlan {
        let allocated: Money = allocations.iter().map(|a| a.monthly_amount).sum();
        let remainder = garnishable - allocated;
        if !remainder.is_zero() {
            // deterministic target: largest claim, then smallest name
            if let Some(target) = allocations
                .iter_mut()
                .min_by(|a, b| b.claim_amount.cmp(&a.claim_amount).then(a.creditor_name.cmp(&b.creditor_name)))
            {
                debug!(remainder = %remainder, target = %target.creditor_name, "Assigning rounding remainder");
                target.monthly_amount += remainder;
            }
        }
    }

    Ok(SettlementPlan {
        kind,
        garnishable_amount: garnishable,
        duration_months: PLAN_DURATION_MONTHS,
        total_debt,
        allocations,
        calculated_at: Utc::now(),
    })
}
