//! Case status transitions
//!
//! The single place allowed to write `Case::status`. Transitions are
//! monotonic in [`CaseStatus::rank`]; guards check that the work a
//! status claims (plan computed, batch generated, quorum determined)
//! actually happened before the status is applied.

use thiserror::Error;
use tracing::{debug, info};

use crate::aggregate::Outcome;
use crate::domain::{Case, CaseStatus};
use crate::templates::BatchKind;

/// Rejected status change; the case is left untouched
#[derive(Debug, Error)]
pub enum TransitionError {
    #[error("Invalid transition {from} -> {to}: would move backward")]
    Backward { from: &'static str, to: &'static str },

    #[error("Invalid transition {from} -> {to}: not a defined edge")]
    UndefinedEdge { from: &'static str, to: &'static str },

    #[error("Transition to {to} blocked: {reason}")]
    GuardFailed { to: &'static str, reason: String },

    #[error("Case is archived; no further transitions")]
    Terminal,
}

/// Apply a status transition to a case.
///
/// A transition to the current status is a no-op (ticks may re-derive
/// the same determination). Anything that fails leaves the status
/// unchanged.
pub fn advance(case: &mut Case, target: CaseStatus) -> Result<(), TransitionError> {
    let current = case.status;

    if current == target {
        debug!(case_ref = %case.reference, status = current.as_str(), "Transition to current status, no-op");
        return Ok(());
    }

    if current.is_terminal() {
        return Err(TransitionError::Terminal);
    }

    if target.rank() <= current.rank() {
        return Err(TransitionError::Backward {
            from: current.as_str(),
            to: target.as_str(),
        });
    }

    check_edge_and_guards(case, current, target)?;

    case.status = target;
    if target == CaseStatus::ProposalSent {
        case.proposal_sent_at = Some(chrono::Utc::now());
    }
    case.touch();
    info!(case_ref = %case.reference, from = current.as_str(), to = target.as_str(), "Case transition");
    Ok(())
}

fn check_edge_and_guards(case: &Case, current: CaseStatus, target: CaseStatus) -> Result<(), TransitionError> {
    // archived is reachable from anywhere (manual, terminal)
    if target == CaseStatus::Archived {
        return Ok(());
    }

    let edge_ok = matches!(
        (current, target),
        (CaseStatus::Intake, CaseStatus::PlanCalculated)
            | (CaseStatus::PlanCalculated, CaseStatus::ProposalSent)
            | (CaseStatus::ProposalSent, CaseStatus::AwaitingResponses)
            | (CaseStatus::AwaitingResponses, CaseStatus::DeterminedAccepted)
            | (CaseStatus::AwaitingResponses, CaseStatus::DeterminedFallbackSent)
    );
    if !edge_ok {
        return Err(TransitionError::UndefinedEdge {
            from: current.as_str(),
            to: target.as_str(),
        });
    }

    match target {
        CaseStatus::PlanCalculated => {
            if case.plan.is_none() {
                return Err(guard(target, "no settlement plan on the case"));
            }
        }
        CaseStatus::ProposalSent => {
            if !case.has_batch(BatchKind::SettlementProposal.as_str()) {
                return Err(guard(target, "proposal document batch not generated"));
            }
        }
        CaseStatus::DeterminedAccepted => {
            let outcome = case.statistics.as_ref().map(|s| s.outcome);
            if outcome != Some(Outcome::Accepted) {
                return Err(guard(target, "aggregator has not reported an accepted outcome"));
            }
        }
        CaseStatus::DeterminedFallbackSent => {
            let outcome = case.statistics.as_ref().map(|s| s.outcome);
            if outcome != Some(Outcome::Fallback) {
                return Err(guard(target, "aggregator has not reported a fallback outcome"));
            }
            if !case.has_batch(BatchKind::ZeroPaymentPlan.as_str()) {
                return Err(guard(target, "zero-payment document batch not generated"));
            }
        }
        _ => {}
    }

    Ok(())
}

fn guard(to: CaseStatus, reason: &str) -> TransitionError {
    TransitionError::GuardFailed {
        to: to.as_str(),
        reason: reason.to_string(),
    }
}
