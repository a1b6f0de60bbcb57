//! One polling tick for a monitored case
//!
//! A tick fetches creditor replies since the session checkpoint,
//! applies the new ones exactly once, re-aggregates, and drives the
//! case forward if a determination was reached. The checkpoint is only
//! advanced after everything succeeded; a failed tick re-reads the same
//! window and the dedup set absorbs the repeats.

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::aggregate::{self, Outcome};
use crate::domain::{Case, CaseStatus, MonitoringSession};
use crate::state::{StateError, StateManager, TransitionError, advance};
use crate::templates::{BatchKind, TemplateEngine, TemplateError};
use crate::tickets::{ResponseDelta, TicketError, TicketingClient};

use super::MonitorSettings;

#[derive(Debug, Error)]
pub enum TickError {
    #[error("Case {0} not found")]
    CaseMissing(String),

    #[error(transparent)]
    State(#[from] StateError),

    #[error(transparent)]
    Ticket(#[from] TicketError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Transition(#[from] TransitionError),
}

/// What one successful tick did
#[derive(Debug)]
pub struct TickReport {
    /// Newly applied response deltas
    pub applied: usize,
    pub outcome: Outcome,
    /// The case reached a determination; the session can end
    pub case_closed: bool,
}

/// Run one tick. The caller holds the per-case lock and persists the
/// session afterwards; on success this advances the session checkpoint
/// and clears its failure counters.
pub async fn run_tick(
    state: &StateManager,
    client: &dyn TicketingClient,
    engine: &TemplateEngine,
    settings: &MonitorSettings,
    session: &mut MonitoringSession,
) -> Result<TickReport, TickError> {
    let tick_started = Utc::now();
    let case_ref = session.case_ref.clone();

    let mut case = state
        .get_case(&case_ref)
        .await?
        .ok_or_else(|| TickError::CaseMissing(case_ref.clone()))?;

    // a case determined elsewhere (webhook, manual) ends the session
    if case.status.rank() >= CaseStatus::DeterminedAccepted.rank() {
        debug!(case_ref, status = case.status.as_str(), "Case already determined");
        let outcome = case.statistics.as_ref().map(|s| s.outcome).unwrap_or(Outcome::Pending);
        mark_success(session, tick_started);
        return Ok(TickReport {
            applied: 0,
            outcome,
            case_closed: true,
        });
    }

    // the first tick after dispatch moves the case into the polling state
    if case.status == CaseStatus::ProposalSent {
        advance(&mut case, CaseStatus::AwaitingResponses)?;
    }

    let deltas = client.fetch_responses(&case_ref, Some(session.last_checked_at)).await?;

    let mut applied = 0;
    for delta in deltas {
        if case.applied_responses.contains(&delta.response_id) {
            continue;
        }
        let Some(creditor) = case.creditor_mut(&delta.creditor_id) else {
            warn!(case_ref, creditor_id = %delta.creditor_id, response_id = %delta.response_id, "Response for unknown creditor, skipping");
            continue;
        };
        if creditor.apply_response(delta.status, delta.amount, delta.received_at) {
            applied += 1;
        }
        case.applied_responses.insert(delta.response_id);
    }

    let stats = aggregate::aggregate_case(&case, settings.threshold_percent, settings.response_deadline_days);
    let outcome = stats.outcome;
    case.statistics = Some(stats);
    case.touch();

    // applied responses become durable before any generation work, so
    // a fallback generation failure never re-applies them
    state.put_case(case.clone()).await?;

    // determination only fires in the awaiting phase; replies that
    // arrive earlier are recorded but decide nothing yet
    let case_closed = if case.status == CaseStatus::AwaitingResponses {
        settle_outcome(state, engine, &mut case, outcome, tick_started.date_naive()).await?
    } else {
        false
    };

    mark_success(session, tick_started);
    info!(case_ref, applied, ?outcome, case_closed, "Tick complete");
    Ok(TickReport {
        applied,
        outcome,
        case_closed,
    })
}

fn mark_success(session: &mut MonitoringSession, tick_started: chrono::DateTime<Utc>) {
    session.last_checked_at = tick_started;
    session.consecutive_failures = 0;
    session.erroring = false;
}

/// Result of one webhook-delivered response
#[derive(Debug)]
pub struct DeltaReport {
    /// False when the response was already applied or names an unknown
    /// creditor
    pub applied: bool,
    pub outcome: Outcome,
    pub case_closed: bool,
}

/// Apply one externally delivered response and run the same
/// determination a tick would. The caller holds the per-case lock.
pub async fn apply_delta(
    state: &StateManager,
    engine: &TemplateEngine,
    settings: &MonitorSettings,
    case_ref: &str,
    delta: &ResponseDelta,
) -> Result<DeltaReport, TickError> {
    let now = Utc::now();
    let mut case = state
        .get_case(case_ref)
        .await?
        .ok_or_else(|| TickError::CaseMissing(case_ref.to_string()))?;

    let prior_outcome = case.statistics.as_ref().map(|s| s.outcome).unwrap_or(Outcome::Pending);
    if case.status.rank() >= CaseStatus::DeterminedAccepted.rank() {
        return Ok(DeltaReport {
            applied: false,
            outcome: prior_outcome,
            case_closed: true,
        });
    }
    if case.applied_responses.contains(&delta.response_id) {
        debug!(case_ref, response_id = %delta.response_id, "Response already applied");
        return Ok(DeltaReport {
            applied: false,
            outcome: prior_outcome,
            case_closed: false,
        });
    }

    if case.status == CaseStatus::ProposalSent {
        advance(&mut case, CaseStatus::AwaitingResponses)?;
    }

    let applied = match case.creditor_mut(&delta.creditor_id) {
        Some(creditor) => creditor.apply_response(delta.status, delta.amount, delta.received_at),
        None => {
            warn!(case_ref, creditor_id = %delta.creditor_id, "Webhook response for unknown creditor");
            return Ok(DeltaReport {
                applied: false,
                outcome: prior_outcome,
                case_closed: false,
            });
        }
    };
    case.applied_responses.insert(delta.response_id.clone());

    let stats = aggregate::aggregate_case(&case, settings.threshold_percent, settings.response_deadline_days);
    let outcome = stats.outcome;
    case.statistics = Some(stats);
    case.touch();
    state.put_case(case.clone()).await?;

    let case_closed = if case.status == CaseStatus::AwaitingResponses {
        settle_outcome(state, engine, &mut case, outcome, now.date_naive()).await?
    } else {
        false
    };
    info!(case_ref, response_id = %delta.response_id, applied, ?outcome, "Webhook response processed");
    Ok(DeltaReport {
        applied,
        outcome,
        case_closed,
    })
}

/// Drive the case to its determined state if the outcome calls for it.
/// Returns whether the case is now closed for monitoring.
async fn settle_outcome(
    state: &StateManager,
    engine: &TemplateEngine,
    case: &mut Case,
    outcome: Outcome,
    as_of: chrono::NaiveDate,
) -> Result<bool, TickError> {
    match outcome {
        Outcome::Pending => Ok(false),
        Outcome::Accepted => {
            advance(case, CaseStatus::DeterminedAccepted)?;
            state.put_case(case.clone()).await?;
            Ok(true)
        }
        Outcome::Fallback => {
            if !case.has_batch(BatchKind::ZeroPaymentPlan.as_str()) {
                let documents = engine.generate(case, BatchKind::ZeroPaymentPlan, as_of)?;
                case.record_documents(documents.into_iter().map(|d| d.record).collect());
            }
            advance(case, CaseStatus::DeterminedFallbackSent)?;
            state.put_case(case.clone()).await?;
            Ok(true)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        Case, Creditor, Debtor, DocumentRecord, EmploymentStatus, FinancialSnapshot, Gender, MaritalStatus, Money,
        ResponseStatus,
    };
    use crate::tickets::ResponseDelta;
    use async_trait::async_trait;
    use chrono::DateTime;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Returns the same deltas on every fetch, like a real polling
    /// window that has not moved
    struct ScriptedClient {
        deltas: Mutex<Vec<ResponseDelta>>,
        fail: bool,
    }

    impl ScriptedClient {
        fn new(deltas: Vec<ResponseDelta>) -> Self {
            Self {
                deltas: Mutex::new(deltas),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                deltas: Mutex::new(Vec::new()),
                fail: true,
            }
        }
    }

    #[async_trait]
    impl TicketingClient for ScriptedClient {
        async fn fetch_responses(
            &self,
            _case_ref: &str,
            _since: Option<DateTime<Utc>>,
        ) -> Result<Vec<ResponseDelta>, TicketError> {
            if self.fail {
                return Err(TicketError::Api {
                    status: 503,
                    body: "unavailable".to_string(),
                });
            }
            Ok(self.deltas.lock().unwrap().clone())
        }
    }

    fn delta(id: &str, creditor_id: &str, status: ResponseStatus) -> ResponseDelta {
        ResponseDelta {
            response_id: id.to_string(),
            creditor_id: creditor_id.to_string(),
            status,
            amount: None,
            received_at: Utc::now(),
        }
    }

    fn awaiting_case() -> Case {
        let mut case = Case::new(
            "MAND_2024_007",
            Debtor {
                full_name: "Mustermann, Max".to_string(),
                street: "Musterstrasse".to_string(),
                house_number: "12".to_string(),
                postal_code: "45127".to_string(),
                city: "Essen".to_string(),
                phone: None,
                email: None,
                gender: Gender::Maennlich,
                marital_status: MaritalStatus::Ledig,
                employment: EmploymentStatus::Angestellt,
                children: 0,
            },
            FinancialSnapshot {
                net_income: Money::from_eur(2500),
                dependents: 0,
            },
        );
        case.creditors.push(Creditor::new("A", "addr", Money::from_eur(800)));
        case.creditors.push(Creditor::new("B", "addr", Money::from_eur(200)));
        case.plan = Some(crate::plan::calculate(&case.financials, &case.creditors).unwrap());
        advance(&mut case, CaseStatus::PlanCalculated).unwrap();
        case.record_documents(vec![DocumentRecord {
            id: "d1".to_string(),
            batch_kind: BatchKind::SettlementProposal.as_str().to_string(),
            kind: "settlement_proposal_letter".to_string(),
            generated_at: Utc::now(),
        }]);
        advance(&mut case, CaseStatus::ProposalSent).unwrap();
        advance(&mut case, CaseStatus::AwaitingResponses).unwrap();
        case
    }

    async fn setup(case: Case) -> (TempDir, StateManager, MonitoringSession) {
        let temp = TempDir::new().unwrap();
        let state = StateManager::spawn(temp.path()).unwrap();
        let session = MonitoringSession::new(case.reference.clone(), 5);
        state.put_case(case).await.unwrap();
        state.put_session(session.clone()).await.unwrap();
        (temp, state, session)
    }

    #[tokio::test]
    async fn test_deltas_apply_exactly_once() {
        let case = awaiting_case();
        let creditor_a = case.creditors[0].id.clone();
        let (_temp, state, mut session) = setup(case).await;
        let engine = TemplateEngine::new().unwrap();
        let settings = MonitorSettings::default();
        let client = ScriptedClient::new(vec![delta("resp-1", &creditor_a, ResponseStatus::Accepted)]);

        let first = run_tick(&state, &client, &engine, &settings, &mut session).await.unwrap();
        assert_eq!(first.applied, 1);
        assert_eq!(first.outcome, Outcome::Pending);

        // same delta reported again: dedup set absorbs it
        let second = run_tick(&state, &client, &engine, &settings, &mut session).await.unwrap();
        assert_eq!(second.applied, 0);

        let stored = state.get_case("MAND_2024_007").await.unwrap().unwrap();
        assert_eq!(stored.creditors[0].response_status, ResponseStatus::Accepted);
        assert!(stored.applied_responses.contains("resp-1"));
    }

    #[tokio::test]
    async fn test_accepted_quorum_closes_case() {
        let case = awaiting_case();
        let (a, b) = (case.creditors[0].id.clone(), case.creditors[1].id.clone());
        let (_temp, state, mut session) = setup(case).await;
        let engine = TemplateEngine::new().unwrap();
        let settings = MonitorSettings::default();
        let client = ScriptedClient::new(vec![
            delta("r1", &a, ResponseStatus::Accepted),
            delta("r2", &b, ResponseStatus::Accepted),
        ]);

        let report = run_tick(&state, &client, &engine, &settings, &mut session).await.unwrap();
        assert_eq!(report.outcome, Outcome::Accepted);
        assert!(report.case_closed);

        let stored = state.get_case("MAND_2024_007").await.unwrap().unwrap();
        assert_eq!(stored.status, CaseStatus::DeterminedAccepted);
    }

    #[tokio::test]
    async fn test_fallback_generates_zero_payment_batch() {
        let case = awaiting_case();
        let (a, b) = (case.creditors[0].id.clone(), case.creditors[1].id.clone());
        let (_temp, state, mut session) = setup(case).await;
        let engine = TemplateEngine::new().unwrap();
        let settings = MonitorSettings::default();
        let client = ScriptedClient::new(vec![
            delta("r1", &a, ResponseStatus::Declined),
            delta("r2", &b, ResponseStatus::CounterOffer),
        ]);

        let report = run_tick(&state, &client, &engine, &settings, &mut session).await.unwrap();
        assert_eq!(report.outcome, Outcome::Fallback);
        assert!(report.case_closed);

        let stored = state.get_case("MAND_2024_007").await.unwrap().unwrap();
        assert_eq!(stored.status, CaseStatus::DeterminedFallbackSent);
        assert!(stored.has_batch(BatchKind::ZeroPaymentPlan.as_str()));
    }

    #[tokio::test]
    async fn test_failed_fetch_leaves_checkpoint_untouched() {
        let case = awaiting_case();
        let (_temp, state, mut session) = setup(case).await;
        let engine = TemplateEngine::new().unwrap();
        let settings = MonitorSettings::default();
        let checkpoint = session.last_checked_at;

        let err = run_tick(&state, &ScriptedClient::failing(), &engine, &settings, &mut session)
            .await
            .unwrap_err();
        assert!(matches!(err, TickError::Ticket(_)));
        assert_eq!(session.last_checked_at, checkpoint);

        let stored = state.get_case("MAND_2024_007").await.unwrap().unwrap();
        assert_eq!(stored.status, CaseStatus::AwaitingResponses);
        assert!(stored.applied_responses.is_empty());
    }

    #[tokio::test]
    async fn test_apply_delta_is_idempotent() {
        let case = awaiting_case();
        let creditor_a = case.creditors[0].id.clone();
        let (_temp, state, _session) = setup(case).await;
        let engine = TemplateEngine::new().unwrap();
        let settings = MonitorSettings::default();
        let response = delta("resp-9", &creditor_a, ResponseStatus::Accepted);

        let first = apply_delta(&state, &engine, &settings, "MAND_2024_007", &response)
            .await
            .unwrap();
        assert!(first.applied);

        let second = apply_delta(&state, &engine, &settings, "MAND_2024_007", &response)
            .await
            .unwrap();
        assert!(!second.applied);

        let stored = state.get_case("MAND_2024_007").await.unwrap().unwrap();
        assert_eq!(stored.creditors[0].response_status, ResponseStatus::Accepted);
    }

    #[tokio::test]
    async fn test_determined_case_ends_session() {
        let mut case = awaiting_case();
        case.creditors[0].apply_response(ResponseStatus::Accepted, None, Utc::now());
        case.creditors[1].apply_response(ResponseStatus::Accepted, None, Utc::now());
        case.statistics = Some(aggregate::aggregate(&case.creditors, 50.0, false));
        advance(&mut case, CaseStatus::DeterminedAccepted).unwrap();

        let (_temp, state, mut session) = setup(case).await;
        let engine = TemplateEngine::new().unwrap();
        let settings = MonitorSettings::default();
        let client = ScriptedClient::new(Vec::new());

        let report = run_tick(&state, &client, &engine, &settings, &mut session).await.unwrap();
        assert!(report.case_closed);
        assert_eq!(report.applied, 0);
    }
}
