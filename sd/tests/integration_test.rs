//! End-to-end lifecycle tests against a real store directory

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tempfile::TempDir;

use settlementd::monitor::{MonitorRegistry, MonitorSettings, StartOutcome};
use settlementd::state::{StateManager, advance};
use settlementd::templates::{BatchKind, TemplateEngine};
use settlementd::tickets::{ResponseDelta, TicketError, TicketingClient};
use settlementd::{Case, CaseStatus, Creditor, Debtor, Money, ResponseStatus, plan};

struct ScriptedClient {
    deltas: Vec<ResponseDelta>,
}

#[async_trait]
impl TicketingClient for ScriptedClient {
    async fn fetch_responses(
        &self,
        _case_ref: &str,
        _since: Option<DateTime<Utc>>,
    ) -> Result<Vec<ResponseDelta>, TicketError> {
        Ok(self.deltas.clone())
    }
}

fn debtor() -> Debtor {
    Debtor {
        full_name: "Mustermann, Max".to_string(),
        street: "Musterstrasse".to_string(),
        house_number: "12".to_string(),
        postal_code: "45127".to_string(),
        city: "Essen".to_string(),
        phone: None,
        email: None,
        gender: settlementd::domain::Gender::Maennlich,
        marital_status: settlementd::domain::MaritalStatus::Ledig,
        employment: settlementd::domain::EmploymentStatus::Angestellt,
        children: 0,
    }
}

/// Build a case that has gone through plan calculation and proposal
/// dispatch and now awaits creditor responses
fn awaiting_case(reference: &str) -> Case {
    let mut case = Case::new(
        reference,
        debtor(),
        settlementd::domain::FinancialSnapshot {
            net_income: Money::from_eur(2600),
            dependents: 0,
        },
    );
    case.creditors.push(Creditor::new("Bank AG", "Bankstr. 1", Money::from_eur(6000)));
    case.creditors.push(Creditor::new("Versand GmbH", "Postweg 2", Money::from_eur(4000)));
    case.plan = Some(plan::calculate(&case.financials, &case.creditors).unwrap());
    advance(&mut case, CaseStatus::PlanCalculated).unwrap();

    let engine = TemplateEngine::new().unwrap();
    let as_of = NaiveDate::from_ymd_opt(2026, 1, 15).unwrap();
    let docs = engine.generate(&case, BatchKind::SettlementProposal, as_of).unwrap();
    case.record_documents(docs.into_iter().map(|d| d.record).collect());
    advance(&mut case, CaseStatus::ProposalSent).unwrap();
    advance(&mut case, CaseStatus::AwaitingResponses).unwrap();
    case
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

async fn wait_for_status(state: &StateManager, case_ref: &str, target: CaseStatus) -> Case {
    for _ in 0..200 {
        let case = state.get_case(case_ref).await.unwrap().unwrap();
        if case.status == target {
            return case;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("case {case_ref} never reached {}", target.as_str());
}

#[tokio::test]
async fn test_monitoring_drives_case_to_acceptance() {
    let temp = TempDir::new().unwrap();
    let state = StateManager::spawn(temp.path()).unwrap();

    let case = awaiting_case("MAND_2026_001");
    let ids: Vec<String> = case.creditors.iter().map(|c| c.id.clone()).collect();
    state.put_case(case).await.unwrap();

    let client = ScriptedClient {
        deltas: vec![
            delta("r1", &ids[0], ResponseStatus::Accepted),
            delta("r2", &ids[1], ResponseStatus::Accepted),
        ],
    };
    let registry = MonitorRegistry::new(
        state.clone(),
        Arc::new(client),
        TemplateEngine::new().unwrap(),
        MonitorSettings::default(),
    );

    assert_eq!(
        registry.start("MAND_2026_001", Some(5)).await.unwrap(),
        StartOutcome::Started
    );

    let case = wait_for_status(&state, "MAND_2026_001", CaseStatus::DeterminedAccepted).await;
    let stats = case.statistics.unwrap();
    assert_eq!(stats.count_accepted, 2);
    assert_eq!(stats.sum_accepted, Money::from_eur(10000));

    // responses were applied exactly once despite repeated reporting
    assert_eq!(case.applied_responses.len(), 2);

    // the session ends itself once the case is determined
    for _ in 0..200 {
        let status = registry.status().await.unwrap();
        if status.active_sessions_count == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(registry.status().await.unwrap().active_sessions_count, 0);
    registry.shutdown().await;
}

#[tokio::test]
async fn test_declined_plan_falls_back_to_zero_payment() {
    let temp = TempDir::new().unwrap();
    let state = StateManager::spawn(temp.path()).unwrap();

    let case = awaiting_case("MAND_2026_002");
    let ids: Vec<String> = case.creditors.iter().map(|c| c.id.clone()).collect();
    state.put_case(case).await.unwrap();

    let client = ScriptedClient {
        deltas: vec![
            delta("r1", &ids[0], ResponseStatus::Declined),
            delta("r2", &ids[1], ResponseStatus::CounterOffer),
        ],
    };
    let registry = MonitorRegistry::new(
        state.clone(),
        Arc::new(client),
        TemplateEngine::new().unwrap(),
        MonitorSettings::default(),
    );
    registry.start("MAND_2026_002", Some(5)).await.unwrap();

    let case = wait_for_status(&state, "MAND_2026_002", CaseStatus::DeterminedFallbackSent).await;
    assert!(case.has_batch(BatchKind::ZeroPaymentPlan.as_str()));
    let stats = case.statistics.unwrap();
    assert_eq!(stats.count_declined_or_counter, 2);
    assert_eq!(stats.count_counter_offer, 1);
    registry.shutdown().await;
}

#[tokio::test]
async fn test_state_survives_manager_restart() {
    let temp = TempDir::new().unwrap();

    {
        let state = StateManager::spawn(temp.path()).unwrap();
        state.put_case(awaiting_case("MAND_2026_003")).await.unwrap();
        state
            .put_session(settlementd::MonitoringSession::new("MAND_2026_003", 15))
            .await
            .unwrap();
        state.shutdown().await;
    }

    let state = StateManager::spawn(temp.path()).unwrap();
    let case = state.get_case("MAND_2026_003").await.unwrap().unwrap();
    assert_eq!(case.status, CaseStatus::AwaitingResponses);
    assert_eq!(case.creditors.len(), 2);
    assert!(case.plan.is_some());

    let session = state.get_session("MAND_2026_003").await.unwrap().unwrap();
    assert_eq!(session.interval_minutes, 15);
    assert!(session.active);
}

#[tokio::test]
async fn test_batch_regeneration_is_byte_identical() {
    let engine = TemplateEngine::new().unwrap();
    let case = awaiting_case("MAND_2026_004");
    let as_of = NaiveDate::from_ymd_opt(2026, 2, 1).unwrap();

    let first = engine.generate(&case, BatchKind::SettlementProposal, as_of).unwrap();
    let second = engine.generate(&case, BatchKind::SettlementProposal, as_of).unwrap();
    assert_eq!(first.len(), second.len());
    for (a, b) in first.iter().zip(second.iter()) {
        assert_eq!(a.body, b.body);
    }
}

#[tokio::test]
async fn test_lifecycle_never_moves_backward() {
    let mut case = awaiting_case("MAND_2026_005");
    for target in [CaseStatus::Intake, CaseStatus::PlanCalculated, CaseStatus::ProposalSent] {
        assert!(advance(&mut case, target).is_err());
        assert_eq!(case.status, CaseStatus::AwaitingResponses);
    }
}
