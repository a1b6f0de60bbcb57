//! The Case record - one debtor's settlement proceeding

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::aggregate::ResponseStats;
use crate::plan::SettlementPlan;

use super::{Creditor, Money};

/// Lifecycle status of a case.
///
/// Transitions are owned exclusively by [`crate::state::machine`];
/// everything else treats this field as read-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    /// Client data collection still in progress (external)
    Intake,
    /// Settlement plan computed from the financial snapshot
    PlanCalculated,
    /// Proposal batch generated and dispatched to all creditors
    ProposalSent,
    /// Monitoring creditor responses
    AwaitingResponses,
    /// Quorum reached on both axes; plan stands
    DeterminedAccepted,
    /// No quorum or no garnishable income; zero-payment batch sent
    DeterminedFallbackSent,
    /// Terminal; cases are archived, never deleted
    Archived,
}

impl CaseStatus {
    /// Position in the monotonic status ordering. Both determined
    /// outcomes share a rank; neither can follow the other.
    pub fn rank(&self) -> u8 {
        match self {
            CaseStatus::Intake => 0,
            CaseStatus::PlanCalculated => 1,
            CaseStatus::ProposalSent => 2,
            CaseStatus::AwaitingResponses => 3,
            CaseStatus::DeterminedAccepted | CaseStatus::DeterminedFallbackSent => 4,
            CaseStatus::Archived => 5,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, CaseStatus::Archived)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CaseStatus::Intake => "intake",
            CaseStatus::PlanCalculated => "plan_calculated",
            CaseStatus::ProposalSent => "proposal_sent",
            CaseStatus::AwaitingResponses => "awaiting_responses",
            CaseStatus::DeterminedAccepted => "determined_accepted",
            CaseStatus::DeterminedFallbackSent => "determined_fallback_sent",
            CaseStatus::Archived => "archived",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Maennlich,
    Weiblich,
    Divers,
}

impl Gender {
    /// Semantic option key in the field mapping catalog
    pub fn option_key(&self) -> &'static str {
        match self {
            Gender::Maennlich => "maennlich",
            Gender::Weiblich => "weiblich",
            Gender::Divers => "divers",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaritalStatus {
    Ledig,
    Verheiratet,
    Geschieden,
    Verwitwet,
}

impl MaritalStatus {
    pub fn option_key(&self) -> &'static str {
        match self {
            MaritalStatus::Ledig => "ledig",
            MaritalStatus::Verheiratet => "verheiratet",
            MaritalStatus::Geschieden => "geschieden",
            MaritalStatus::Verwitwet => "verwitwet",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmploymentStatus {
    Angestellt,
    Selbstaendig,
    Arbeitslos,
}

impl EmploymentStatus {
    pub fn option_key(&self) -> &'static str {
        match self {
            EmploymentStatus::Angestellt => "angestellt",
            EmploymentStatus::Selbstaendig => "selbstaendig",
            EmploymentStatus::Arbeitslos => "arbeitslos",
        }
    }
}

/// Debtor identity as it appears on the petition form
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Debtor {
    pub full_name: String,
    pub street: String,
    pub house_number: String,
    pub postal_code: String,
    pub city: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    pub gender: Gender,
    pub marital_status: MaritalStatus,
    pub employment: EmploymentStatus,
    /// Minor children living in the household
    pub children: u8,
}

/// Financial inputs for the plan calculation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinancialSnapshot {
    /// Monthly net income
    pub net_income: Money,
    /// Dependents for the garnishment table (spouse + children)
    pub dependents: u8,
}

/// Manifest entry for a generated document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: String,
    /// Batch this document belongs to (e.g. "settlement_proposal")
    pub batch_kind: String,
    /// Document kind within the batch (e.g. "schuldenbereinigungsplan")
    pub kind: String,
    pub generated_at: DateTime<Utc>,
}

/// One debtor's settlement proceeding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Case {
    /// Externally assigned, stable case reference ("Aktenzeichen")
    pub reference: String,

    pub status: CaseStatus,

    pub debtor: Debtor,

    pub financials: FinancialSnapshot,

    pub creditors: Vec<Creditor>,

    /// Computed settlement plan, present from plan_calculated onwards
    #[serde(default)]
    pub plan: Option<SettlementPlan>,

    /// Last aggregated response statistics
    #[serde(default)]
    pub statistics: Option<ResponseStats>,

    /// Generated-document manifest
    #[serde(default)]
    pub documents: Vec<DocumentRecord>,

    /// External response identities already applied (exactly-once)
    #[serde(default)]
    pub applied_responses: BTreeSet<String>,

    /// When the proposal batch went out (starts the response deadline)
    #[serde(default)]
    pub proposal_sent_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Case {
    pub fn new(reference: impl Into<String>, debtor: Debtor, financials: FinancialSnapshot) -> Self {
        let now = Utc::now();
        Self {
            reference: reference.into(),
            status: CaseStatus::Intake,
            debtor,
            financials,
            creditors: Vec::new(),
            plan: None,
            statistics: None,
            documents: Vec::new(),
            applied_responses: BTreeSet::new(),
            proposal_sent_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Total of all creditor claims
    pub fn total_debt(&self) -> Money {
        self.creditors.iter().map(|c| c.claim_amount).sum()
    }

    pub fn creditor_mut(&mut self, creditor_id: &str) -> Option<&mut Creditor> {
        self.creditors.iter_mut().find(|c| c.id == creditor_id)
    }

    /// Whether a document batch of this kind has already been generated
    pub fn has_batch(&self, batch_kind: &str) -> bool {
        self.documents.iter().any(|d| d.batch_kind == batch_kind)
    }

    /// Append generated documents to the manifest
    pub fn record_documents(&mut self, records: Vec<DocumentRecord>) {
        self.documents.extend(records);
        self.touch();
    }

    /// Whether the response deadline has elapsed since the proposal
    /// went out. Without a dispatch timestamp there is no deadline.
    pub fn response_deadline_elapsed(&self, now: DateTime<Utc>, deadline_days: i64) -> bool {
        match self.proposal_sent_at {
            Some(sent) => now - sent >= chrono::Duration::days(deadline_days),
            None => false,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ResponseStatus;

    pub(crate) fn test_debtor() -> Debtor {
        Debtor {
            full_name: "Mustermann, Max".to_string(),
            street: "Musterstrasse".to_string(),
            house_number: "12".to_string(),
            postal_code: "45127".to_string(),
            city: "Essen".to_string(),
            phone: Some("+49 201 123456".to_string()),
            email: Some("max@example.com".to_string()),
            gender: Gender::Maennlich,
            marital_status: MaritalStatus::Geschieden,
            employment: EmploymentStatus::Angestellt,
            children: 1,
        }
    }

    fn test_case() -> Case {
        let mut case = Case::new(
            "MAND_2024_001",
            test_debtor(),
            FinancialSnapshot {
                net_income: Money::from_eur(2200),
                dependents: 1,
            },
        );
        case.creditors.push(Creditor::new("A", "addr", Money::from_eur(100)));
        case.creditors.push(Creditor::new("B", "addr", Money::from_eur(200)));
        case
    }

    #[test]
    fn test_status_ranks_are_monotonic() {
        assert!(CaseStatus::Intake.rank() < CaseStatus::PlanCalculated.rank());
        assert!(CaseStatus::PlanCalculated.rank() < CaseStatus::ProposalSent.rank());
        assert!(CaseStatus::ProposalSent.rank() < CaseStatus::AwaitingResponses.rank());
        assert!(CaseStatus::AwaitingResponses.rank() < CaseStatus::DeterminedAccepted.rank());
        assert_eq!(
            CaseStatus::DeterminedAccepted.rank(),
            CaseStatus::DeterminedFallbackSent.rank()
        );
        assert!(CaseStatus::DeterminedFallbackSent.rank() < CaseStatus::Archived.rank());
    }

    #[test]
    fn test_total_debt() {
        let case = test_case();
        assert_eq!(case.total_debt(), Money::from_eur(300));
    }

    #[test]
    fn test_deadline_requires_dispatch_timestamp() {
        let mut case = test_case();
        let now = Utc::now();
        assert!(!case.response_deadline_elapsed(now, 30));

        case.proposal_sent_at = Some(now - chrono::Duration::days(31));
        assert!(case.response_deadline_elapsed(now, 30));

        case.proposal_sent_at = Some(now - chrono::Duration::days(5));
        assert!(!case.response_deadline_elapsed(now, 30));
    }

    #[test]
    fn test_creditor_mut_lookup() {
        let mut case = test_case();
        let id = case.creditors[0].id.clone();
        let creditor = case.creditor_mut(&id).unwrap();
        creditor.apply_response(ResponseStatus::Accepted, None, Utc::now());
        assert_eq!(case.creditors[0].response_status, ResponseStatus::Accepted);
    }

    #[test]
    fn test_batch_manifest() {
        let mut case = test_case();
        assert!(!case.has_batch("settlement_proposal"));
        case.record_documents(vec![DocumentRecord {
            id: "d1".to_string(),
            batch_kind: "settlement_proposal".to_string(),
            kind: "schuldenbereinigungsplan".to_string(),
            generated_at: Utc::now(),
        }]);
        assert!(case.has_batch("settlement_proposal"));
    }
}
