//! Document batches
//!
//! A batch is the fixed set of documents one lifecycle step produces.
//! Each document declares its render target and the top-level context
//! slots it consumes; the engine checks both when it loads.

use serde::{Deserialize, Serialize};

/// How a document in a batch is produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderTarget {
    /// Handlebars template registered under this name
    Template(&'static str),
    /// Field-by-field fill of the official petition form
    PetitionForm,
}

/// One document of a batch
#[derive(Debug, Clone, Copy)]
pub struct DocumentSpec {
    /// Stable kind identifier, also used in filenames
    pub kind: &'static str,
    pub target: RenderTarget,
    /// Top-level context slots this document needs
    pub required_slots: &'static [&'static str],
}

const CLAIM_LIST_SLOTS: &[&str] = &[
    "aktenzeichen",
    "mandant_name",
    "datum_heute",
    "glaeubiger",
    "gesamtschulden",
    "anzahl_glaeubiger",
];

const LETTER_SLOTS: &[&str] = &[
    "aktenzeichen",
    "ort",
    "datum_heute",
    "mandant_name",
    "mandant_strasse",
    "mandant_hausnummer",
    "mandant_plz",
    "mandant_ort",
    "gesamtschulden",
    "laufzeit_monate",
    "plan_beginn",
    "antwortfrist",
];

const PROPOSAL_LETTER_SLOTS: &[&str] = &[
    "aktenzeichen",
    "ort",
    "datum_heute",
    "mandant_name",
    "mandant_strasse",
    "mandant_hausnummer",
    "mandant_plz",
    "mandant_ort",
    "gesamtschulden",
    "laufzeit_monate",
    "plan_beginn",
    "antwortfrist",
    "pfaendbarer_betrag",
    "tilgungsquote",
];

const SCHEDULE_SLOTS: &[&str] = &[
    "aktenzeichen",
    "mandant_name",
    "plan_beginn",
    "laufzeit_monate",
    "pfaendbarer_betrag",
    "glaeubiger",
    "tilgungsquote",
];

const SETTLEMENT_PROPOSAL_DOCS: &[DocumentSpec] = &[
    DocumentSpec {
        kind: "settlement_proposal_letter",
        target: RenderTarget::Template("settlement_proposal_letter"),
        required_slots: PROPOSAL_LETTER_SLOTS,
    },
    DocumentSpec {
        kind: "claim_list",
        target: RenderTarget::Template("claim_list"),
        required_slots: CLAIM_LIST_SLOTS,
    },
    DocumentSpec {
        kind: "repayment_schedule",
        target: RenderTarget::Template("repayment_schedule"),
        required_slots: SCHEDULE_SLOTS,
    },
];

const ZERO_PAYMENT_DOCS: &[DocumentSpec] = &[
    DocumentSpec {
        kind: "zero_payment_letter",
        target: RenderTarget::Template("zero_payment_letter"),
        required_slots: LETTER_SLOTS,
    },
    DocumentSpec {
        kind: "claim_list",
        target: RenderTarget::Template("claim_list"),
        required_slots: CLAIM_LIST_SLOTS,
    },
];

const INSOLVENCY_PETITION_DOCS: &[DocumentSpec] = &[DocumentSpec {
    kind: "insolvency_petition_form",
    target: RenderTarget::PetitionForm,
    required_slots: &[],
}];

/// The three batches a case can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchKind {
    SettlementProposal,
    ZeroPaymentPlan,
    InsolvencyPetition,
}

impl BatchKind {
    pub const ALL: &'static [BatchKind] = &[
        BatchKind::SettlementProposal,
        BatchKind::ZeroPaymentPlan,
        BatchKind::InsolvencyPetition,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BatchKind::SettlementProposal => "settlement_proposal",
            BatchKind::ZeroPaymentPlan => "zero_payment_plan",
            BatchKind::InsolvencyPetition => "insolvency_petition",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|b| b.as_str() == s)
    }

    pub fn documents(&self) -> &'static [DocumentSpec] {
        match self {
            BatchKind::SettlementProposal => SETTLEMENT_PROPOSAL_DOCS,
            BatchKind::ZeroPaymentPlan => ZERO_PAYMENT_DOCS,
            BatchKind::InsolvencyPetition => INSOLVENCY_PETITION_DOCS,
        }
    }

    /// Whether the batch needs a calculated settlement plan on the case
    pub fn requires_plan(&self) -> bool {
        matches!(self, BatchKind::SettlementProposal)
    }
}

impl std::fmt::Display for BatchKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
