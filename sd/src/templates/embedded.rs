//! Document templates embedded at compile time
//!
//! Templates ship inside the binary so a deployment can never run
//! against a stale or missing template directory.

pub const SETTLEMENT_PROPOSAL_LETTER: &str = include_str!("../../templates/settlement_proposal_letter.hbs");
pub const CLAIM_LIST: &str = include_str!("../../templates/claim_list.hbs");
pub const REPAYMENT_SCHEDULE: &str = include_str!("../../templates/repayment_schedule.hbs");
pub const ZERO_PAYMENT_LETTER: &str = include_str!("../../templates/zero_payment_letter.hbs");

/// (registration name, source) for every embedded template
pub const ALL: &[(&str, &str)] = &[
    ("settlement_proposal_letter", SETTLEMENT_PROPOSAL_LETTER),
    ("claim_list", CLAIM_LIST),
    ("repayment_schedule", REPAYMENT_SCHEDULE),
    ("zero_payment_letter", ZERO_PAYMENT_LETTER),
];

pub fn source(name: &str) -> Option<&'static str> {
    ALL.iter().find(|(n, _)| *n == name).map(|(_, s)| *s)
}
