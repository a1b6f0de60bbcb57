//! Creditor records and their response lifecycle

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::Money;

/// A creditor's answer to a settlement proposal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    /// No answer received yet
    NoResponse,
    /// Creditor accepts the proposed quota
    Accepted,
    /// Creditor rejects the proposal
    Declined,
    /// Creditor proposes different terms (counted as declined for quorum)
    CounterOffer,
}

impl ResponseStatus {
    /// A terminal status can no longer change through normal polling
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ResponseStatus::NoResponse)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseStatus::NoResponse => "no_response",
            ResponseStatus::Accepted => "accepted",
            ResponseStatus::Declined => "declined",
            ResponseStatus::CounterOffer => "counter_offer",
        }
    }
}

/// Audit entry for a manual response correction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseCorrection {
    pub previous_status: ResponseStatus,
    pub new_status: ResponseStatus,
    pub reason: String,
    pub corrected_at: DateTime<Utc>,
}

/// One creditor claim within a case
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Creditor {
    /// Stable creditor id within the case
    pub id: String,

    /// Creditor name as it appears on legal documents
    pub name: String,

    /// Postal address (single formatted block)
    pub address: String,

    /// Contact address for dispatch, if known
    #[serde(default)]
    pub email: Option<String>,

    /// Claimed amount (non-negative)
    pub claim_amount: Money,

    /// Response state; moves from no_response to a terminal value once
    pub response_status: ResponseStatus,

    /// Amount offered in a counter-offer, if any
    #[serde(default)]
    pub response_amount: Option<Money>,

    /// When the terminal response arrived
    #[serde(default)]
    pub responded_at: Option<DateTime<Utc>>,

    /// Audited manual corrections (empty in the normal flow)
    #[serde(default)]
    pub corrections: Vec<ResponseCorrection>,
}

impl Creditor {
    pub fn new(name: impl Into<String>, address: impl Into<String>, claim_amount: Money) -> Self {
        Self {
            id: uuid::Uuid::now_v7().to_string(),
            name: name.into(),
            address: address.into(),
            email: None,
            claim_amount,
            response_status: ResponseStatus::NoResponse,
            response_amount: None,
            responded_at: None,
            corrections: Vec::new(),
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Apply a polled response delta.
    ///
    /// Returns true if the creditor state changed. A creditor that has
    /// already reached a terminal status ignores further deltas; the
    /// correction path below is the only way to change it again.
    pub fn apply_response(&mut self, status: ResponseStatus, amount: Option<Money>, at: DateTime<Utc>) -> bool {
        if self.response_status.is_terminal() {
            return false;
        }
        if !status.is_terminal() {
            return false;
        }
        self.response_status = status;
        self.response_amount = amount;
        self.responded_at = Some(at);
        true
    }

    /// Manually override a recorded response. Audited: the previous
    /// state is kept in the corrections list and the override is logged.
    pub fn correct_response(&mut self, status: ResponseStatus, amount: Option<Money>, reason: impl Into<String>) {
        let reason = reason.into();
        warn!(
            creditor = %self.name,
            from = self.response_status.as_str(),
            to = status.as_str(),
            %reason,
            "Manual response correction"
        );
        self.corrections.push(ResponseCorrection {
            previous_status: self.response_status,
            new_status: status,
            reason,
            corrected_at: Utc::now(),
        });
        self.response_status = status;
        self.response_amount = amount;
        self.responded_at = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creditor() -> Creditor {
        Creditor::new("Sparkasse Essen", "Sparkassenplatz 1, 45127 Essen", Money::from_eur(1200))
    }

    #[test]
    fn test_apply_response_once() {
        let mut c = creditor();
        let changed = c.apply_response(ResponseStatus::Accepted, None, Utc::now());
        assert!(changed);
        assert_eq!(c.response_status, ResponseStatus::Accepted);
        assert!(c.responded_at.is_some());
    }

    #[test]
    fn test_terminal_response_is_immutable() {
        let mut c = creditor();
        c.apply_response(ResponseStatus::Declined, None, Utc::now());
        let changed = c.apply_response(ResponseStatus::Accepted, None, Utc::now());
        assert!(!changed);
        assert_eq!(c.response_status, ResponseStatus::Declined);
    }

    #[test]
    fn test_no_response_delta_is_ignored() {
        let mut c = creditor();
        let changed = c.apply_response(ResponseStatus::NoResponse, None, Utc::now());
        assert!(!changed);
        assert_eq!(c.response_status, ResponseStatus::NoResponse);
    }

    #[test]
    fn test_correction_is_audited() {
        let mut c = creditor();
        c.apply_response(ResponseStatus::Declined, None, Utc::now());
        c.correct_response(ResponseStatus::Accepted, None, "creditor letter misclassified");

        assert_eq!(c.response_status, ResponseStatus::Accepted);
        assert_eq!(c.corrections.len(), 1);
        assert_eq!(c.corrections[0].previous_status, ResponseStatus::Declined);
        assert_eq!(c.corrections[0].new_status, ResponseStatus::Accepted);
    }
}
