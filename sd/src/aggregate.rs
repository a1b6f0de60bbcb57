//! Creditor Response Aggregator
//!
//! Turns a case's creditor list into a frozen statistics snapshot. The
//! snapshot is attached to the Case and is the sole input for any
//! follow-up document generation; nothing downstream re-reads the
//! creditor list.
//!
//! Counter-offers count as declined for quorum purposes but are
//! reported distinctly.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{Case, Creditor, Money, ResponseStatus};

/// Default acceptance threshold: simple majority on both axes
pub const DEFAULT_THRESHOLD_PERCENT: f64 = 50.0;

/// Final determination derived from the statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Creditors without a terminal response remain and the deadline
    /// has not elapsed; no determination yet
    Pending,
    /// Both head-count and claim-sum majorities exceed the threshold
    Accepted,
    /// All responses are in (or the deadline elapsed) without a quorum
    Fallback,
}

/// Frozen acceptance statistics for one case
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseStats {
    pub count_total: usize,
    pub count_accepted: usize,
    /// Declines plus counter-offers (quorum view)
    pub count_declined_or_counter: usize,
    /// Counter-offers alone (reporting view)
    pub count_counter_offer: usize,
    pub count_no_response: usize,
    pub sum_accepted: Money,
    pub sum_total: Money,
    pub outcome: Outcome,
    /// Threshold the outcome was computed against, in percent
    pub threshold_percent: f64,
    pub computed_at: chrono::DateTime<chrono::Utc>,
}

impl ResponseStats {
    pub fn acceptance_count_percent(&self) -> f64 {
        if self.count_total == 0 {
            return 0.0;
        }
        self.count_accepted as f64 / self.count_total as f64 * 100.0
    }

    pub fn acceptance_sum_percent(&self) -> f64 {
        self.sum_accepted.percentage_of(self.sum_total)
    }
}

/// Aggregate a creditor list into a statistics snapshot.
///
/// `deadline_elapsed` converts remaining non-responders from blocking
/// (Pending) into a final determination using only the responses
/// received: they stay in both denominators, so silence never helps a
/// plan across the threshold.
pub fn aggregate(creditors: &[Creditor], threshold_percent: f64, deadline_elapsed: bool) -> ResponseStats {
    let count_total = creditors.len();
    let mut count_accepted = 0;
    let mut count_declined_or_counter = 0;
    let mut count_counter_offer = 0;
    let mut count_no_response = 0;
    let mut sum_accepted = Money::ZERO;
    let sum_total: Money = creditors.iter().map(|c| c.claim_amount).sum();

    for creditor in creditors {
        match creditor.response_status {
            ResponseStatus::Accepted => {
                count_accepted += 1;
                sum_accepted += creditor.claim_amount;
            }
            ResponseStatus::Declined => count_declined_or_counter += 1,
            ResponseStatus::CounterOffer => {
                count_declined_or_counter += 1;
                count_counter_offer += 1;
            }
            ResponseStatus::NoResponse => count_no_response += 1,
        }
    }

    let outcome = if count_total == 0 {
        Outcome::Pending
    } else if count_no_response > 0 && !deadline_elapsed {
        Outcome::Pending
    } else {
        let count_ok = percent(count_accepted as i64, count_total as i64) > threshold_percent;
        let sum_ok = if sum_total.is_zero() {
            false
        } else {
            percent(sum_accepted.cents(), sum_total.cents()) > threshold_percent
        };
        if count_ok && sum_ok { Outcome::Accepted } else { Outcome::Fallback }
    };

    debug!(
        count_total,
        count_accepted,
        count_declined_or_counter,
        count_no_response,
        ?outcome,
        "Aggregated creditor responses"
    );

    ResponseStats {
        count_total,
        count_accepted,
        count_declined_or_counter,
        count_counter_offer,
        count_no_response,
        sum_accepted,
        sum_total,
        outcome,
        threshold_percent,
        computed_at: Utc::now(),
    }
}

/// Aggregate using a case's own deadline state
pub fn aggregate_case(case: &Case, threshold_percent: f64, deadline_days: i64) -> ResponseStats {
    let deadline_elapsed = case.response_deadline_elapsed(Utc::now(), deadline_days);
    aggregate(&case.creditors, threshold_percent, deadline_elapsed)
}

fn percent(part: i64, total: i64) -> f64 {
    part as f64 / total as f64 * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn creditor(name: &str, claim_eur: i64, status: ResponseStatus) -> Creditor {
        let mut c = Creditor::new(name, "addr", Money::from_eur(claim_eur));
        if status.is_terminal() {
            c.apply_response(status, None, Utc::now());
        }
        c
    }

    #[test]
    fn test_two_of_three_accept_on_both_axes() {
        // claims {100, 200, 700}; 100 and 700 accept, 200 declines
        let creditors = vec![
            creditor("A", 100, ResponseStatus::Accepted),
            creditor("B", 200, ResponseStatus::Declined),
            creditor("C", 700, ResponseStatus::Accepted),
        ];
        let stats = aggregate(&creditors, DEFAULT_THRESHOLD_PERCENT, false);

        assert_eq!(stats.count_accepted, 2);
        assert_eq!(stats.count_total, 3);
        assert_eq!(stats.sum_accepted, Money::from_eur(800));
        assert_eq!(stats.sum_total, Money::from_eur(1000));
        assert_eq!(stats.outcome, Outcome::Accepted);
    }

    #[test]
    fn test_all_decline_routes_to_fallback() {
        let creditors = vec![
            creditor("A", 100, ResponseStatus::Declined),
            creditor("B", 200, ResponseStatus::Declined),
            creditor("C", 700, ResponseStatus::Declined),
        ];
        let stats = aggregate(&creditors, DEFAULT_THRESHOLD_PERCENT, false);
        assert_eq!(stats.outcome, Outcome::Fallback);
        assert_eq!(stats.count_declined_or_counter, 3);
    }

    #[test]
    fn test_no_response_blocks_determination() {
        let creditors = vec![
            creditor("A", 100, ResponseStatus::Accepted),
            creditor("B", 200, ResponseStatus::NoResponse),
        ];
        let stats = aggregate(&creditors, DEFAULT_THRESHOLD_PERCENT, false);
        assert_eq!(stats.outcome, Outcome::Pending);
        assert_eq!(stats.count_no_response, 1);
    }

    #[test]
    fn test_deadline_converts_pending_to_determination() {
        // 2 of 3 accepted by amount and count; third silent past deadline
        let creditors = vec![
            creditor("A", 700, ResponseStatus::Accepted),
            creditor("B", 200, ResponseStatus::Accepted),
            creditor("C", 100, ResponseStatus::NoResponse),
        ];
        let stats = aggregate(&creditors, DEFAULT_THRESHOLD_PERCENT, true);
        assert_eq!(stats.outcome, Outcome::Accepted);
    }

    #[test]
    fn test_silence_does_not_count_towards_acceptance() {
        // One acceptance out of three; silence for the rest must not
        // shrink the denominators
        let creditors = vec![
            creditor("A", 700, ResponseStatus::Accepted),
            creditor("B", 200, ResponseStatus::NoResponse),
            creditor("C", 100, ResponseStatus::NoResponse),
        ];
        let stats = aggregate(&creditors, DEFAULT_THRESHOLD_PERCENT, true);
        // 1/3 by count fails even though 70% by sum passes
        assert_eq!(stats.outcome, Outcome::Fallback);
    }

    #[test]
    fn test_counter_offer_counts_as_declined_but_reported() {
        let creditors = vec![
            creditor("A", 500, ResponseStatus::Accepted),
            creditor("B", 500, ResponseStatus::CounterOffer),
        ];
        let stats = aggregate(&creditors, DEFAULT_THRESHOLD_PERCENT, false);
        assert_eq!(stats.count_declined_or_counter, 1);
        assert_eq!(stats.count_counter_offer, 1);
        // 50% does not exceed 50%
        assert_eq!(stats.outcome, Outcome::Fallback);
    }

    #[test]
    fn test_majority_must_hold_on_both_axes() {
        // head-count majority accepts, but the big claim declines
        let creditors = vec![
            creditor("A", 50, ResponseStatus::Accepted),
            creditor("B", 50, ResponseStatus::Accepted),
            creditor("C", 900, ResponseStatus::Declined),
        ];
        let stats = aggregate(&creditors, DEFAULT_THRESHOLD_PERCENT, false);
        assert_eq!(stats.outcome, Outcome::Fallback);
    }

    #[test]
    fn test_empty_creditor_list_is_pending() {
        let stats = aggregate(&[], DEFAULT_THRESHOLD_PERCENT, true);
        assert_eq!(stats.outcome, Outcome::Pending);
    }
}
