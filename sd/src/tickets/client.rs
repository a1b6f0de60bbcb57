//! Client trait and wire types for response ingestion

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{Money, ResponseStatus};

/// Failures talking to the ticketing system
#[derive(Debug, Error)]
pub enum TicketError {
    #[error("Ticketing request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Ticketing API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Unparseable ticketing payload: {0}")]
    Decode(String),
}

/// One creditor reply as reported by the ticketing system.
///
/// `response_id` is the external identity used for exactly-once
/// application; the same reply may be reported on any number of
/// consecutive fetches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseDelta {
    pub response_id: String,
    pub creditor_id: String,
    pub status: ResponseStatus,
    #[serde(default)]
    pub amount: Option<Money>,
    pub received_at: DateTime<Utc>,
}

/// Source of creditor responses for one case
#[async_trait]
pub trait TicketingClient: Send + Sync {
    /// Fetch replies for a case, optionally only those received after
    /// `since`. Returning already-reported replies is allowed; the
    /// caller deduplicates by `response_id`.
    async fn fetch_responses(
        &self,
        case_ref: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<ResponseDelta>, TicketError>;
}
