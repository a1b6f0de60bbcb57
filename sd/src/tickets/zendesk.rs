//! Zendesk side-conversation client

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::domain::{Money, ResponseStatus};

use super::client::{ResponseDelta, TicketError, TicketingClient};

/// Reads creditor replies from the Zendesk side-conversation export
/// endpoint. One ticket per case, one side conversation per creditor.
pub struct ZendeskClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl ZendeskClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct WirePage {
    responses: Vec<WireResponse>,
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    id: String,
    creditor_id: String,
    status: String,
    #[serde(default)]
    amount_cents: Option<i64>,
    received_at: DateTime<Utc>,
}

fn parse_status(raw: &str) -> Option<ResponseStatus> {
    match raw {
        "accepted" => Some(ResponseStatus::Accepted),
        "declined" => Some(ResponseStatus::Declined),
        "counter_offer" => Some(ResponseStatus::CounterOffer),
        _ => None,
    }
}

#[async_trait]
impl TicketingClient for ZendeskClient {
    async fn fetch_responses(
        &self,
        case_ref: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<ResponseDelta>, TicketError> {
        let url = format!("{}/api/v2/case-responses/{}", self.base_url, case_ref);
        debug!(case_ref, url = %url, "Fetching creditor responses");

        let mut request = self.http.get(&url).bearer_auth(&self.token);
        if let Some(since) = since {
            request = request.query(&[("since", since.to_rfc3339())]);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TicketError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let page: WirePage = response
            .json()
            .await
            .map_err(|e| TicketError::Decode(e.to_string()))?;

        let mut deltas = Vec::with_capacity(page.responses.len());
        for wire in page.responses {
            // unknown statuses are skipped, not fatal; the platform
            // adds reply kinds we do not track
            let Some(status) = parse_status(&wire.status) else {
                warn!(case_ref, response_id = %wire.id, status = %wire.status, "Skipping response with unknown status");
                continue;
            };
            deltas.push(ResponseDelta {
                response_id: wire.id,
                creditor_id: wire.creditor_id,
                status,
                amount: wire.amount_cents.map(Money::from_cents),
                received_at: wire.received_at,
            });
        }

        debug!(case_ref, count = deltas.len(), "Responses fetched");
        Ok(deltas)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_status() {
        assert_eq!(parse_status("accepted"), Some(ResponseStatus::Accepted));
        assert_eq!(parse_status("declined"), Some(ResponseStatus::Declined));
        assert_eq!(parse_status("counter_offer"), Some(ResponseStatus::CounterOffer));
        assert_eq!(parse_status("forwarded"), None);
    }

    #[test]
    fn test_wire_decoding() {
        let payload = r#"{
            "responses": [
                {"id": "resp-1", "creditor_id": "c-1", "status": "accepted",
                 "amount_cents": 12550, "received_at": "2026-01-10T09:30:00Z"},
                {"id": "resp-2", "creditor_id": "c-2", "status": "declined",
                 "received_at": "2026-01-11T14:00:00Z"}
            ]
        }"#;
        let page: WirePage = serde_json::from_str(payload).unwrap();
        assert_eq!(page.responses.len(), 2);
        assert_eq!(page.responses[0].amount_cents, Some(12550));
        assert_eq!(page.responses[1].amount_cents, None);
    }
}
