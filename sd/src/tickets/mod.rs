//! Creditor response ingestion from the ticketing system
//!
//! Creditor replies arrive as side conversations in the external
//! ticketing platform. The monitor only sees them through the
//! [`TicketingClient`] trait; the HTTP implementation lives in
//! [`zendesk`].

mod client;
pub mod zendesk;

pub use client::{ResponseDelta, TicketError, TicketingClient};
pub use zendesk::ZendeskClient;
