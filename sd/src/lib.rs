//! Settlementd - settlement case lifecycle engine
//!
//! Drives consumer debt settlement cases from intake to determination:
//! calculates distribution plans from garnishable income, generates the
//! creditor-facing document batches, polls the ticketing system for
//! creditor responses and determines acceptance by a dual quorum
//! (head-count and claim-sum).
//!
//! # Core Concepts
//!
//! - **Monotonic lifecycle**: a case only moves forward; both final
//!   determinations share a rank and exclude each other
//! - **Exactly-once responses**: every external reply carries an
//!   identity; polling and webhooks share one dedup set
//! - **Checkpointed monitoring**: a session's window only advances
//!   after a tick fully succeeds
//! - **Deterministic documents**: one case snapshot plus one date
//!   yields byte-identical batch content
//!
//! # Modules
//!
//! - [`domain`] - Case, creditor, money and session records
//! - [`plan`] - Garnishment table and plan calculator
//! - [`aggregate`] - Creditor response statistics and quorum outcome
//! - [`state`] - Transition rules and the store actor
//! - [`templates`] - Document batches and the template engine
//! - [`formfill`] - Field catalog for the petition form
//! - [`tickets`] - Ticketing client for response polling
//! - [`monitor`] - Per-case polling loops
//! - [`http`] - HTTP control surface

pub mod aggregate;
pub mod cli;
pub mod config;
pub mod domain;
pub mod formfill;
pub mod http;
pub mod monitor;
pub mod plan;
pub mod state;
pub mod templates;
pub mod tickets;

// Re-export commonly used types
pub use aggregate::{Outcome, ResponseStats};
pub use config::Config;
pub use domain::{Case, CaseStatus, Creditor, Debtor, Money, MonitoringSession, ResponseStatus};
pub use monitor::{MonitorRegistry, MonitorSettings};
pub use plan::{PlanKind, SettlementPlan, calculate, garnishable_income};
pub use state::{StateManager, advance};
pub use templates::{BatchKind, TemplateEngine};
pub use tickets::{TicketingClient, ZendeskClient};
