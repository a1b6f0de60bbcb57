//! Domain records for the settlement engine
//!
//! - [`Money`] - fixed-point EUR amounts (integer cents)
//! - [`Case`] - one debtor's settlement proceeding, keyed by case reference
//! - [`Creditor`] - a creditor claim within a case
//! - [`MonitoringSession`] - persisted polling session checkpoint

mod case;
mod creditor;
mod money;
mod session;

pub use case::{Case, CaseStatus, Debtor, DocumentRecord, EmploymentStatus, FinancialSnapshot, Gender, MaritalStatus};
pub use creditor::{Creditor, ResponseCorrection, ResponseStatus};
pub use money::Money;
pub use session::MonitoringSession;
