//! CaseStore - keyed JSON record persistence
//!
//! Persists settlement engine records (cases, monitoring sessions) as
//! one JSON file per record, grouped into collections. The daemon owns
//! all writes; this crate only guarantees that a record read back is
//! either the previous or the new version, never a torn write.
//!
//! # Layout
//!
//! ```text
//! .casestore/
//! ├── cases/
//! │   ├── MAND_2024_001.json
//! │   └── MAND_2024_002.json
//! └── sessions/
//!     └── MAND_2024_001.json
//! ```

pub mod cli;
pub mod config;
mod store;

pub use store::{CollectionStats, RecordKey, RecordStore};

/// Collection holding `Case` records, keyed by case reference
pub const CASES: &str = "cases";

/// Collection holding `MonitoringSession` records, keyed by case reference
pub const SESSIONS: &str = "sessions";
