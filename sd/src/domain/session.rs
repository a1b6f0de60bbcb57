//! Persisted monitoring session checkpoint

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Persisted state of one polling session.
///
/// The in-memory task in [`crate::monitor`] is rebuilt from this record
/// after a restart; `last_checked_at` is only advanced after a tick has
/// fully succeeded, so a crash mid-tick reprocesses the same window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringSession {
    /// Case reference this session polls for
    pub case_ref: String,

    /// Polling interval in minutes
    pub interval_minutes: u64,

    /// False once stopped; stopped sessions are kept for inspection
    pub active: bool,

    /// Checkpoint: responses up to this instant have been applied
    pub last_checked_at: DateTime<Utc>,

    /// Consecutive fetch failures (reset on success)
    pub consecutive_failures: u32,

    /// Operator-visible flag, set once the failure threshold is hit
    pub erroring: bool,

    pub started_at: DateTime<Utc>,
}

impl MonitoringSession {
    pub fn new(case_ref: impl Into<String>, interval_minutes: u64) -> Self {
        let now = Utc::now();
        Self {
            case_ref: case_ref.into(),
            interval_minutes,
            active: true,
            last_checked_at: now,
            consecutive_failures: 0,
            erroring: false,
            started_at: now,
        }
    }

    pub fn interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.interval_minutes * 60)
    }
}
