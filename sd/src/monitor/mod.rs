//! Response monitoring: per-case polling loops
//!
//! The registry owns one tokio task per monitored case; each task runs
//! ticks ([`session`]) against the ticketing client, with per-case
//! locks shared with the webhook path and bounded backoff on failures.

mod backoff;
mod locks;
mod registry;
mod session;

pub use backoff::Backoff;
pub use locks::CaseLocks;
pub use registry::{
    MAX_INTERVAL_MINUTES, MIN_INTERVAL_MINUTES, MonitorError, MonitorRegistry, MonitorStatus, SessionStatus,
    StartOutcome,
};
pub use session::{DeltaReport, TickError, TickReport, apply_delta, run_tick};

/// Tunables for the monitoring loops, taken from the config file
#[derive(Debug, Clone)]
pub struct MonitorSettings {
    /// Acceptance threshold in percent, applied to both quorum axes
    pub threshold_percent: f64,

    /// Days after proposal dispatch before silent creditors stop
    /// blocking a determination
    pub response_deadline_days: i64,

    /// Consecutive tick failures before a session is flagged erroring
    pub failure_threshold: u32,

    /// Cap for the failure backoff delay
    pub max_backoff: std::time::Duration,

    /// Interval used when a start request does not name one
    pub default_interval_minutes: u64,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            threshold_percent: crate::aggregate::DEFAULT_THRESHOLD_PERCENT,
            response_deadline_days: 30,
            failure_threshold: 5,
            max_backoff: std::time::Duration::from_secs(3600),
            default_interval_minutes: 30,
        }
    }
}
