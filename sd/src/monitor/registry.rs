//! Monitor registry - owns the polling task per case
//!
//! One tokio task per actively monitored case, keyed by case
//! reference. Starting is idempotent, stopping waits for an in-flight
//! tick, and a restart rebuilds every loop from the persisted sessions.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::state::{StateError, StateManager};
use crate::templates::TemplateEngine;
use crate::tickets::TicketingClient;

use super::backoff::Backoff;
use super::locks::CaseLocks;
use super::session::run_tick;
use super::MonitorSettings;

/// Shortest and longest accepted polling intervals, in minutes
pub const MIN_INTERVAL_MINUTES: u64 = 1;
pub const MAX_INTERVAL_MINUTES: u64 = 1440;

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("Invalid interval {0} minutes (allowed: {MIN_INTERVAL_MINUTES}..={MAX_INTERVAL_MINUTES})")]
    InvalidInterval(u64),

    #[error("Case {0} not found")]
    CaseNotFound(String),

    #[error(transparent)]
    State(#[from] StateError),
}

/// Result of a start request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StartOutcome {
    Started,
    AlreadyRunning,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    #[serde(rename = "caseRef")]
    pub case_ref: String,
    pub interval_minutes: u64,
    pub last_checked_at: DateTime<Utc>,
    pub erroring: bool,
    pub consecutive_failures: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct MonitorStatus {
    pub global_monitoring_active: bool,
    pub active_sessions_count: usize,
    pub sessions: Vec<SessionStatus>,
}

struct Shared {
    state: StateManager,
    client: Arc<dyn TicketingClient>,
    engine: TemplateEngine,
    locks: CaseLocks,
    settings: MonitorSettings,
    pause: watch::Sender<bool>,
}

struct SessionHandle {
    stop_tx: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

pub struct MonitorRegistry {
    shared: Arc<Shared>,
    tasks: tokio::sync::Mutex<HashMap<String, SessionHandle>>,
}

impl MonitorRegistry {
    pub fn new(
        state: StateManager,
        client: Arc<dyn TicketingClient>,
        engine: TemplateEngine,
        settings: MonitorSettings,
    ) -> Self {
        let (pause, _) = watch::channel(false);
        Self {
            shared: Arc::new(Shared {
                state,
                client,
                engine,
                locks: CaseLocks::new(),
                settings,
                pause,
            }),
            tasks: tokio::sync::Mutex::new(HashMap::new()),
        }
    }

    /// Per-case locks, shared with the webhook path
    pub fn locks(&self) -> &CaseLocks {
        &self.shared.locks
    }

    /// Template engine, shared with the webhook path
    pub fn engine(&self) -> &TemplateEngine {
        &self.shared.engine
    }

    pub fn settings(&self) -> &MonitorSettings {
        &self.shared.settings
    }

    /// Start monitoring a case. Idempotent: a second start while the
    /// loop runs only updates the persisted interval.
    pub async fn start(&self, case_ref: &str, interval_minutes: Option<u64>) -> Result<StartOutcome, MonitorError> {
        let interval = interval_minutes.unwrap_or(self.shared.settings.default_interval_minutes);
        if !(MIN_INTERVAL_MINUTES..=MAX_INTERVAL_MINUTES).contains(&interval) {
            return Err(MonitorError::InvalidInterval(interval));
        }

        let Some(case) = self.shared.state.get_case(case_ref).await? else {
            return Err(MonitorError::CaseNotFound(case_ref.to_string()));
        };

        let mut tasks = self.tasks.lock().await;
        if let Some(existing) = tasks.get(case_ref) {
            if !existing.handle.is_finished() {
                if let Some(mut session) = self.shared.state.get_session(case_ref).await? {
                    if session.interval_minutes != interval {
                        session.interval_minutes = interval;
                        self.shared.state.put_session(session).await?;
                    }
                }
                debug!(case_ref, "Start requested for already-running session");
                return Ok(StartOutcome::AlreadyRunning);
            }
            tasks.remove(case_ref);
        }

        // resume the persisted checkpoint when one exists
        let mut session = match self.shared.state.get_session(case_ref).await? {
            Some(existing) => existing,
            None => {
                let mut fresh = crate::domain::MonitoringSession::new(case_ref, interval);
                // replies that arrived between proposal dispatch and
                // the first start must fall inside the first window
                if let Some(sent_at) = case.proposal_sent_at {
                    fresh.last_checked_at = sent_at;
                }
                fresh
            }
        };
        session.interval_minutes = interval;
        session.active = true;
        session.consecutive_failures = 0;
        session.erroring = false;
        self.shared.state.put_session(session).await?;

        tasks.insert(case_ref.to_string(), spawn_session(self.shared.clone(), case_ref.to_string()));
        info!(case_ref, interval, "Monitoring session started");
        Ok(StartOutcome::Started)
    }

    /// Stop monitoring a case, waiting for an in-flight tick to finish.
    /// Returns whether a running loop existed.
    pub async fn stop(&self, case_ref: &str) -> Result<bool, MonitorError> {
        let removed = self.tasks.lock().await.remove(case_ref);
        let was_running = match removed {
            Some(session_handle) => {
                let _ = session_handle.stop_tx.send(());
                if let Err(e) = session_handle.handle.await {
                    warn!(case_ref, error = %e, "Session task ended abnormally");
                }
                true
            }
            None => false,
        };

        if let Some(mut session) = self.shared.state.get_session(case_ref).await? {
            session.active = false;
            self.shared.state.put_session(session).await?;
        }
        info!(case_ref, was_running, "Monitoring session stopped");
        Ok(was_running)
    }

    /// Stop one case's loop and start it again, keeping the persisted
    /// interval and checkpoint
    pub async fn restart(&self, case_ref: &str) -> Result<StartOutcome, MonitorError> {
        self.stop(case_ref).await?;
        let interval = self
            .shared
            .state
            .get_session(case_ref)
            .await?
            .map(|s| s.interval_minutes);
        self.start(case_ref, interval).await
    }

    /// Rebuild loops for every persisted active session (used at boot)
    pub async fn rehydrate(&self) -> Result<usize, MonitorError> {
        let sessions = self.shared.state.list_sessions().await?;
        let mut tasks = self.tasks.lock().await;
        let mut resumed = 0;
        for session in sessions.into_iter().filter(|s| s.active) {
            if tasks.contains_key(&session.case_ref) {
                continue;
            }
            if self.shared.state.get_case(&session.case_ref).await?.is_none() {
                warn!(case_ref = %session.case_ref, "Active session without a case, skipping");
                continue;
            }
            tasks.insert(
                session.case_ref.clone(),
                spawn_session(self.shared.clone(), session.case_ref.clone()),
            );
            resumed += 1;
        }
        info!(resumed, "Monitoring sessions rehydrated");
        Ok(resumed)
    }

    /// Stop every running loop and rebuild them from the persisted
    /// sessions
    pub async fn restart_all(&self) -> Result<usize, MonitorError> {
        let refs: Vec<String> = self.tasks.lock().await.keys().cloned().collect();
        for case_ref in &refs {
            if let Some(session_handle) = self.tasks.lock().await.remove(case_ref) {
                let _ = session_handle.stop_tx.send(());
                let _ = session_handle.handle.await;
            }
            // keep the persisted session active so rehydrate resumes it
            if let Some(mut session) = self.shared.state.get_session(case_ref).await? {
                session.active = true;
                self.shared.state.put_session(session).await?;
            }
        }
        let resumed = self.rehydrate().await?;
        info!(stopped = refs.len(), resumed, "Monitor restart complete");
        Ok(resumed)
    }

    /// Suspend all ticking without tearing the loops down
    pub fn pause(&self) {
        self.shared.pause.send_replace(true);
        info!("Global monitoring paused");
    }

    pub fn resume(&self) {
        self.shared.pause.send_replace(false);
        info!("Global monitoring resumed");
    }

    pub fn is_paused(&self) -> bool {
        *self.shared.pause.borrow()
    }

    /// Operator snapshot built from the persisted sessions
    pub async fn status(&self) -> Result<MonitorStatus, MonitorError> {
        let sessions: Vec<SessionStatus> = self
            .shared
            .state
            .list_sessions()
            .await?
            .into_iter()
            .filter(|s| s.active)
            .map(|s| SessionStatus {
                case_ref: s.case_ref,
                interval_minutes: s.interval_minutes,
                last_checked_at: s.last_checked_at,
                erroring: s.erroring,
                consecutive_failures: s.consecutive_failures,
            })
            .collect();
        Ok(MonitorStatus {
            global_monitoring_active: !self.is_paused(),
            active_sessions_count: sessions.len(),
            sessions,
        })
    }

    /// Drain all loops for process shutdown. Sessions stay active in
    /// the store; the next boot rehydrates them from their checkpoints.
    pub async fn shutdown(&self) {
        let mut tasks = self.tasks.lock().await;
        let count = tasks.len();
        for (case_ref, session_handle) in tasks.drain() {
            let _ = session_handle.stop_tx.send(());
            if let Err(e) = session_handle.handle.await {
                warn!(case_ref, error = %e, "Session task ended abnormally during shutdown");
            }
        }
        info!(count, "Monitor registry drained");
    }
}

fn spawn_session(shared: Arc<Shared>, case_ref: String) -> SessionHandle {
    let (stop_tx, stop_rx) = oneshot::channel();
    let handle = tokio::spawn(session_loop(shared, case_ref, stop_rx));
    SessionHandle { stop_tx, handle }
}

async fn session_loop(shared: Arc<Shared>, case_ref: String, mut stop_rx: oneshot::Receiver<()>) {
    debug!(case_ref, "Session loop started");
    let mut backoff = Backoff::new(Duration::from_secs(30), shared.settings.max_backoff);

    loop {
        let delay = match shared.state.get_session(&case_ref).await {
            Ok(Some(session)) if session.active => {
                if *shared.pause.borrow() {
                    session.interval()
                } else {
                    let mut session = session;
                    let _guard = shared.locks.acquire(&case_ref).await;
                    match run_tick(
                        &shared.state,
                        shared.client.as_ref(),
                        &shared.engine,
                        &shared.settings,
                        &mut session,
                    )
                    .await
                    {
                        Ok(report) => {
                            backoff.reset();
                            let interval = session.interval();
                            if report.case_closed {
                                session.active = false;
                                if let Err(e) = shared.state.put_session(session).await {
                                    warn!(case_ref, error = %e, "Failed to persist finished session");
                                }
                                info!(case_ref, "Case determined, session loop finished");
                                break;
                            }
                            if let Err(e) = shared.state.put_session(session).await {
                                warn!(case_ref, error = %e, "Failed to persist session checkpoint");
                            }
                            interval
                        }
                        Err(e) => {
                            session.consecutive_failures += 1;
                            if session.consecutive_failures >= shared.settings.failure_threshold && !session.erroring {
                                session.erroring = true;
                                warn!(
                                    case_ref,
                                    failures = session.consecutive_failures,
                                    "Failure threshold reached, session flagged as erroring"
                                );
                            }
                            warn!(case_ref, error = %e, failures = session.consecutive_failures, "Tick failed");
                            if let Err(persist) = shared.state.put_session(session).await {
                                warn!(case_ref, error = %persist, "Failed to persist failing session");
                            }
                            backoff.next_delay()
                        }
                    }
                }
            }
            Ok(_) => {
                debug!(case_ref, "Session gone or deactivated, loop ends");
                break;
            }
            Err(e) => {
                warn!(case_ref, error = %e, "Could not load session");
                backoff.next_delay()
            }
        };

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = &mut stop_rx => {
                debug!(case_ref, "Stop requested");
                break;
            }
        }
    }
}
