//! StateManager - actor that owns the record store
//!
//! Processes commands via channels so that exactly one task touches the
//! underlying files. Handles are cheap clones; dropping every handle
//! (or sending Shutdown) ends the actor.

use std::path::Path;

use casestore::{CASES, RecordStore, SESSIONS};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::domain::{Case, MonitoringSession};

use super::messages::{StateCommand, StateError, StateResponse};

/// Handle to send commands to the StateManager
#[derive(Clone)]
pub struct StateManager {
    tx: mpsc::Sender<StateCommand>,
}

impl StateManager {
    /// Spawn a new StateManager actor over a store directory
    pub fn spawn(store_path: impl AsRef<Path>) -> eyre::Result<Self> {
        debug!(store_path = %store_path.as_ref().display(), "StateManager::spawn");
        let store = RecordStore::open(store_path.as_ref())?;

        let (tx, rx) = mpsc::channel(256);
        tokio::spawn(actor_loop(store, rx));

        info!("StateManager spawned");
        Ok(Self { tx })
    }

    pub async fn get_case(&self, reference: &str) -> StateResponse<Option<Case>> {
        let (reply_tx, reply_rx) = tokio::sync::oneshot::channel();
        self.tx
            .send(StateCommand::GetCase {
                reference: reference.to_string(),
                reply: reply_tx,
            })
            .await
            .map_err(|_| StateError::ChannelError)?;
        reply_rx.await.map_err(|_| StateError::ChannelError)?
    }

    pub async fn put_case(&self, case: Case) -> StateResponse<()> {
        debug!(case_ref = %case.reference, status = case.status.as_str(), "put_case");
        let (reply_tx, reply_rx) = tokio::sync::oneshot::channel();
        self.tx
            .send(StateCommand::PutCase {
                case: Box::new(case),
                reply: reply_tx,
            })
            .await
            .map_err(|_| StateError::ChannelError)?;
        reply_rx.await.map_err(|_| StateError::ChannelError)?
    }

    pub async fn list_cases(&self) -> StateResponse<Vec<Case>> {
        let (reply_tx, reply_rx) = tokio::sync::oneshot::channel();
        self.tx
            .send(StateCommand::ListCases { reply: reply_tx })
            .await
            .map_err(|_| StateError::ChannelError)?;
        reply_rx.await.map_err(|_| StateError::ChannelError)?
    }

    pub async fn get_session(&self, case_ref: &str) -> StateResponse<Option<MonitoringSession>> {
        let (reply_tx, reply_rx) = tokio::sync::oneshot::channel();
        self.tx
            .send(StateCommand::GetSession {
                case_ref: case_ref.to_string(),
                reply: reply_tx,
            })
            .await
            .map_err(|_| StateError::ChannelError)?;
        reply_rx.await.map_err(|_| StateError::ChannelError)?
    }

    pub async fn put_session(&self, session: MonitoringSession) -> StateResponse<()> {
        debug!(case_ref = %session.case_ref, active = session.active, "put_session");
        let (reply_tx, reply_rx) = tokio::sync::oneshot::channel();
        self.tx
            .send(StateCommand::PutSession {
                session: Box::new(session),
                reply: reply_tx,
            })
            .await
            .map_err(|_| StateError::ChannelError)?;
        reply_rx.await.map_err(|_| StateError::ChannelError)?
    }

    pub async fn list_sessions(&self) -> StateResponse<Vec<MonitoringSession>> {
        let (reply_tx, reply_rx) = tokio::sync::oneshot::channel();
        self.tx
            .send(StateCommand::ListSessions { reply: reply_tx })
            .await
            .map_err(|_| StateError::ChannelError)?;
        reply_rx.await.map_err(|_| StateError::ChannelError)?
    }

    /// Request actor shutdown (best effort)
    pub async fn shutdown(&self) {
        let _ = self.tx.send(StateCommand::Shutdown).await;
    }
}

/// The actor: owns the store, processes commands sequentially
async fn actor_loop(store: RecordStore, mut rx: mpsc::Receiver<StateCommand>) {
    debug!("StateManager actor started");

    while let Some(command) = rx.recv().await {
        match command {
            StateCommand::GetCase { reference, reply } => {
                let result = store
                    .get::<Case>(CASES, &reference)
                    .map_err(|e| StateError::StoreError(e.to_string()));
                let _ = reply.send(result);
            }
            StateCommand::PutCase { case, reply } => {
                let result = store
                    .put(CASES, &case.reference, case.as_ref())
                    .map_err(|e| StateError::StoreError(e.to_string()));
                let _ = reply.send(result);
            }
            StateCommand::ListCases { reply } => {
                let result = store
                    .list::<Case>(CASES)
                    .map_err(|e| StateError::StoreError(e.to_string()));
                let _ = reply.send(result);
            }
            StateCommand::GetSession { case_ref, reply } => {
                let result = store
                    .get::<MonitoringSession>(SESSIONS, &case_ref)
                    .map_err(|e| StateError::StoreError(e.to_string()));
                let _ = reply.send(result);
            }
            StateCommand::PutSession { session, reply } => {
                let result = store
                    .put(SESSIONS, &session.case_ref, session.as_ref())
                    .map_err(|e| StateError::StoreError(e.to_string()));
                let _ = reply.send(result);
            }
            StateCommand::ListSessions { reply } => {
                let result = store
                    .list::<MonitoringSession>(SESSIONS)
                    .map_err(|e| StateError::StoreError(e.to_string()));
                let _ = reply.send(result);
            }
            StateCommand::Shutdown => {
                info!("StateManager actor shutting down");
                break;
            }
        }
    }

    if !rx.is_empty() {
        warn!("StateManager actor exiting with queued commands");
    }
    debug!("StateManager actor stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Debtor, EmploymentStatus, FinancialSnapshot, Gender, MaritalStatus, Money};
    use tempfile::TempDir;

    fn test_case(reference: &str) -> Case {
        Case::new(
            reference,
            Debtor {
                full_name: "Mustermann, Max".to_string(),
                street: "Musterstrasse".to_string(),
                house_number: "12".to_string(),
                postal_code: "45127".to_string(),
                city: "Essen".to_string(),
                phone: None,
                email: None,
                gender: Gender::Maennlich,
                marital_status: MaritalStatus::Ledig,
                employment: EmploymentStatus::Angestellt,
                children: 0,
            },
            FinancialSnapshot {
                net_income: Money::from_eur(2000),
                dependents: 0,
            },
        )
    }

    #[tokio::test]
    async fn test_case_roundtrip() {
        let temp = TempDir::new().unwrap();
        let state = StateManager::spawn(temp.path()).unwrap();

        assert!(state.get_case("MAND_001").await.unwrap().is_none());

        state.put_case(test_case("MAND_001")).await.unwrap();
        let loaded = state.get_case("MAND_001").await.unwrap().unwrap();
        assert_eq!(loaded.reference, "MAND_001");

        let all = state.list_cases().await.unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn test_session_roundtrip() {
        let temp = TempDir::new().unwrap();
        let state = StateManager::spawn(temp.path()).unwrap();

        state.put_session(MonitoringSession::new("MAND_001", 5)).await.unwrap();
        let session = state.get_session("MAND_001").await.unwrap().unwrap();
        assert_eq!(session.interval_minutes, 5);
        assert!(session.active);

        assert_eq!(state.list_sessions().await.unwrap().len(), 1);
    }
}
