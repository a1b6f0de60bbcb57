//! State manager messages
//!
//! Commands and responses for the actor pattern.

use thiserror::Error;
use tokio::sync::oneshot;

use crate::domain::{Case, MonitoringSession};

/// Errors from state operations
#[derive(Debug, Error)]
pub enum StateError {
    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Store error: {0}")]
    StoreError(String),

    #[error("Channel error")]
    ChannelError,
}

/// Response from state operations
pub type StateResponse<T> = Result<T, StateError>;

/// Commands sent to the StateManager actor
#[derive(Debug)]
pub enum StateCommand {
    // Case operations
    GetCase {
        reference: String,
        reply: oneshot::Sender<StateResponse<Option<Case>>>,
    },
    PutCase {
        case: Box<Case>,
        reply: oneshot::Sender<StateResponse<()>>,
    },
    ListCases {
        reply: oneshot::Sender<StateResponse<Vec<Case>>>,
    },

    // MonitoringSession operations
    GetSession {
        case_ref: String,
        reply: oneshot::Sender<StateResponse<Option<MonitoringSession>>>,
    },
    PutSession {
        session: Box<MonitoringSession>,
        reply: oneshot::Sender<StateResponse<()>>,
    },
    ListSessions {
        reply: oneshot::Sender<StateResponse<Vec<MonitoringSession>>>,
    },

    // Shutdown
    Shutdown,
}
