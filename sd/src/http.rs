//! HTTP control surface
//!
//! Thin axum layer over the monitor registry and the state manager.
//! Handlers translate domain errors into JSON error responses and do
//! no case logic themselves; the webhook paths share the per-case
//! locks with the polling loops.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::aggregate::Outcome;
use crate::domain::{CaseStatus, ResponseStatus};
use crate::monitor::{MonitorError, MonitorRegistry, MonitorStatus, StartOutcome, TickError, apply_delta};
use crate::state::{StateError, StateManager, TransitionError, advance};
use crate::tickets::ResponseDelta;

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<MonitorRegistry>,
    pub state: StateManager,
}

/// JSON error response with a stable machine-readable code
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

impl ApiError {
    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.code,
            "message": self.message,
        }));
        (self.status, body).into_response()
    }
}

impl From<MonitorError> for ApiError {
    fn from(err: MonitorError) -> Self {
        match &err {
            MonitorError::InvalidInterval(_) => ApiError::new(StatusCode::CONFLICT, "invalid_interval", err.to_string()),
            MonitorError::CaseNotFound(_) => ApiError::new(StatusCode::NOT_FOUND, "case_not_found", err.to_string()),
            MonitorError::State(_) => ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "state_error", err.to_string()),
        }
    }
}

impl From<TickError> for ApiError {
    fn from(err: TickError) -> Self {
        match &err {
            TickError::CaseMissing(_) => ApiError::new(StatusCode::NOT_FOUND, "case_not_found", err.to_string()),
            TickError::Ticket(_) => ApiError::new(StatusCode::BAD_GATEWAY, "ticketing_error", err.to_string()),
            _ => ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "processing_error", err.to_string()),
        }
    }
}

impl From<StateError> for ApiError {
    fn from(err: StateError) -> Self {
        ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "state_error", err.to_string())
    }
}

impl From<TransitionError> for ApiError {
    fn from(err: TransitionError) -> Self {
        ApiError::new(StatusCode::CONFLICT, "invalid_transition", err.to_string())
    }
}

pub fn router(app: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/monitor/status", get(monitor_status))
        .route("/monitor/start-client/:case_ref", post(start_client))
        .route("/monitor/stop-client/:case_ref", post(stop_client))
        .route("/monitor/restart-client/:case_ref", post(restart_client))
        .route("/monitor/restart", post(restart))
        .route("/monitor/pause", post(pause))
        .route("/monitor/resume", post(resume))
        .route("/webhooks/client-creditor-confirmation", post(creditor_confirmation))
        .route("/webhooks/creditor-response", post(creditor_response))
        .with_state(app)
}

/// Bind and serve until the shutdown future resolves
pub async fn serve(
    addr: std::net::SocketAddr,
    app: AppState,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> eyre::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "HTTP control surface listening");
    axum::serve(listener, router(app))
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn monitor_status(State(app): State<AppState>) -> Result<Json<MonitorStatus>, ApiError> {
    Ok(Json(app.registry.status().await?))
}

#[derive(Debug, Default, Deserialize)]
pub struct StartRequest {
    pub interval_minutes: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct StartResponse {
    #[serde(rename = "caseRef")]
    pub case_ref: String,
    pub outcome: StartOutcome,
}

async fn start_client(
    State(app): State<AppState>,
    Path(case_ref): Path<String>,
    body: Option<Json<StartRequest>>,
) -> Result<Json<StartResponse>, ApiError> {
    let request = body.map(|Json(b)| b).unwrap_or_default();
    let outcome = app.registry.start(&case_ref, request.interval_minutes).await?;
    Ok(Json(StartResponse { case_ref, outcome }))
}

#[derive(Debug, Serialize)]
pub struct StopResponse {
    #[serde(rename = "caseRef")]
    pub case_ref: String,
    pub was_running: bool,
}

async fn stop_client(
    State(app): State<AppState>,
    Path(case_ref): Path<String>,
) -> Result<Json<StopResponse>, ApiError> {
    let was_running = app.registry.stop(&case_ref).await?;
    Ok(Json(StopResponse { case_ref, was_running }))
}

async fn restart_client(
    State(app): State<AppState>,
    Path(case_ref): Path<String>,
) -> Result<Json<StartResponse>, ApiError> {
    let outcome = app.registry.restart(&case_ref).await?;
    Ok(Json(StartResponse { case_ref, outcome }))
}

#[derive(Debug, Serialize)]
pub struct RestartResponse {
    pub resumed: usize,
}

async fn restart(State(app): State<AppState>) -> Result<Json<RestartResponse>, ApiError> {
    let resumed = app.registry.restart_all().await?;
    Ok(Json(RestartResponse { resumed }))
}

#[derive(Debug, Serialize)]
pub struct PauseResponse {
    pub global_monitoring_active: bool,
}

async fn pause(State(app): State<AppState>) -> Json<PauseResponse> {
    app.registry.pause();
    Json(PauseResponse {
        global_monitoring_active: false,
    })
}

async fn resume(State(app): State<AppState>) -> Json<PauseResponse> {
    app.registry.resume();
    Json(PauseResponse {
        global_monitoring_active: true,
    })
}

#[derive(Debug, Deserialize)]
pub struct ConfirmationRequest {
    #[serde(alias = "caseRef", alias = "aktenzeichen")]
    pub case_ref: String,
}

#[derive(Debug, Serialize)]
pub struct ConfirmationResponse {
    #[serde(rename = "caseRef")]
    pub case_ref: String,
    pub status: &'static str,
    pub monitoring: StartOutcome,
}

/// Push notification that the client confirmed creditor contact for a
/// case: move the case into the response phase and begin monitoring.
/// Idempotent on the case reference; repeat deliveries report the
/// already-running session and succeed.
async fn creditor_confirmation(
    State(app): State<AppState>,
    Json(request): Json<ConfirmationRequest>,
) -> Result<Json<ConfirmationResponse>, ApiError> {
    let mut case = app.state.get_case(&request.case_ref).await?.ok_or_else(|| {
        ApiError::new(
            StatusCode::NOT_FOUND,
            "case_not_found",
            format!("Case {} not found", request.case_ref),
        )
    })?;

    // monitoring without a dispatched proposal would poll for replies
    // nobody was asked to give
    if case.status.rank() < CaseStatus::ProposalSent.rank() {
        return Err(ApiError::new(
            StatusCode::CONFLICT,
            "proposal_not_sent",
            format!("Case {} has no dispatched proposal batch", case.reference),
        ));
    }

    if case.status == CaseStatus::ProposalSent {
        advance(&mut case, CaseStatus::AwaitingResponses)?;
        app.state.put_case(case.clone()).await?;
    }

    let monitoring = app.registry.start(&case.reference, None).await?;
    info!(case_ref = %case.reference, ?monitoring, "Client creditor confirmation processed");
    Ok(Json(ConfirmationResponse {
        case_ref: case.reference,
        status: case.status.as_str(),
        monitoring,
    }))
}

#[derive(Debug, Deserialize)]
pub struct CreditorResponseRequest {
    #[serde(alias = "caseRef")]
    pub case_ref: String,
    pub response_id: String,
    pub creditor_id: String,
    pub status: ResponseStatus,
    #[serde(default)]
    pub amount_cents: Option<i64>,
    #[serde(default)]
    pub received_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct CreditorResponseReply {
    pub applied: bool,
    pub outcome: Outcome,
    pub case_closed: bool,
}

/// Push delivery of a single creditor reply. Safe to retry: the
/// response identity deduplicates against the polling path too.
async fn creditor_response(
    State(app): State<AppState>,
    Json(request): Json<CreditorResponseRequest>,
) -> Result<Json<CreditorResponseReply>, ApiError> {
    let delta = ResponseDelta {
        response_id: request.response_id,
        creditor_id: request.creditor_id,
        status: request.status,
        amount: request.amount_cents.map(crate::domain::Money::from_cents),
        received_at: request.received_at.unwrap_or_else(Utc::now),
    };

    let _guard = app.registry.locks().acquire(&request.case_ref).await;
    let report = apply_delta(
        &app.state,
        app.registry.engine(),
        app.registry.settings(),
        &request.case_ref,
        &delta,
    )
    .await?;

    Ok(Json(CreditorResponseReply {
        applied: report.applied,
        outcome: report.outcome,
        case_closed: report.case_closed,
    }))
}
