//! Session and analysis handlers
//!
//! GET /session, POST /analyze, POST /reset

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use rollcall_common::events::{RollcallEvent, SessionPhase};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::{
    error::ApiResult,
    models::SessionSnapshot,
    services::Notification,
    AppState,
};

/// GET /session response
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    #[serde(flatten)]
    pub session: SessionSnapshot,
    /// Visible notifications, oldest first
    pub notifications: Vec<Notification>,
}

/// POST /analyze response
#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub started: bool,
    pub run_id: Option<Uuid>,
    pub phase: SessionPhase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

async fn session_response(state: &AppState) -> SessionResponse {
    SessionResponse {
        session: state.session.read().await.snapshot(),
        notifications: state.notifications.active(),
    }
}

/// GET /session
pub async fn get_session(State(state): State<AppState>) -> Json<SessionResponse> {
    Json(session_response(&state).await)
}

/// POST /analyze
///
/// 202 when a run starts. An empty working set is not a request failure: the
/// session moves to its error phase and the response says so.
pub async fn start_analysis(
    State(state): State<AppState>,
) -> ApiResult<(StatusCode, Json<AnalyzeResponse>)> {
    let handle = state.runner.start().await?;

    let session = state.session.read().await;
    let response = AnalyzeResponse {
        started: handle.is_some(),
        run_id: handle.as_ref().map(|h| h.run_id),
        phase: session.phase(),
        error: session.error().map(str::to_string),
    };
    drop(session);

    let status = match handle {
        Some(handle) => {
            info!(run_id = %handle.run_id, "Analysis accepted");
            StatusCode::ACCEPTED
        }
        None => StatusCode::OK,
    };
    Ok((status, Json(response)))
}

/// POST /reset
///
/// Start over: drop the working set, records, notifications and any run.
pub async fn reset_session(State(state): State<AppState>) -> Json<SessionResponse> {
    state.runner.reset().await;
    state.notifications.clear();
    state.event_bus.emit_lossy(RollcallEvent::SessionReset {
        timestamp: Utc::now(),
    });
    info!("Session reset");

    Json(session_response(&state).await)
}

/// Build session and analysis routes
pub fn analysis_routes() -> Router<AppState> {
    Router::new()
        .route("/session", get(get_session))
        .route("/analyze", post(start_analysis))
        .route("/reset", post(reset_session))
}
