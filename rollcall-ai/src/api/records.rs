//! Record table handlers
//!
//! GET /records plus the editor operations under /records/edit/*. Every
//! committed cell is broadcast as `RecordUpdated`.

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use rollcall_common::events::{RollcallEvent, SessionPhase};
use serde::{Deserialize, Serialize};

use crate::{
    error::ApiResult,
    models::{AttendanceRecord, Column},
    services::{
        summary_calculator::{calculate_summary, SummaryView},
        table_editor::{column_descriptors, ColumnDescriptor, Commit, EditCursor},
    },
    AppState,
};

/// GET /records response
#[derive(Debug, Serialize)]
pub struct RecordsResponse {
    pub phase: SessionPhase,
    pub records: Vec<AttendanceRecord>,
    pub summary: SummaryView,
    pub columns: Vec<ColumnDescriptor>,
    pub edit_cursor: Option<EditCursor>,
}

/// One committed cell
#[derive(Debug, Serialize)]
pub struct CommittedCell {
    pub record_id: String,
    pub column: Column,
    pub value: String,
}

/// Response of every editor operation
#[derive(Debug, Serialize)]
pub struct EditResponse {
    /// Cell left open after the operation
    pub edit_cursor: Option<EditCursor>,
    /// Cell written by the operation, if any
    pub committed: Option<CommittedCell>,
}

/// POST /records/edit/begin request
#[derive(Debug, Deserialize)]
pub struct BeginEditRequest {
    pub record_id: String,
    pub column: Column,
}

/// POST /records/edit/input and /records/edit/select request
#[derive(Debug, Deserialize)]
pub struct ValueRequest {
    pub value: String,
}

/// GET /records
pub async fn get_records(State(state): State<AppState>) -> Json<RecordsResponse> {
    let session = state.session.read().await;
    let records = session.records();

    Json(RecordsResponse {
        phase: session.phase(),
        summary: calculate_summary(&records),
        columns: column_descriptors(&records),
        records: records.as_ref().clone(),
        edit_cursor: session.editor().cursor().cloned(),
    })
}

fn publish(state: &AppState, commit: Option<Commit>) -> Option<CommittedCell> {
    commit.map(|commit| {
        state.event_bus.emit_lossy(RollcallEvent::RecordUpdated {
            record_id: commit.record_id.clone(),
            column: commit.column.key().to_string(),
            value: commit.value.clone(),
            timestamp: Utc::now(),
        });
        CommittedCell {
            record_id: commit.record_id,
            column: commit.column,
            value: commit.value,
        }
    })
}

/// POST /records/edit/begin
///
/// Opens a cell. A text cell that was open elsewhere is committed first.
pub async fn begin_edit(
    State(state): State<AppState>,
    Json(request): Json<BeginEditRequest>,
) -> ApiResult<Json<EditResponse>> {
    let mut session = state.session.write().await;
    let commit = session.begin_edit(&request.record_id, request.column)?;
    let edit_cursor = session.editor().cursor().cloned();
    drop(session);

    Ok(Json(EditResponse {
        edit_cursor,
        committed: publish(&state, commit),
    }))
}

/// POST /records/edit/input
pub async fn edit_input(
    State(state): State<AppState>,
    Json(request): Json<ValueRequest>,
) -> ApiResult<Json<EditResponse>> {
    let mut session = state.session.write().await;
    session.edit_input(request.value)?;

    Ok(Json(EditResponse {
        edit_cursor: session.editor().cursor().cloned(),
        committed: None,
    }))
}

/// POST /records/edit/commit
pub async fn commit_edit(State(state): State<AppState>) -> ApiResult<Json<EditResponse>> {
    let commit = state.session.write().await.commit_edit()?;

    Ok(Json(EditResponse {
        edit_cursor: None,
        committed: publish(&state, Some(commit)),
    }))
}

/// POST /records/edit/cancel
pub async fn cancel_edit(State(state): State<AppState>) -> ApiResult<Json<EditResponse>> {
    state.session.write().await.cancel_edit()?;

    Ok(Json(EditResponse {
        edit_cursor: None,
        committed: None,
    }))
}

/// POST /records/edit/select
pub async fn select_choice(
    State(state): State<AppState>,
    Json(request): Json<ValueRequest>,
) -> ApiResult<Json<EditResponse>> {
    let commit = state.session.write().await.select_choice(&request.value)?;

    Ok(Json(EditResponse {
        edit_cursor: None,
        committed: publish(&state, Some(commit)),
    }))
}

/// POST /records/edit/blur
///
/// Focus left the open cell. A text draft is committed; a choice cell closes
/// unchanged.
pub async fn blur_edit(State(state): State<AppState>) -> ApiResult<Json<EditResponse>> {
    let commit = state.session.write().await.blur_edit()?;

    Ok(Json(EditResponse {
        edit_cursor: None,
        committed: publish(&state, commit),
    }))
}

/// Build record routes
pub fn record_routes() -> Router<AppState> {
    Router::new()
        .route("/records", get(get_records))
        .route("/records/edit/begin", post(begin_edit))
        .route("/records/edit/input", post(edit_input))
        .route("/records/edit/commit", post(commit_edit))
        .route("/records/edit/cancel", post(cancel_edit))
        .route("/records/edit/select", post(select_choice))
        .route("/records/edit/blur", post(blur_edit))
}
