//! Working-set handlers
//!
//! POST /files (multipart), DELETE /files/:hash

use axum::{
    extract::{Multipart, Path, State},
    routing::{delete, post},
    Json, Router,
};
use chrono::Utc;
use rollcall_common::events::{RollcallEvent, SessionPhase};
use serde::Serialize;
use tracing::info;

use crate::{
    error::{ApiError, ApiResult},
    models::EntrySummary,
    services::file_intake::{self, RawUpload},
    AppState,
};

/// POST /files response
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    /// Newly accepted files, in upload order
    pub accepted: Vec<EntrySummary>,
    /// One message per rejected file (also raised as notifications)
    pub rejected: Vec<String>,
    pub phase: SessionPhase,
    pub working_set_size: usize,
}

/// DELETE /files/:hash response
#[derive(Debug, Serialize)]
pub struct RemoveResponse {
    pub hash: String,
    pub phase: SessionPhase,
    pub working_set_size: usize,
}

async fn read_uploads(mut multipart: Multipart) -> ApiResult<Vec<RawUpload>> {
    let mut uploads = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        let Some(file_name) = field.file_name().map(|s| s.to_string()) else {
            continue;
        };
        let declared_mime = field.content_type().map(|s| s.to_string());
        let content = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Failed to read '{}': {}", file_name, e)))?;

        uploads.push(RawUpload {
            file_name,
            declared_mime,
            content: content.to_vec(),
        });
    }

    Ok(uploads)
}

/// POST /files
///
/// Validate, dedup and append uploaded files. Rejections are reported as
/// notifications, never as request failures.
pub async fn upload_files(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<UploadResponse>> {
    let uploads = read_uploads(multipart).await?;
    if uploads.is_empty() {
        return Err(ApiError::BadRequest("No files provided".to_string()));
    }

    let existing = {
        let session = state.session.read().await;
        if session.is_loading() {
            return Err(ApiError::Conflict("An analysis run is in progress".to_string()));
        }
        session.hashes()
    };

    // Hashing runs without holding the session
    let mut report = file_intake::accept(uploads, existing).await?;

    let mut session = state.session.write().await;
    report.recheck(session.hashes());
    let accepted_hashes = session.add_entries(report.accepted)?;

    let accepted: Vec<EntrySummary> = session
        .entries()
        .iter()
        .filter(|e| accepted_hashes.iter().any(|h| h == e.hash()))
        .map(|e| e.summary())
        .collect();
    let phase = session.phase();
    let working_set_size = session.entries().len();
    drop(session);

    for message in &report.notifications {
        state.notifications.notify(message.clone());
    }

    if !accepted_hashes.is_empty() {
        info!(accepted = accepted_hashes.len(), working_set_size, "Upload batch accepted");
        state.event_bus.emit_lossy(RollcallEvent::FilesAccepted {
            hashes: accepted_hashes,
            working_set_size,
            timestamp: Utc::now(),
        });
    }

    Ok(Json(UploadResponse {
        accepted,
        rejected: report.notifications,
        phase,
        working_set_size,
    }))
}

/// DELETE /files/:hash
pub async fn remove_file(
    State(state): State<AppState>,
    Path(hash): Path<String>,
) -> ApiResult<Json<RemoveResponse>> {
    let (phase, working_set_size) = {
        let mut session = state.session.write().await;
        let phase = session.remove_entry(&hash)?;
        (phase, session.entries().len())
    };

    state.event_bus.emit_lossy(RollcallEvent::FileRemoved {
        hash: hash.clone(),
        phase,
        timestamp: Utc::now(),
    });

    Ok(Json(RemoveResponse {
        hash,
        phase,
        working_set_size,
    }))
}

/// Build working-set routes
pub fn file_routes() -> Router<AppState> {
    Router::new()
        .route("/files", post(upload_files))
        .route("/files/:hash", delete(remove_file))
}
