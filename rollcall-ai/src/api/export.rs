//! Export handlers
//!
//! GET /export/csv, GET /export/xlsx (downloads), GET /export/clipboard

use axum::{
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use chrono::Utc;
use serde::Deserialize;
use tracing::info;

use crate::{
    error::{ApiError, ApiResult},
    export::{export_filename, to_clipboard_text, to_csv, to_xlsx, ExportFormat},
    AppState,
};

/// Query parameters of the download endpoints
#[derive(Debug, Default, Deserialize)]
pub struct ExportQuery {
    /// Chosen file name without extension
    pub filename: Option<String>,
}

fn attachment(format: ExportFormat, filename: String, body: Vec<u8>) -> Response {
    (
        [
            (header::CONTENT_TYPE, format.content_type().to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        body,
    )
        .into_response()
}

/// GET /export/csv
pub async fn export_csv(
    State(state): State<AppState>,
    Query(query): Query<ExportQuery>,
) -> Response {
    let records = state.session.read().await.records();
    let filename = export_filename(query.filename.as_deref(), ExportFormat::Csv, Utc::now().date_naive());

    info!(rows = records.len(), filename = %filename, "CSV export");
    attachment(ExportFormat::Csv, filename, to_csv(&records).into_bytes())
}

/// GET /export/xlsx
pub async fn export_xlsx(
    State(state): State<AppState>,
    Query(query): Query<ExportQuery>,
) -> ApiResult<Response> {
    let records = state.session.read().await.records();
    let filename = export_filename(query.filename.as_deref(), ExportFormat::Xlsx, Utc::now().date_naive());

    let bytes = match tokio::task::spawn_blocking(move || to_xlsx(&records)).await {
        Ok(result) => result?,
        Err(e) => {
            let message = format!("XLSX export task failed: {}", e);
            state.record_error(message.clone()).await;
            return Err(ApiError::Internal(message));
        }
    };

    info!(bytes = bytes.len(), filename = %filename, "XLSX export");
    Ok(attachment(ExportFormat::Xlsx, filename, bytes))
}

/// GET /export/clipboard
///
/// Tab-separated text for pasting into a spreadsheet.
pub async fn export_clipboard(State(state): State<AppState>) -> impl IntoResponse {
    let records = state.session.read().await.records();
    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        to_clipboard_text(&records),
    )
}

/// Build export routes
pub fn export_routes() -> Router<AppState> {
    Router::new()
        .route("/export/csv", get(export_csv))
        .route("/export/xlsx", get(export_xlsx))
        .route("/export/clipboard", get(export_clipboard))
}
