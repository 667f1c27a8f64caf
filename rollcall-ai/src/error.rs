//! Error types for rollcall-ai
//!
//! Every handler returns [`ApiResult`]; domain errors convert into
//! [`ApiError`] and render as `{"error": {"code", "message"}}`.

use crate::export::ExportError;
use crate::models::SessionError;
use crate::services::EditError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Conflict (409) - e.g., analysis already running
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// Export rendering failed
    #[error(transparent)]
    Export(#[from] ExportError),

    /// rollcall-common error
    #[error("Common error: {0}")]
    Common(#[from] rollcall_common::Error),
}

impl From<EditError> for ApiError {
    fn from(err: EditError) -> Self {
        match err {
            EditError::UnknownRecord(_) => ApiError::NotFound(err.to_string()),
            EditError::NoActiveEdit => ApiError::Conflict(err.to_string()),
            _ => ApiError::BadRequest(err.to_string()),
        }
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Busy => ApiError::Conflict(err.to_string()),
            SessionError::UnknownFile(_) => ApiError::NotFound(err.to_string()),
            SessionError::Edit(edit) => edit.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
            ApiError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                msg,
            ),
            ApiError::Export(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "EXPORT_ERROR",
                err.to_string(),
            ),
            ApiError::Common(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "COMMON_ERROR",
                err.to_string(),
            ),
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Column;

    #[test]
    fn test_status_mapping() {
        let cases: Vec<(ApiError, StatusCode)> = vec![
            (SessionError::Busy.into(), StatusCode::CONFLICT),
            (SessionError::UnknownFile("x".into()).into(), StatusCode::NOT_FOUND),
            (EditError::UnknownRecord("9".into()).into(), StatusCode::NOT_FOUND),
            (EditError::ReadOnlyColumn(Column::Id).into(), StatusCode::BAD_REQUEST),
            (SessionError::Edit(EditError::NoActiveEdit).into(), StatusCode::CONFLICT),
        ];

        for (error, expected) in cases {
            assert_eq!(error.into_response().status(), expected);
        }
    }
}
