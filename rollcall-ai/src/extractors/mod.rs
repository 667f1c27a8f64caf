//! Record extraction collaborators
//!
//! The OCR itself is delegated to an external service. Everything upstream
//! talks to it through [`RecordExtractor`], so tests and alternative
//! providers plug in without touching the pipeline.

pub mod gemini_client;

use crate::models::AttendanceRecord;
use async_trait::async_trait;
use thiserror::Error;

pub use gemini_client::{GeminiClient, UnconfiguredExtractor};

/// Extraction failure for one file
///
/// Scoped to a single entry; the pipeline records it and moves on.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExtractionError {
    /// Network communication error
    #[error("Network error: {0}")]
    Network(String),

    /// Service rejected the request or returned a non-success status
    #[error("API error: {0}")]
    Api(String),

    /// Response body was not the expected JSON shape
    #[error("Parse error: {0}")]
    Parse(String),

    /// Service answered without any text
    #[error("API returned an empty response.")]
    EmptyResponse,

    /// File bytes could not be read or encoded
    #[error("{0}")]
    Unreadable(String),
}

/// Message shown for a file whose bytes could not be read
pub const UNREADABLE_MESSAGE: &str = "Could not read the file content.";

/// Message shown to the user for any collaborator failure
pub const EXTRACTION_FAILED_MESSAGE: &str =
    "Failed to extract data. The document might not be clear or in a supported format.";

impl ExtractionError {
    /// User-facing reason attached to the failed entry
    pub fn user_message(&self) -> &str {
        match self {
            ExtractionError::Unreadable(message) => message,
            _ => EXTRACTION_FAILED_MESSAGE,
        }
    }
}

/// External extraction service
///
/// `payload` is the base64 encoding of the file bytes. One call per file;
/// callers never issue two calls concurrently.
#[async_trait]
pub trait RecordExtractor: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &'static str;

    /// Extract every row found in the document
    async fn extract(
        &self,
        payload: &str,
        mime_type: &str,
    ) -> Result<Vec<AttendanceRecord>, ExtractionError>;
}
