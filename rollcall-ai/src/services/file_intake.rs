//! File intake: validation and dedup of uploaded files
//!
//! Accepts images and PDFs. Unsupported types and duplicate content are
//! dropped with a user-visible notification; nothing here is fatal.

use crate::models::UploadCandidate;
use crate::services::hash_deduplicator::{calculate_hash, HashDeduplicator, HashResult};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use rollcall_common::Result;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

/// MIME type accepted in addition to every `image/*` type
pub const PDF_MIME: &str = "application/pdf";

/// A file as received from the upload surface
#[derive(Debug, Clone)]
pub struct RawUpload {
    pub file_name: String,
    /// Content type sent by the client, if any
    pub declared_mime: Option<String>,
    pub content: Vec<u8>,
}

/// Outcome of one intake batch
#[derive(Debug, Default)]
pub struct IntakeReport {
    /// Accepted candidates, in upload order
    pub accepted: Vec<UploadCandidate>,
    /// One message per rejected file, in upload order
    pub notifications: Vec<String>,
}

impl IntakeReport {
    /// Drop accepted candidates whose content reached the working set while
    /// this batch was being checked
    pub fn recheck(&mut self, current_hashes: impl IntoIterator<Item = String>) {
        let current: HashSet<String> = current_hashes.into_iter().collect();
        let (kept, late): (Vec<_>, Vec<_>) = std::mem::take(&mut self.accepted)
            .into_iter()
            .partition(|candidate| !current.contains(&candidate.hash));

        for candidate in late {
            info!(file_name = %candidate.file_name, hash = %candidate.hash, "Duplicate arrived concurrently");
            self.notifications.push(duplicate_message(&candidate.file_name));
        }
        self.accepted = kept;
    }
}

/// Whether a MIME type may enter the working set
pub fn is_supported_mime(mime: &str) -> bool {
    let mime = mime.trim().to_ascii_lowercase();
    mime.starts_with("image/") || mime == PDF_MIME
}

/// Effective MIME type of an upload
///
/// The declared type wins unless it is missing or generic, in which case the
/// magic bytes decide.
pub fn resolve_mime(declared: Option<&str>, content: &[u8]) -> Option<String> {
    let declared = declared
        .map(|m| m.split(';').next().unwrap_or_default().trim().to_ascii_lowercase())
        .filter(|m| !m.is_empty() && m != "application/octet-stream");

    declared.or_else(|| infer::get(content).map(|kind| kind.mime_type().to_string()))
}

/// `data:` URL used for previews
pub fn preview_data_url(mime: &str, content: &[u8]) -> String {
    format!("data:{};base64,{}", mime, STANDARD.encode(content))
}

pub fn unsupported_message(file_name: &str) -> String {
    format!("Unsupported file: '{}'. Please upload images or PDFs.", file_name)
}

pub fn duplicate_message(file_name: &str) -> String {
    format!("Duplicate file ignored: {}", file_name)
}

/// Validate, hash and dedup one batch of uploads
///
/// `existing_hashes` is the working set before this batch. A file whose
/// content matches the working set, or an earlier file of the same batch, is
/// dropped.
pub async fn accept(
    uploads: Vec<RawUpload>,
    existing_hashes: impl IntoIterator<Item = String>,
) -> Result<IntakeReport> {
    let mut dedup = HashDeduplicator::new(existing_hashes);
    let mut report = IntakeReport::default();

    for upload in uploads {
        let mime = match resolve_mime(upload.declared_mime.as_deref(), &upload.content) {
            Some(mime) if is_supported_mime(&mime) => mime,
            other => {
                info!(
                    file_name = %upload.file_name,
                    mime = ?other,
                    "Rejected unsupported file"
                );
                report.notifications.push(unsupported_message(&upload.file_name));
                continue;
            }
        };

        let content: Arc<[u8]> = Arc::from(upload.content);
        let hash = match dedup.check(calculate_hash(Arc::clone(&content)).await?) {
            HashResult::Unique(hash) => hash,
            HashResult::Duplicate(_) => {
                report.notifications.push(duplicate_message(&upload.file_name));
                continue;
            }
        };

        debug!(file_name = %upload.file_name, hash = %hash, mime = %mime, "Accepted upload");

        report.accepted.push(UploadCandidate {
            preview: preview_data_url(&mime, &content),
            file_name: upload.file_name,
            mime_type: mime,
            hash,
            content,
        });
    }

    Ok(report)
}
