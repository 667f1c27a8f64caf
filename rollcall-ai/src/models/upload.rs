//! Uploaded file models
//!
//! An [`UploadCandidate`] is a file that passed intake. Each candidate in the
//! working set is tracked by one [`ProcessingEntry`] whose status follows
//! `pending → processing → completed | error`.

use rollcall_common::events::{EntryProgressInfo, EntryStatus};
use serde::Serialize;
use std::sync::Arc;

/// Accepted upload, ready for analysis
#[derive(Debug, Clone)]
pub struct UploadCandidate {
    /// Original file name (display only, not part of the dedup key)
    pub file_name: String,
    /// MIME type, declared or sniffed
    pub mime_type: String,
    /// Lower-case hex SHA-256 of the full content
    pub hash: String,
    /// Raw bytes
    pub content: Arc<[u8]>,
    /// `data:` URL for on-screen preview
    pub preview: String,
}

impl UploadCandidate {
    pub fn size_bytes(&self) -> usize {
        self.content.len()
    }

    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }
}

/// Illegal status change attempted on an entry
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid status transition for {hash}: {from:?} -> {to:?}")]
pub struct InvalidTransition {
    pub hash: String,
    pub from: EntryStatus,
    pub to: EntryStatus,
}

/// One candidate's position in an analysis run
#[derive(Debug, Clone)]
pub struct ProcessingEntry {
    pub candidate: Arc<UploadCandidate>,
    pub status: EntryStatus,
    /// Failure reason once the entry reaches `Error`
    pub error: Option<String>,
}

impl ProcessingEntry {
    /// New entry in `Pending`
    pub fn new(candidate: Arc<UploadCandidate>) -> Self {
        Self {
            candidate,
            status: EntryStatus::Pending,
            error: None,
        }
    }

    pub fn hash(&self) -> &str {
        &self.candidate.hash
    }

    pub fn file_name(&self) -> &str {
        &self.candidate.file_name
    }

    /// Fresh `Pending` entry for the same candidate (used when a new run starts)
    pub fn restarted(&self) -> Self {
        Self::new(Arc::clone(&self.candidate))
    }

    /// Apply a lifecycle step, returning the previous status
    ///
    /// Terminal statuses reject every further change.
    pub fn transition_to(&mut self, next: EntryStatus) -> Result<EntryStatus, InvalidTransition> {
        if !self.status.can_transition_to(next) {
            return Err(InvalidTransition {
                hash: self.hash().to_string(),
                from: self.status,
                to: next,
            });
        }
        let old = self.status;
        self.status = next;
        Ok(old)
    }

    pub fn progress_info(&self) -> EntryProgressInfo {
        EntryProgressInfo {
            hash: self.hash().to_string(),
            file_name: self.file_name().to_string(),
            status: self.status,
        }
    }

    pub fn summary(&self) -> EntrySummary {
        EntrySummary {
            hash: self.hash().to_string(),
            file_name: self.file_name().to_string(),
            mime_type: self.candidate.mime_type.clone(),
            size_bytes: self.candidate.size_bytes(),
            is_image: self.candidate.is_image(),
            preview: self.candidate.preview.clone(),
            status: self.status,
            error: self.error.clone(),
        }
    }
}

/// Serializable view of an entry for the API
#[derive(Debug, Clone, Serialize)]
pub struct EntrySummary {
    pub hash: String,
    pub file_name: String,
    pub mime_type: String,
    pub size_bytes: usize,
    pub is_image: bool,
    pub preview: String,
    pub status: EntryStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(hash: &str) -> Arc<UploadCandidate> {
        Arc::new(UploadCandidate {
            file_name: "sheet.png".to_string(),
            mime_type: "image/png".to_string(),
            hash: hash.to_string(),
            content: Arc::from(&b"png"[..]),
            preview: "data:image/png;base64,cG5n".to_string(),
        })
    }

    #[test]
    fn test_entry_lifecycle() {
        let mut entry = ProcessingEntry::new(candidate("aa"));
        assert_eq!(entry.status, EntryStatus::Pending);

        assert_eq!(entry.transition_to(EntryStatus::Processing), Ok(EntryStatus::Pending));
        assert_eq!(entry.transition_to(EntryStatus::Completed), Ok(EntryStatus::Processing));
        assert!(entry.transition_to(EntryStatus::Processing).is_err());
        assert_eq!(entry.status, EntryStatus::Completed);
    }

    #[test]
    fn test_pending_cannot_skip_processing() {
        let mut entry = ProcessingEntry::new(candidate("bb"));
        let err = entry.transition_to(EntryStatus::Error).unwrap_err();
        assert_eq!(err.from, EntryStatus::Pending);
        assert_eq!(err.to, EntryStatus::Error);
    }

    #[test]
    fn test_restarted_entry_is_pending() {
        let mut entry = ProcessingEntry::new(candidate("cc"));
        entry.transition_to(EntryStatus::Processing).unwrap();
        entry.transition_to(EntryStatus::Error).unwrap();
        entry.error = Some("boom".to_string());

        let fresh = entry.restarted();
        assert_eq!(fresh.status, EntryStatus::Pending);
        assert!(fresh.error.is_none());
        assert_eq!(fresh.hash(), "cc");
    }
}
