//! Ingest workflow type definitions
//!
//! Supporting types for rollcall-ai progress tracking. They live here because
//! the event enum carries them across the SSE boundary.

use serde::{Deserialize, Serialize};

/// Lifecycle state of one uploaded file within an analysis run
///
/// `Pending → Processing → Completed | Error`. The last two are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    /// Accepted, waiting for its turn
    Pending,
    /// Currently being extracted (at most one entry at a time)
    Processing,
    /// Extraction succeeded, records appended
    Completed,
    /// Read or extraction failure, local to this file
    Error,
}

impl EntryStatus {
    /// Terminal statuses never transition again
    pub fn is_terminal(&self) -> bool {
        matches!(self, EntryStatus::Completed | EntryStatus::Error)
    }

    /// Whether moving from `self` to `next` is a legal lifecycle step
    pub fn can_transition_to(&self, next: EntryStatus) -> bool {
        matches!(
            (self, next),
            (EntryStatus::Pending, EntryStatus::Processing)
                | (EntryStatus::Processing, EntryStatus::Completed)
                | (EntryStatus::Processing, EntryStatus::Error)
        )
    }
}

/// Application phase of the working session
///
/// `Upload → Preview → Loading → Results`, with `Error` reachable from
/// `Preview` when analysis is requested on an empty working set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionPhase {
    /// Initial state, no files selected
    Upload,
    /// Files selected, awaiting analysis
    Preview,
    /// Analysis run in progress
    Loading,
    /// Record set available for review/export
    Results,
    /// Blocking application-level error, dismissible via reset
    Error,
}

/// Per-file status summary carried by progress events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryProgressInfo {
    /// Content hash identifying the entry
    pub hash: String,
    /// Original file name
    pub file_name: String,
    /// Current status
    pub status: EntryStatus,
}
