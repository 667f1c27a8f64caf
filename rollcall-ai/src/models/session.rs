//! Working session state machine
//!
//! Phases: `upload → preview → loading → results | error`. The session owns
//! the working set (one entry per accepted file), the record set and the
//! table editor. Pipeline updates are applied only when they carry the
//! current run id; anything else belongs to an abandoned run.

use crate::models::{AttendanceRecord, Column, EntrySummary, ProcessingEntry, UploadCandidate};
use crate::services::processing_pipeline::PipelineOutcome;
use crate::services::progress_aggregator::{overall_percentage, SimulatedProgress};
use crate::services::table_editor::{Commit, EditCursor, EditError, TableEditor};
use rollcall_common::events::{EntryProgressInfo, EntryStatus, SessionPhase};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Message shown when analysis is requested with nothing selected
pub const NO_FILES_MESSAGE: &str = "Please select at least one file.";

/// Session operation failure
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    /// Working set is locked while a run is in progress
    #[error("An analysis run is in progress")]
    Busy,

    #[error("No file with hash '{0}'")]
    UnknownFile(String),

    #[error(transparent)]
    Edit(#[from] EditError),
}

/// Everything a new run needs, taken from the session when it starts
#[derive(Debug, Clone)]
pub struct RunTicket {
    pub run_id: Uuid,
    pub candidates: Vec<Arc<UploadCandidate>>,
}

/// Result of asking the session to start analysis
#[derive(Debug, Clone)]
pub enum AnalysisStart {
    Started(RunTicket),
    /// Working set was empty; the session is now in the error phase
    NoFiles,
}

/// Status change accepted by the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub hash: String,
    pub file_name: String,
    pub old_status: EntryStatus,
    pub new_status: EntryStatus,
}

/// Overall progress of the current run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressView {
    pub percentage: u8,
    pub finished: usize,
    pub total: usize,
    pub entries: Vec<EntryProgressInfo>,
}

/// Serializable session view for the API
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub phase: SessionPhase,
    pub run_id: Option<Uuid>,
    pub entries: Vec<EntrySummary>,
    pub progress: ProgressView,
    pub error: Option<String>,
    pub record_count: usize,
    pub edit_cursor: Option<EditCursor>,
}

/// In-memory working session
#[derive(Debug, Clone)]
pub struct WorkingSession {
    phase: SessionPhase,
    run_id: Option<Uuid>,
    entries: Vec<ProcessingEntry>,
    records: Arc<Vec<AttendanceRecord>>,
    error: Option<String>,
    simulated: SimulatedProgress,
    editor: TableEditor,
}

impl Default for WorkingSession {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkingSession {
    pub fn new() -> Self {
        Self {
            phase: SessionPhase::Upload,
            run_id: None,
            entries: Vec::new(),
            records: Arc::new(Vec::new()),
            error: None,
            simulated: SimulatedProgress::default(),
            editor: TableEditor::new(),
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn run_id(&self) -> Option<Uuid> {
        self.run_id
    }

    pub fn entries(&self) -> &[ProcessingEntry] {
        &self.entries
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Shared handle on the current record set
    pub fn records(&self) -> Arc<Vec<AttendanceRecord>> {
        Arc::clone(&self.records)
    }

    pub fn editor(&self) -> &TableEditor {
        &self.editor
    }

    pub fn is_loading(&self) -> bool {
        self.phase == SessionPhase::Loading
    }

    fn set_phase(&mut self, next: SessionPhase) {
        if self.phase != next {
            debug!(from = ?self.phase, to = ?next, "Session phase transition");
            self.phase = next;
        }
    }

    /// Content hashes of the working set
    pub fn hashes(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.hash().to_string()).collect()
    }

    /// Append accepted files as pending entries
    ///
    /// A non-empty batch moves the session to `preview` and clears any
    /// previous results and error.
    pub fn add_entries(&mut self, candidates: Vec<UploadCandidate>) -> Result<Vec<String>, SessionError> {
        if self.is_loading() {
            return Err(SessionError::Busy);
        }
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let hashes: Vec<String> = candidates.iter().map(|c| c.hash.clone()).collect();
        self.entries
            .extend(candidates.into_iter().map(|c| ProcessingEntry::new(Arc::new(c))));
        self.records = Arc::new(Vec::new());
        self.error = None;
        self.editor.clear();
        self.set_phase(SessionPhase::Preview);

        info!(added = hashes.len(), working_set = self.entries.len(), "Files added to working set");
        Ok(hashes)
    }

    /// Remove one file; an empty working set returns to `upload`
    pub fn remove_entry(&mut self, hash: &str) -> Result<SessionPhase, SessionError> {
        if self.is_loading() {
            return Err(SessionError::Busy);
        }
        let position = self
            .entries
            .iter()
            .position(|e| e.hash() == hash)
            .ok_or_else(|| SessionError::UnknownFile(hash.to_string()))?;

        let removed = self.entries.remove(position);
        info!(hash = %hash, file_name = %removed.file_name(), "File removed from working set");

        if self.entries.is_empty() {
            *self = Self::new();
        }
        Ok(self.phase)
    }

    /// Start a new run over the whole working set
    ///
    /// Every entry restarts as `pending`; the previous record set is dropped.
    pub fn begin_run(&mut self) -> Result<AnalysisStart, SessionError> {
        if self.is_loading() {
            return Err(SessionError::Busy);
        }
        if self.entries.is_empty() {
            self.error = Some(NO_FILES_MESSAGE.to_string());
            self.set_phase(SessionPhase::Error);
            return Ok(AnalysisStart::NoFiles);
        }

        let run_id = Uuid::new_v4();
        self.entries = self.entries.iter().map(ProcessingEntry::restarted).collect();
        self.records = Arc::new(Vec::new());
        self.error = None;
        self.editor.clear();
        self.simulated.reset();
        self.run_id = Some(run_id);
        self.set_phase(SessionPhase::Loading);

        Ok(AnalysisStart::Started(RunTicket {
            run_id,
            candidates: self.entries.iter().map(|e| Arc::clone(&e.candidate)).collect(),
        }))
    }

    /// Whether `run_id` is the run currently loading
    pub fn is_current_run(&self, run_id: Uuid) -> bool {
        self.is_loading() && self.run_id == Some(run_id)
    }

    /// Apply one pipeline status update
    ///
    /// Returns `None` for stale runs, unknown hashes and illegal transitions.
    pub fn apply_status(
        &mut self,
        run_id: Uuid,
        hash: &str,
        status: EntryStatus,
        error: Option<String>,
    ) -> Option<StatusChange> {
        if !self.is_current_run(run_id) {
            debug!(run_id = %run_id, hash = %hash, "Ignoring update from stale run");
            return None;
        }

        let entry = self.entries.iter_mut().find(|e| e.hash() == hash)?;
        let old_status = match entry.transition_to(status) {
            Ok(old) => old,
            Err(e) => {
                warn!(error = %e, "Rejected status update");
                return None;
            }
        };
        if status == EntryStatus::Error {
            entry.error = error;
        }
        let change = StatusChange {
            hash: hash.to_string(),
            file_name: entry.file_name().to_string(),
            old_status,
            new_status: status,
        };

        if status == EntryStatus::Processing {
            self.simulated.track(Some(hash));
        } else if self.simulated.in_flight() == Some(hash) {
            self.simulated.track(None);
        }
        Some(change)
    }

    /// Advance the simulated sub-progress of the in-flight entry
    ///
    /// Returns `None` once the run is no longer current, which tells the
    /// ticker to stop.
    pub fn tick_simulation(&mut self, run_id: Uuid, jitter: f64) -> Option<ProgressView> {
        if !self.is_current_run(run_id) {
            return None;
        }
        self.simulated.tick(jitter);
        Some(self.progress())
    }

    /// Install the outcome of a finished run
    ///
    /// Returns `false` (and changes nothing) when the run is stale.
    pub fn finish_run(&mut self, run_id: Uuid, outcome: PipelineOutcome) -> bool {
        if !self.is_current_run(run_id) {
            debug!(run_id = %run_id, "Ignoring outcome of stale run");
            return false;
        }
        self.records = Arc::new(outcome.records);
        self.simulated.reset();
        self.run_id = None;
        self.set_phase(SessionPhase::Results);
        true
    }

    /// Back to the initial state; any running pipeline becomes stale
    pub fn reset(&mut self) {
        if let Some(run_id) = self.run_id {
            info!(run_id = %run_id, "Abandoning analysis run");
        }
        *self = Self::new();
    }

    pub fn progress(&self) -> ProgressView {
        let statuses: Vec<EntryStatus> = self.entries.iter().map(|e| e.status).collect();
        ProgressView {
            percentage: overall_percentage(&statuses, self.simulated.value()),
            finished: statuses.iter().filter(|s| s.is_terminal()).count(),
            total: statuses.len(),
            entries: self.entries.iter().map(ProcessingEntry::progress_info).collect(),
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            phase: self.phase,
            run_id: self.run_id,
            entries: self.entries.iter().map(ProcessingEntry::summary).collect(),
            progress: self.progress(),
            error: self.error.clone(),
            record_count: self.records.len(),
            edit_cursor: self.editor.cursor().cloned(),
        }
    }

    fn install(&mut self, commit: Option<Commit>) -> Option<Commit> {
        if let Some(commit) = &commit {
            self.records = Arc::new(commit.records.clone());
        }
        commit
    }

    /// Open a cell; a blur-commit of the previous cell is returned
    pub fn begin_edit(&mut self, record_id: &str, column: Column) -> Result<Option<Commit>, SessionError> {
        let records = self.records();
        let commit = self.editor.begin_edit(&records, record_id, column)?;
        Ok(self.install(commit))
    }

    pub fn edit_input(&mut self, value: impl Into<String>) -> Result<(), SessionError> {
        Ok(self.editor.input(value)?)
    }

    pub fn commit_edit(&mut self) -> Result<Commit, SessionError> {
        let records = self.records();
        let commit = self.editor.commit(&records)?;
        self.records = Arc::new(commit.records.clone());
        Ok(commit)
    }

    pub fn cancel_edit(&mut self) -> Result<(), SessionError> {
        Ok(self.editor.cancel()?)
    }

    pub fn select_choice(&mut self, value: &str) -> Result<Commit, SessionError> {
        let records = self.records();
        let commit = self.editor.select(&records, value)?;
        self.records = Arc::new(commit.records.clone());
        Ok(commit)
    }

    /// Leave the open cell without moving to another one
    pub fn blur_edit(&mut self) -> Result<Option<Commit>, SessionError> {
        let records = self.records();
        let commit = self.editor.blur(&records)?;
        Ok(self.install(commit))
    }
}
