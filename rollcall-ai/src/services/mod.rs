//! Service modules for the attendance ingest workflow
//!
//! Leaves first: hashing, intake, notifications, progress and summary math,
//! the sequential pipeline, the table editor, and the run orchestration that
//! ties the pipeline to the shared session.

pub mod analysis_runner;
pub mod file_intake;
pub mod hash_deduplicator;
pub mod notification_queue;
pub mod processing_pipeline;
pub mod progress_aggregator;
pub mod summary_calculator;
pub mod table_editor;

pub use analysis_runner::{AnalysisRunner, RunHandle};
pub use file_intake::{IntakeReport, RawUpload};
pub use hash_deduplicator::{calculate_hash, content_hash, HashDeduplicator, HashResult};
pub use notification_queue::{Notification, NotificationCenter, NotificationQueue};
pub use processing_pipeline::{PipelineOutcome, PipelineUpdate, ProcessingPipeline};
pub use progress_aggregator::{overall_percentage, SimulatedProgress};
pub use summary_calculator::{calculate_summary, SummaryView};
pub use table_editor::{ColumnDescriptor, Commit, EditError, EditorKind, TableEditor};
