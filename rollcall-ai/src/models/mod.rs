//! Data models for rollcall-ai (Attendance Ingest)

pub mod attendance_record;
pub mod session;
pub mod upload;

pub use attendance_record::{AttendanceRecord, Column, UnknownColumn};
pub use session::{
    AnalysisStart, ProgressView, RunTicket, SessionError, SessionSnapshot, StatusChange,
    WorkingSession,
};
pub use upload::{EntrySummary, InvalidTransition, ProcessingEntry, UploadCandidate};
