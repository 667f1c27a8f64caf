//! HTTP API handlers for rollcall-ai
//!
//! REST endpoints for intake, analysis, editing and export, plus one SSE
//! stream and the single-page UI.

pub mod analysis;
pub mod export;
pub mod files;
pub mod health;
pub mod records;
pub mod sse;
pub mod ui;

pub use analysis::analysis_routes;
pub use export::export_routes;
pub use files::file_routes;
pub use health::health_routes;
pub use records::record_routes;
pub use sse::event_stream;
pub use ui::ui_routes;
