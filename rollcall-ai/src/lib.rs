//! rollcall-ai library interface
//!
//! Attendance Ingest: uploads attendance-sheet scans, extracts rows through
//! an external service one file at a time, and serves the editable record
//! set and its exports over HTTP + SSE.

pub mod api;
pub mod config;
pub mod error;
pub mod export;
pub mod extractors;
pub mod models;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use crate::config::ServiceConfig;
use crate::extractors::RecordExtractor;
use crate::models::WorkingSession;
use crate::services::{AnalysisRunner, NotificationCenter, ProcessingPipeline};
use axum::extract::DefaultBodyLimit;
use axum::Router;
use chrono::{DateTime, Utc};
use rollcall_common::events::EventBus;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;

/// Largest accepted upload request (all files of one batch)
pub const MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// The single working session (phase, entries, records, editor)
    pub session: Arc<RwLock<WorkingSession>>,
    /// Event bus for SSE broadcasting
    pub event_bus: EventBus,
    /// Transient user notifications
    pub notifications: NotificationCenter,
    /// Starts analysis runs against `session`
    pub runner: AnalysisRunner,
    pub config: Arc<ServiceConfig>,
    /// Name of the active extractor (for diagnostics)
    pub extractor_name: &'static str,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last error for diagnostic purposes
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(config: ServiceConfig, extractor: Arc<dyn RecordExtractor>) -> Self {
        let event_bus = EventBus::new(config.event_capacity);
        let session = Arc::new(RwLock::new(WorkingSession::new()));
        let notifications = NotificationCenter::new(config.notification_ttl, event_bus.clone());
        let extractor_name = extractor.name();
        let runner = AnalysisRunner::new(
            Arc::clone(&session),
            ProcessingPipeline::new(extractor),
            event_bus.clone(),
            notifications.clone(),
            config.progress_tick,
        );

        Self {
            session,
            event_bus,
            notifications,
            runner,
            config: Arc::new(config),
            extractor_name,
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }

    /// Remember an error for `/health`
    pub async fn record_error(&self, message: impl Into<String>) {
        *self.last_error.write().await = Some(message.into());
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    Router::new()
        // UI route (HTML page)
        .merge(api::ui_routes())
        // API routes
        .merge(api::file_routes())
        .merge(api::analysis_routes())
        .merge(api::record_routes())
        .merge(api::export_routes())
        .merge(api::health_routes())
        .route("/events", get(api::event_stream))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
