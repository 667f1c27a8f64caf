//! Health check endpoint
//!
//! Uptime, build identification, open event streams and the last recorded
//! error.

use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use rollcall_common::events::SessionPhase;
use serde::Serialize;

use crate::AppState;

/// Build identification captured by `build.rs`
#[derive(Debug, Clone, Serialize)]
pub struct BuildInfo {
    pub version: &'static str,
    pub git_hash: &'static str,
    pub build_timestamp: &'static str,
    pub build_profile: &'static str,
}

impl BuildInfo {
    pub fn current() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION"),
            git_hash: env!("GIT_HASH"),
            build_timestamp: env!("BUILD_TIMESTAMP"),
            build_profile: env!("BUILD_PROFILE"),
        }
    }
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status ("ok")
    pub status: String,
    /// Module name ("rollcall-ai")
    pub module: String,
    pub build: BuildInfo,
    /// Seconds since service started
    pub uptime_seconds: u64,
    /// Extractor in use ("gemini" or "unconfigured")
    pub extractor: &'static str,
    pub phase: SessionPhase,
    /// Open event streams
    pub event_subscribers: usize,
    /// Last error message if any (for diagnostics)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let uptime = Utc::now().signed_duration_since(state.startup_time);
    let uptime_seconds = uptime.num_seconds().max(0) as u64;

    let last_error = state.last_error.read().await.clone();
    let phase = state.session.read().await.phase();

    Json(HealthResponse {
        status: "ok".to_string(),
        module: "rollcall-ai".to_string(),
        build: BuildInfo::current(),
        uptime_seconds,
        extractor: state.extractor_name,
        phase,
        event_subscribers: state.event_bus.subscriber_count(),
        last_error,
    })
}

/// Build health check routes
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
