//! Server-Sent Events stream
//!
//! GET /events forwards every bus event: intake, notifications, run
//! progress and record edits.

use crate::AppState;
use axum::{
    extract::State,
    response::sse::{Event, Sse},
};
use futures::stream::Stream;
use std::convert::Infallible;

/// GET /events
pub async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    rollcall_common::sse::create_event_sse_stream("rollcall-ai", &state.event_bus)
}
