//! Test Helper Utilities
//!
//! Shared utilities for rollcall-ai integration tests: a scripted
//! extractor, app construction, multipart bodies and event waiting.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use http_body_util::BodyExt;
use rollcall_ai::config::ServiceConfig;
use rollcall_ai::extractors::{ExtractionError, RecordExtractor};
use rollcall_ai::models::AttendanceRecord;
use rollcall_ai::AppState;
use rollcall_common::events::RollcallEvent;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

pub const BOUNDARY: &str = "rollcall-test-boundary";

/// PNG signature plus a marker, so each sheet has distinct content
pub fn png_sheet(marker: &str) -> Vec<u8> {
    let mut bytes = vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
    bytes.extend_from_slice(marker.as_bytes());
    bytes
}

/// Extractor that returns one record per file, named after the marker
/// embedded by [`png_sheet`]
///
/// Files whose marker starts with "fail" produce an API error. Calls are
/// counted when they start and when they finish, and overlapping calls are
/// recorded.
#[derive(Default)]
pub struct ScriptedExtractor {
    pub delay: Duration,
    pub started: AtomicUsize,
    pub calls: AtomicUsize,
    in_flight: AtomicUsize,
    pub overlapped: AtomicBool,
}

impl ScriptedExtractor {
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    /// Wait until at least `count` calls have started
    pub async fn wait_for_started(&self, count: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while self.started() < count {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("timed out waiting for extraction to start");
    }
}

#[async_trait]
impl RecordExtractor for ScriptedExtractor {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn extract(&self, payload: &str, _mime_type: &str) -> Result<Vec<AttendanceRecord>, ExtractionError> {
        self.started.fetch_add(1, Ordering::SeqCst);
        if self.in_flight.fetch_add(1, Ordering::SeqCst) > 0 {
            self.overlapped.store(true, Ordering::SeqCst);
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.calls.fetch_add(1, Ordering::SeqCst);

        let bytes = STANDARD
            .decode(payload)
            .map_err(|e| ExtractionError::Parse(e.to_string()))?;
        let marker = String::from_utf8_lossy(&bytes[8.min(bytes.len())..]).to_string();

        if marker.starts_with("fail") {
            return Err(ExtractionError::Api("quota exceeded".to_string()));
        }
        Ok(vec![AttendanceRecord {
            id: marker.clone(),
            firstname: format!("First {}", marker),
            lastname: format!("Last {}", marker),
            sex: "Female".to_string(),
            do_you_have_any_disability: "No".to_string(),
            highest_qualification: "Degree".to_string(),
            employment_type: "Employed".to_string(),
            ..Default::default()
        }])
    }
}

/// App state around a scripted extractor with a fast progress tick
pub fn test_state(extractor: Arc<ScriptedExtractor>) -> AppState {
    let config = ServiceConfig {
        progress_tick: Duration::from_millis(20),
        ..ServiceConfig::default()
    };
    AppState::new(config, extractor)
}

/// Build a multipart body from (file name, content type, bytes)
pub fn multipart_body(files: &[(&str, &str, Vec<u8>)]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, content_type, content) in files {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"files\"; filename=\"{}\"\r\n",
                name
            )
            .as_bytes(),
        );
        body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
        body.extend_from_slice(content);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn upload_request(files: &[(&str, &str, Vec<u8>)]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/files")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(multipart_body(files)))
        .unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn post(uri: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response.into_body().collect().await.unwrap().to_bytes().to_vec()
}

pub async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

/// Wait for the first event matching `predicate`
pub async fn wait_for_event<F>(rx: &mut broadcast::Receiver<RollcallEvent>, predicate: F) -> RollcallEvent
where
    F: Fn(&RollcallEvent) -> bool,
{
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match rx.recv().await {
                Ok(event) if predicate(&event) => return event,
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => panic!("event bus closed"),
            }
        }
    })
    .await
    .expect("timed out waiting for event")
}
