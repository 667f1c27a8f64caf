//! Sequential extraction pipeline
//!
//! Folds over the entries of one analysis run, strictly one file at a time:
//! mark `processing`, encode, call the extractor, then mark `completed` or
//! `error`. A failure is scoped to its entry and the fold continues. Every
//! status change is published on an update channel tagged with the run id so
//! the session can drop updates from a run that was abandoned.
//!
//! An abandoned run stops before its next entry. Extraction calls from every
//! run go through one shared slot, so a new run waits for the call an
//! abandoned run still has outstanding.

use crate::extractors::{ExtractionError, RecordExtractor, UNREADABLE_MESSAGE};
use crate::models::{AttendanceRecord, UploadCandidate};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use futures::future;
use futures::stream::{self, StreamExt};
use rollcall_common::events::EntryStatus;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Message published by a running pipeline
#[derive(Debug, Clone)]
pub enum PipelineUpdate {
    /// One entry changed status
    Status {
        run_id: Uuid,
        hash: String,
        status: EntryStatus,
        error: Option<String>,
    },
    /// The whole list has been processed
    Finished { run_id: Uuid, outcome: PipelineOutcome },
}

impl PipelineUpdate {
    pub fn run_id(&self) -> Uuid {
        match self {
            PipelineUpdate::Status { run_id, .. } | PipelineUpdate::Finished { run_id, .. } => *run_id,
        }
    }
}

/// Result of folding over every entry
#[derive(Debug, Clone, Default)]
pub struct PipelineOutcome {
    /// Records from every successful file, in entry order
    pub records: Vec<AttendanceRecord>,
    /// Final status per entry hash, in entry order
    pub statuses: Vec<(String, EntryStatus)>,
    pub failed: usize,
}

impl PipelineOutcome {
    pub fn succeeded(&self) -> usize {
        self.statuses.len() - self.failed
    }
}

/// Notification raised after a run with failures
pub fn failure_notification(failed: usize) -> Option<String> {
    (failed > 0).then(|| format!("{} file(s) could not be processed.", failed))
}

/// Base64 payload for one file, encoded on the blocking pool
pub async fn encode_payload(content: Arc<[u8]>) -> Result<String, ExtractionError> {
    if content.is_empty() {
        return Err(ExtractionError::Unreadable(UNREADABLE_MESSAGE.to_string()));
    }
    tokio::task::spawn_blocking(move || STANDARD.encode(&content))
        .await
        .map_err(|_| ExtractionError::Unreadable(UNREADABLE_MESSAGE.to_string()))
}

/// Sequential pipeline over one extractor
#[derive(Clone)]
pub struct ProcessingPipeline {
    extractor: Arc<dyn RecordExtractor>,
    /// Held for the duration of one extractor call, across all runs
    extraction_slot: Arc<Mutex<()>>,
}

impl ProcessingPipeline {
    pub fn new(extractor: Arc<dyn RecordExtractor>) -> Self {
        Self {
            extractor,
            extraction_slot: Arc::new(Mutex::new(())),
        }
    }

    pub fn extractor_name(&self) -> &'static str {
        self.extractor.name()
    }

    async fn extract_one(&self, candidate: &UploadCandidate) -> Result<Vec<AttendanceRecord>, ExtractionError> {
        let payload = encode_payload(Arc::clone(&candidate.content)).await?;
        let _slot = self.extraction_slot.lock().await;
        self.extractor.extract(&payload, &candidate.mime_type).await
    }

    /// Process every candidate in order, one extraction at a time
    ///
    /// Publishes `Status` updates as entries move, then a single `Finished`.
    /// `current` carries the id of the run the session still wants; once it
    /// differs from `run_id` no further entry is started. A dropped update
    /// receiver on its own does not stop the run.
    pub async fn run(
        &self,
        run_id: Uuid,
        candidates: Vec<Arc<UploadCandidate>>,
        updates: &UnboundedSender<PipelineUpdate>,
        current: &watch::Receiver<Option<Uuid>>,
    ) -> PipelineOutcome {
        let total = candidates.len();
        info!(run_id = %run_id, total_files = total, extractor = self.extractor.name(), "Analysis run started");

        let publish = |hash: &str, status: EntryStatus, error: Option<String>| {
            let _ = updates.send(PipelineUpdate::Status {
                run_id,
                hash: hash.to_string(),
                status,
                error,
            });
        };

        let is_current = || *current.borrow() == Some(run_id);

        let outcome = stream::iter(candidates.into_iter().enumerate())
            .take_while(|_| future::ready(is_current()))
            .fold(PipelineOutcome::default(), |mut outcome, (index, candidate)| async move {
                publish(&candidate.hash, EntryStatus::Processing, None);
                debug!(run_id = %run_id, hash = %candidate.hash, position = index + 1, total, "Processing file");

                match self.extract_one(&candidate).await {
                    Ok(records) => {
                        debug!(
                            run_id = %run_id,
                            hash = %candidate.hash,
                            records = records.len(),
                            "File extracted"
                        );
                        outcome.records.extend(records);
                        outcome.statuses.push((candidate.hash.clone(), EntryStatus::Completed));
                        publish(&candidate.hash, EntryStatus::Completed, None);
                    }
                    Err(e) => {
                        warn!(
                            run_id = %run_id,
                            hash = %candidate.hash,
                            file_name = %candidate.file_name,
                            error = %e,
                            "File extraction failed"
                        );
                        outcome.failed += 1;
                        outcome.statuses.push((candidate.hash.clone(), EntryStatus::Error));
                        publish(&candidate.hash, EntryStatus::Error, Some(e.user_message().to_string()));
                    }
                }
                outcome
            })
            .await;

        if !is_current() {
            info!(run_id = %run_id, processed = outcome.statuses.len(), total, "Abandoned run stopped");
        }
        info!(
            run_id = %run_id,
            records = outcome.records.len(),
            failed = outcome.failed,
            "Analysis run finished"
        );

        let _ = updates.send(PipelineUpdate::Finished {
            run_id,
            outcome: outcome.clone(),
        });
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex as StdMutex;
    use tokio::sync::mpsc;

    /// Fails for any payload listed in `failing`
    struct EchoExtractor {
        failing: Vec<String>,
        calls: StdMutex<Vec<String>>,
    }

    #[async_trait]
    impl RecordExtractor for EchoExtractor {
        fn name(&self) -> &'static str {
            "echo"
        }

        async fn extract(&self, payload: &str, _mime_type: &str) -> Result<Vec<AttendanceRecord>, ExtractionError> {
            self.calls.lock().unwrap().push(payload.to_string());
            if self.failing.iter().any(|p| p == payload) {
                return Err(ExtractionError::Api("boom".to_string()));
            }
            Ok(vec![AttendanceRecord {
                id: payload.to_string(),
                ..Default::default()
            }])
        }
    }

    fn candidate(hash: &str, content: &[u8]) -> Arc<UploadCandidate> {
        Arc::new(UploadCandidate {
            file_name: format!("{}.png", hash),
            mime_type: "image/png".to_string(),
            hash: hash.to_string(),
            content: Arc::from(content),
            preview: String::new(),
        })
    }

    #[test]
    fn test_failure_notification_text() {
        assert_eq!(failure_notification(0), None);
        assert_eq!(failure_notification(2).as_deref(), Some("2 file(s) could not be processed."));
    }

    #[tokio::test]
    async fn test_encode_payload() {
        assert_eq!(encode_payload(Arc::from(&b"abc"[..])).await.unwrap(), "YWJj");
        assert_eq!(
            encode_payload(Arc::from(&b""[..])).await,
            Err(ExtractionError::Unreadable("Could not read the file content.".to_string()))
        );
    }

    #[tokio::test]
    async fn test_middle_failure_keeps_other_records() {
        let extractor = Arc::new(EchoExtractor {
            failing: vec![STANDARD.encode(b"two")],
            calls: StdMutex::new(Vec::new()),
        });
        let pipeline = ProcessingPipeline::new(extractor.clone());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let run_id = Uuid::new_v4();
        let (_current_tx, current) = watch::channel(Some(run_id));

        let outcome = pipeline
            .run(
                run_id,
                vec![candidate("h1", b"one"), candidate("h2", b"two"), candidate("h3", b"three")],
                &tx,
                &current,
            )
            .await;

        let ids: Vec<_> = outcome.records.iter().map(|r| r.id.clone()).collect();
        assert_eq!(ids, vec![STANDARD.encode(b"one"), STANDARD.encode(b"three")]);
        assert_eq!(outcome.failed, 1);
        assert_eq!(outcome.succeeded(), 2);
        assert_eq!(outcome.statuses[1], ("h2".to_string(), EntryStatus::Error));
        assert_eq!(extractor.calls.lock().unwrap().len(), 3);

        // processing/terminal pairs in order, then Finished
        let mut seen = Vec::new();
        while let Ok(update) = rx.try_recv() {
            assert_eq!(update.run_id(), run_id);
            if let PipelineUpdate::Status { hash, status, .. } = update {
                seen.push((hash, status));
            }
        }
        assert_eq!(
            seen,
            vec![
                ("h1".to_string(), EntryStatus::Processing),
                ("h1".to_string(), EntryStatus::Completed),
                ("h2".to_string(), EntryStatus::Processing),
                ("h2".to_string(), EntryStatus::Error),
                ("h3".to_string(), EntryStatus::Processing),
                ("h3".to_string(), EntryStatus::Completed),
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_file_fails_without_calling_extractor() {
        let extractor = Arc::new(EchoExtractor {
            failing: Vec::new(),
            calls: StdMutex::new(Vec::new()),
        });
        let pipeline = ProcessingPipeline::new(extractor.clone());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let run_id = Uuid::new_v4();
        let (_current_tx, current) = watch::channel(Some(run_id));

        let outcome = pipeline.run(run_id, vec![candidate("empty", b"")], &tx, &current).await;

        assert_eq!(outcome.failed, 1);
        assert!(extractor.calls.lock().unwrap().is_empty());

        let _processing = rx.try_recv().unwrap();
        match rx.try_recv().unwrap() {
            PipelineUpdate::Status { status, error, .. } => {
                assert_eq!(status, EntryStatus::Error);
                assert_eq!(error.as_deref(), Some("Could not read the file content."));
            }
            other => panic!("unexpected update: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_dropped_receiver_still_returns_outcome() {
        let extractor = Arc::new(EchoExtractor {
            failing: Vec::new(),
            calls: StdMutex::new(Vec::new()),
        });
        let pipeline = ProcessingPipeline::new(extractor);
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let run_id = Uuid::new_v4();
        let (_current_tx, current) = watch::channel(Some(run_id));

        let outcome = pipeline.run(run_id, vec![candidate("a", b"a")], &tx, &current).await;
        assert_eq!(outcome.records.len(), 1);
    }

    /// Abandons the run from inside its first call
    struct AbandoningExtractor {
        current: watch::Sender<Option<Uuid>>,
        calls: StdMutex<usize>,
    }

    #[async_trait]
    impl RecordExtractor for AbandoningExtractor {
        fn name(&self) -> &'static str {
            "abandoning"
        }

        async fn extract(&self, _payload: &str, _mime_type: &str) -> Result<Vec<AttendanceRecord>, ExtractionError> {
            *self.calls.lock().unwrap() += 1;
            self.current.send_replace(None);
            Ok(vec![AttendanceRecord::default()])
        }
    }

    #[tokio::test]
    async fn test_abandoned_run_starts_no_further_entry() {
        let run_id = Uuid::new_v4();
        let (current_tx, current) = watch::channel(Some(run_id));
        let extractor = Arc::new(AbandoningExtractor {
            current: current_tx,
            calls: StdMutex::new(0),
        });
        let pipeline = ProcessingPipeline::new(extractor.clone());
        let (tx, _rx) = mpsc::unbounded_channel();

        let outcome = pipeline
            .run(
                run_id,
                vec![candidate("h1", b"one"), candidate("h2", b"two"), candidate("h3", b"three")],
                &tx,
                &current,
            )
            .await;

        // the outstanding call completes; nothing after it starts
        assert_eq!(*extractor.calls.lock().unwrap(), 1);
        assert_eq!(outcome.statuses, vec![("h1".to_string(), EntryStatus::Completed)]);
    }
}
