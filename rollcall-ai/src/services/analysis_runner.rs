//! Analysis run orchestration
//!
//! Starting a run spawns three tasks:
//! - the pipeline, which processes entries one at a time and publishes
//!   updates on a channel;
//! - the applier, the only task that writes pipeline results into the
//!   session, which then broadcasts events;
//! - the ticker, which advances the simulated progress of the in-flight
//!   entry until the run finishes or goes stale.
//!
//! "Start over" does not interrupt an extraction call already in flight. It
//! clears the run id: the pipeline starts no further entry, the applier
//! stops at the old run's next update, and a new run waits for the
//! outstanding call before making its own.

use crate::models::{AnalysisStart, ProgressView, SessionError, StatusChange, WorkingSession};
use crate::services::notification_queue::NotificationCenter;
use crate::services::processing_pipeline::{failure_notification, PipelineUpdate, ProcessingPipeline};
use crate::services::progress_aggregator::MAX_JITTER;
use chrono::Utc;
use rand::Rng;
use rollcall_common::events::{EventBus, RollcallEvent};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};
use uuid::Uuid;

/// Default simulated-progress tick
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(500);

/// Handle on a started run
pub struct RunHandle {
    pub run_id: Uuid,
    /// Finishes once the run's outcome has been applied (or discarded)
    pub applier: JoinHandle<()>,
}

/// Starts analysis runs against the shared session
#[derive(Clone)]
pub struct AnalysisRunner {
    session: Arc<RwLock<WorkingSession>>,
    pipeline: ProcessingPipeline,
    event_bus: EventBus,
    notifications: NotificationCenter,
    tick_interval: Duration,
    /// Run the session currently wants, read by running pipelines
    current_run: Arc<watch::Sender<Option<Uuid>>>,
}

fn progress_event(run_id: Uuid, progress: ProgressView) -> RollcallEvent {
    RollcallEvent::ProgressUpdate {
        run_id,
        percentage: progress.percentage,
        finished: progress.finished,
        total: progress.total,
        entries: progress.entries,
    }
}

fn status_event(run_id: Uuid, change: StatusChange) -> RollcallEvent {
    RollcallEvent::EntryStatusChanged {
        run_id,
        hash: change.hash,
        file_name: change.file_name,
        old_status: change.old_status,
        new_status: change.new_status,
        timestamp: Utc::now(),
    }
}

impl AnalysisRunner {
    pub fn new(
        session: Arc<RwLock<WorkingSession>>,
        pipeline: ProcessingPipeline,
        event_bus: EventBus,
        notifications: NotificationCenter,
        tick_interval: Duration,
    ) -> Self {
        Self {
            session,
            pipeline,
            event_bus,
            notifications,
            tick_interval,
            current_run: Arc::new(watch::Sender::new(None)),
        }
    }

    /// Start a run over the working set
    ///
    /// `Ok(None)` means the working set was empty and the session moved to
    /// its error phase. `Err(Busy)` means a run is already in progress.
    pub async fn start(&self) -> Result<Option<RunHandle>, SessionError> {
        let ticket = {
            let mut session = self.session.write().await;
            match session.begin_run()? {
                AnalysisStart::Started(ticket) => {
                    self.current_run.send_replace(Some(ticket.run_id));
                    ticket
                }
                AnalysisStart::NoFiles => {
                    info!("Analysis requested with an empty working set");
                    return Ok(None);
                }
            }
        };
        let run_id = ticket.run_id;

        self.event_bus.emit_lossy(RollcallEvent::AnalysisStarted {
            run_id,
            total_files: ticket.candidates.len(),
            timestamp: Utc::now(),
        });

        let (tx, rx) = mpsc::unbounded_channel();

        let pipeline = self.pipeline.clone();
        let current = self.current_run.subscribe();
        tokio::spawn(async move {
            pipeline.run(run_id, ticket.candidates, &tx, &current).await;
        });

        let applier = tokio::spawn(self.clone().apply_updates(run_id, rx));
        tokio::spawn(self.clone().tick(run_id));

        Ok(Some(RunHandle { run_id, applier }))
    }

    /// Start over: reset the session and abandon any running pipeline
    pub async fn reset(&self) {
        let mut session = self.session.write().await;
        session.reset();
        self.current_run.send_replace(None);
    }

    async fn apply_updates(self, run_id: Uuid, mut rx: mpsc::UnboundedReceiver<PipelineUpdate>) {
        while let Some(update) = rx.recv().await {
            match update {
                PipelineUpdate::Status {
                    run_id,
                    hash,
                    status,
                    error,
                } => {
                    let mut session = self.session.write().await;
                    if !session.is_current_run(run_id) {
                        debug!(run_id = %run_id, "Run abandoned, dropping its updates");
                        break;
                    }
                    if let Some(change) = session.apply_status(run_id, &hash, status, error) {
                        self.event_bus.emit_lossy(status_event(run_id, change));
                        self.event_bus.emit_lossy(progress_event(run_id, session.progress()));
                    }
                }
                PipelineUpdate::Finished { run_id, outcome } => {
                    let records_extracted = outcome.records.len();
                    let failed = outcome.failed;

                    let applied = {
                        let mut session = self.session.write().await;
                        let progress = session.progress();
                        let applied = session.finish_run(run_id, outcome);
                        if applied {
                            self.event_bus.emit_lossy(progress_event(run_id, progress));
                        }
                        applied
                    };
                    if !applied {
                        break;
                    }

                    if let Some(message) = failure_notification(failed) {
                        self.notifications.notify(message);
                    }
                    self.event_bus.emit_lossy(RollcallEvent::AnalysisCompleted {
                        run_id,
                        records_extracted,
                        failed_files: failed,
                        timestamp: Utc::now(),
                    });
                    break;
                }
            }
        }
        debug!(run_id = %run_id, "Update applier stopped");
    }

    async fn tick(self, run_id: Uuid) {
        let mut interval = tokio::time::interval(self.tick_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // first tick completes immediately
        interval.tick().await;

        loop {
            interval.tick().await;
            let jitter = rand::thread_rng().gen_range(0.0..MAX_JITTER);
            let progress = self.session.write().await.tick_simulation(run_id, jitter);
            match progress {
                Some(progress) => self.event_bus.emit_lossy(progress_event(run_id, progress)),
                None => break,
            }
        }
        debug!(run_id = %run_id, "Progress ticker stopped");
    }
}
