//! Event types for the rollcall event system
//!
//! Provides shared event definitions and EventBus for rollcall services.

mod ingest_types;

pub use ingest_types::{EntryProgressInfo, EntryStatus, SessionPhase};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Rollcall event types
///
/// Events are broadcast via EventBus and serialized for SSE transmission.
/// All events use this central enum for type safety and exhaustive matching.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RollcallEvent {
    /// Files passed intake and joined the working set
    ///
    /// Triggers:
    /// - SSE: Render preview tiles
    FilesAccepted {
        /// Content hashes of newly accepted files, in upload order
        hashes: Vec<String>,
        /// Size of the working set after the batch
        working_set_size: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// One file was removed from the working set
    FileRemoved {
        hash: String,
        /// Phase after removal (`upload` once the set is empty)
        phase: SessionPhase,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Transient user-visible notification
    ///
    /// Each notification expires independently (see NotificationExpired).
    NotificationRaised {
        notification_id: Uuid,
        message: String,
        expires_at: chrono::DateTime<chrono::Utc>,
    },

    /// Notification reached its expiry and left the queue
    NotificationExpired {
        notification_id: Uuid,
    },

    /// Analysis run started
    AnalysisStarted {
        run_id: Uuid,
        /// Number of entries queued for sequential processing
        total_files: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// An entry changed lifecycle status
    EntryStatusChanged {
        run_id: Uuid,
        hash: String,
        file_name: String,
        old_status: EntryStatus,
        new_status: EntryStatus,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Overall progress for the running analysis
    ///
    /// Emitted on every status change and every simulated-progress tick.
    ProgressUpdate {
        run_id: Uuid,
        /// Overall percentage (0-100)
        percentage: u8,
        /// Entries in a terminal status
        finished: usize,
        total: usize,
        entries: Vec<EntryProgressInfo>,
    },

    /// Analysis run finished (possibly with failed entries)
    AnalysisCompleted {
        run_id: Uuid,
        records_extracted: usize,
        failed_files: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A single cell of the record set was committed by the editor
    RecordUpdated {
        record_id: String,
        column: String,
        value: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Session returned to its initial state ("start over")
    SessionReset {
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl RollcallEvent {
    /// Event name used as the SSE `event:` field
    pub fn event_type(&self) -> &str {
        match self {
            RollcallEvent::FilesAccepted { .. } => "FilesAccepted",
            RollcallEvent::FileRemoved { .. } => "FileRemoved",
            RollcallEvent::NotificationRaised { .. } => "NotificationRaised",
            RollcallEvent::NotificationExpired { .. } => "NotificationExpired",
            RollcallEvent::AnalysisStarted { .. } => "AnalysisStarted",
            RollcallEvent::EntryStatusChanged { .. } => "EntryStatusChanged",
            RollcallEvent::ProgressUpdate { .. } => "ProgressUpdate",
            RollcallEvent::AnalysisCompleted { .. } => "AnalysisCompleted",
            RollcallEvent::RecordUpdated { .. } => "RecordUpdated",
            RollcallEvent::SessionReset { .. } => "SessionReset",
        }
    }
}

/// Central event distribution bus
///
/// Thin wrapper over a tokio broadcast channel. Slow subscribers lose the
/// oldest events once `capacity` is exceeded.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<RollcallEvent>,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// # Examples
    ///
    /// ```
    /// use rollcall_common::events::EventBus;
    ///
    /// let event_bus = EventBus::new(100);
    /// let _rx = event_bus.subscribe();
    /// assert_eq!(event_bus.subscriber_count(), 1);
    /// ```
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<RollcallEvent> {
        self.tx.subscribe()
    }

    /// Emit an event, ignoring if no subscribers are listening
    ///
    /// ```
    /// use rollcall_common::events::{EventBus, RollcallEvent};
    ///
    /// let event_bus = EventBus::new(16);
    /// event_bus.emit_lossy(RollcallEvent::SessionReset {
    ///     timestamp: chrono::Utc::now(),
    /// });
    /// ```
    pub fn emit_lossy(&self, event: RollcallEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serializes_with_type_tag() {
        let event = RollcallEvent::NotificationExpired {
            notification_id: Uuid::nil(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "NotificationExpired");
        assert_eq!(event.event_type(), "NotificationExpired");
    }

    #[test]
    fn test_emit_without_subscribers_is_dropped() {
        let bus = EventBus::new(4);
        bus.emit_lossy(RollcallEvent::SessionReset {
            timestamp: chrono::Utc::now(),
        });
        assert_eq!(bus.subscriber_count(), 0);

        let rx = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);
        assert!(rx.is_empty());
    }

    #[tokio::test]
    async fn test_subscriber_receives_event() {
        let bus = EventBus::new(4);
        let mut rx = bus.subscribe();

        bus.emit_lossy(RollcallEvent::FileRemoved {
            hash: "abc".to_string(),
            phase: SessionPhase::Upload,
            timestamp: chrono::Utc::now(),
        });

        match rx.recv().await.unwrap() {
            RollcallEvent::FileRemoved { hash, phase, .. } => {
                assert_eq!(hash, "abc");
                assert_eq!(phase, SessionPhase::Upload);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }
}
