//! Transient user notifications
//!
//! Each notification expires a fixed delay after it was raised, on its own
//! schedule. Expiry removes by id, so a timer can only ever remove the
//! notification it was started for.

use chrono::{DateTime, Utc};
use rollcall_common::events::{EventBus, RollcallEvent};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use uuid::Uuid;

/// Default lifetime of a notification
pub const DEFAULT_TTL: Duration = Duration::from_secs(3);

/// One visible notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub id: Uuid,
    pub message: String,
    pub raised_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Notifications in raise order
#[derive(Debug)]
pub struct NotificationQueue {
    entries: VecDeque<Notification>,
    ttl: Duration,
}

impl NotificationQueue {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: VecDeque::new(),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Add a notification raised now
    pub fn push(&mut self, message: impl Into<String>) -> Notification {
        let raised_at = Utc::now();
        let ttl = chrono::Duration::from_std(self.ttl).unwrap_or_else(|_| chrono::Duration::seconds(3));
        let notification = Notification {
            id: Uuid::new_v4(),
            message: message.into(),
            raised_at,
            expires_at: raised_at + ttl,
        };
        self.entries.push_back(notification.clone());
        notification
    }

    /// Remove one notification by id
    pub fn remove(&mut self, id: Uuid) -> bool {
        let before = self.entries.len();
        self.entries.retain(|n| n.id != id);
        self.entries.len() != before
    }

    /// Visible notifications, oldest first
    pub fn active(&self) -> Vec<Notification> {
        self.entries.iter().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Shared notification handle used by the services
///
/// Raising a notification schedules its own expiry task and broadcasts
/// `NotificationRaised` / `NotificationExpired`.
#[derive(Clone)]
pub struct NotificationCenter {
    queue: Arc<Mutex<NotificationQueue>>,
    event_bus: EventBus,
}

impl NotificationCenter {
    pub fn new(ttl: Duration, event_bus: EventBus) -> Self {
        Self {
            queue: Arc::new(Mutex::new(NotificationQueue::new(ttl))),
            event_bus,
        }
    }

    fn lock(&self) -> MutexGuard<'_, NotificationQueue> {
        self.queue.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Raise a notification; it disappears after the configured TTL
    pub fn notify(&self, message: impl Into<String>) -> Uuid {
        let (notification, ttl) = {
            let mut queue = self.lock();
            let notification = queue.push(message);
            (notification, queue.ttl())
        };
        let id = notification.id;

        tracing::info!(notification_id = %id, message = %notification.message, "Notification raised");
        self.event_bus.emit_lossy(RollcallEvent::NotificationRaised {
            notification_id: id,
            message: notification.message,
            expires_at: notification.expires_at,
        });

        let center = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            if center.lock().remove(id) {
                center
                    .event_bus
                    .emit_lossy(RollcallEvent::NotificationExpired { notification_id: id });
            }
        });

        id
    }

    pub fn active(&self) -> Vec<Notification> {
        self.lock().active()
    }

    /// Drop every visible notification (pending expiry tasks become no-ops)
    pub fn clear(&self) {
        self.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remove_by_id_only_removes_target() {
        let mut queue = NotificationQueue::new(DEFAULT_TTL);
        let a = queue.push("a");
        let b = queue.push("b");

        assert!(queue.remove(a.id));
        assert!(!queue.remove(a.id));
        assert_eq!(queue.active(), vec![b]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_center_expires_independently() {
        let bus = EventBus::new(16);
        let center = NotificationCenter::new(Duration::from_secs(3), bus);

        center.notify("first");
        tokio::time::sleep(Duration::from_secs(2)).await;
        center.notify("second");
        assert_eq!(center.active().len(), 2);

        // t = 3.5s: first expired, second (raised at 2s) still visible
        tokio::time::sleep(Duration::from_millis(1500)).await;
        let active = center.active();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].message, "second");

        // t = 5.5s: both gone
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(center.active().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_center_emits_raised_and_expired() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();
        let center = NotificationCenter::new(Duration::from_secs(3), bus);

        let id = center.notify("hello");

        match rx.recv().await.unwrap() {
            RollcallEvent::NotificationRaised { notification_id, message, .. } => {
                assert_eq!(notification_id, id);
                assert_eq!(message, "hello");
            }
            other => panic!("unexpected event: {:?}", other),
        }

        tokio::time::sleep(Duration::from_secs(4)).await;
        match rx.recv().await.unwrap() {
            RollcallEvent::NotificationExpired { notification_id } => assert_eq!(notification_id, id),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_suppresses_expiry_events() {
        let bus = EventBus::new(16);
        let center = NotificationCenter::new(Duration::from_secs(3), bus.clone());
        center.notify("stale");
        center.clear();

        let mut rx = bus.subscribe();
        tokio::time::sleep(Duration::from_secs(4)).await;
        assert!(rx.try_recv().is_err());
    }
}
