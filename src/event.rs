//! Structured events for scheduler notifications.
//!
//! [`EventBus`] is a [`SyncListener`] that turns every notification into a
//! serializable [`Event`] and broadcasts it. Consumers subscribe to build
//! progress views, audit logs, or to wait on a synchronization in tests.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::error::SyncError;
use crate::listener::SyncListener;
use crate::model::{SyncKey, SyncOutcome};
use crate::work::SyncWork;

/// Default number of events buffered per subscriber.
pub const DEFAULT_CAPACITY: usize = 256;

/// A structured event emitted for a notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Monotonic sequence number. Consumers can detect gaps.
    pub seq: u64,
    /// When this event occurred.
    pub timestamp: DateTime<Utc>,
    /// What happened.
    pub kind: EventKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    SyncQueued {
        owner: String,
        path: String,
    },
    SyncFinished {
        owner: String,
        path: String,
        success: bool,
    },
    SyncResult {
        owner: String,
        path: String,
        target_path: String,
        success: bool,
        error: Option<SyncError>,
        duration_ms: u64,
    },
}

impl EventKind {
    /// Key the event refers to.
    pub fn key(&self) -> SyncKey {
        let (owner, path) = match self {
            EventKind::SyncQueued { owner, path }
            | EventKind::SyncFinished { owner, path, .. }
            | EventKind::SyncResult { owner, path, .. } => (owner, path),
        };
        SyncKey {
            owner: owner.clone(),
            path: path.clone(),
        }
    }
}

/// Broadcasting listener.
pub struct EventBus {
    seq: AtomicU64,
    sender: broadcast::Sender<Event>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            seq: AtomicU64::new(0),
            sender,
        }
    }

    /// Receive every event published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    /// Sequence number of the last event published (0 if none).
    pub fn last_seq(&self) -> u64 {
        self.seq.load(Ordering::SeqCst)
    }

    fn publish(&self, kind: EventKind) {
        let event = Event {
            seq: self.seq.fetch_add(1, Ordering::SeqCst) + 1,
            timestamp: Utc::now(),
            kind,
        };
        // No subscribers is fine.
        let _ = self.sender.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl SyncListener for EventBus {
    fn on_sync_queued(&self, key: &SyncKey) {
        self.publish(EventKind::SyncQueued {
            owner: key.owner.clone(),
            path: key.path.clone(),
        });
    }

    fn on_sync_finished(&self, key: &SyncKey, success: bool) {
        self.publish(EventKind::SyncFinished {
            owner: key.owner.clone(),
            path: key.path.clone(),
            success,
        });
    }

    fn on_result(&self, key: &SyncKey, work: &dyn SyncWork, outcome: &SyncOutcome) {
        self.publish(EventKind::SyncResult {
            owner: key.owner.clone(),
            path: key.path.clone(),
            target_path: work.target_path().to_string(),
            success: outcome.success,
            error: outcome.error.clone(),
            duration_ms: outcome.duration_ms,
        });
    }
}
