//! Outbound notifications.
//!
//! Listeners run on the worker (finished/result) or on the enqueueing thread
//! (queued), always after the index lock has been released. A panicking
//! listener is logged and skipped so it cannot take the worker down.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, RwLock};

use tracing::error;

use crate::model::{SyncKey, SyncOutcome};
use crate::work::SyncWork;

/// Receives scheduler notifications. Every method defaults to a no-op.
pub trait SyncListener: Send + Sync {
    /// A new synchronization was accepted for `key`.
    fn on_sync_queued(&self, _key: &SyncKey) {}

    /// An execution attempt for `key` finished. Not called for work that was
    /// canceled before it started.
    fn on_sync_finished(&self, _key: &SyncKey, _success: bool) {}

    /// Full outcome of an execution attempt, success or failure.
    fn on_result(&self, _key: &SyncKey, _work: &dyn SyncWork, _outcome: &SyncOutcome) {}
}

/// Registered listeners, notified in registration order.
#[derive(Default)]
pub struct Listeners {
    listeners: RwLock<Vec<Arc<dyn SyncListener>>>,
}

impl Listeners {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, listener: Arc<dyn SyncListener>) {
        self.listeners
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(listener);
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    pub fn sync_queued(&self, key: &SyncKey) {
        self.each("on_sync_queued", |l| l.on_sync_queued(key));
    }

    pub fn sync_finished(&self, key: &SyncKey, success: bool) {
        self.each("on_sync_finished", |l| l.on_sync_finished(key, success));
    }

    pub fn result(&self, key: &SyncKey, work: &dyn SyncWork, outcome: &SyncOutcome) {
        self.each("on_result", |l| l.on_result(key, work, outcome));
    }

    fn snapshot(&self) -> Vec<Arc<dyn SyncListener>> {
        self.listeners
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn each(&self, callback: &str, f: impl Fn(&dyn SyncListener)) {
        // Snapshot so a listener may register another listener without
        // deadlocking on the registry lock.
        for listener in self.snapshot() {
            if catch_unwind(AssertUnwindSafe(|| f(listener.as_ref()))).is_err() {
                error!(callback, "sync listener panicked");
            }
        }
    }
}
