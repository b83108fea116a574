//! Sequential folder synchronization scheduler.
//!
//! [`SyncScheduler`] is the handle hosts use to request, cancel and query
//! synchronizations. [`SyncWorker`] is the single consumer: it pulls execution
//! requests in FIFO order and runs them one at a time. Requests carry no
//! payload; the work lives in the [`PendingIndex`] until the worker is done
//! with it.

use std::sync::Arc;
use std::time::Instant;

use opentelemetry::KeyValue;
use tokio::sync::{Notify, mpsc};
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, error, info, warn};

use crate::access::AccessProvider;
use crate::error::{Error, Result, SyncError};
use crate::index::{CancelTarget, PendingIndex};
use crate::listener::{Listeners, SyncListener};
use crate::model::{RequestId, SyncKey, SyncOutcome, SyncState};
use crate::telemetry::metrics;
use crate::telemetry::sync::{record_state_transition, start_sync_span};
use crate::work::SyncWork;

/// What happened when a synchronization was enqueued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueResult {
    /// Accepted and queued behind earlier requests.
    Queued(RequestId),
    /// The key was already pending or executing; the request was collapsed
    /// into the existing one.
    AlreadyPending,
}

/// What a cancel request hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    /// The exact key was still queued. It was removed and will not run.
    Pending,
    /// The running synchronization (the key itself or a descendant) was
    /// signaled to stop.
    Executing,
    /// Nothing pending or running matched.
    NotFound,
}

/// A queued reference to an index entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionRequest {
    pub id: RequestId,
    pub key: SyncKey,
}

/// Index payload: the work plus the request that queued it.
#[derive(Clone)]
struct PendingSync {
    request_id: RequestId,
    work: Arc<dyn SyncWork>,
}

struct Shared {
    index: PendingIndex<PendingSync>,
    listeners: Listeners,
    shutdown: Notify,
}

/// Handle for requesting and canceling synchronizations.
///
/// Cheap to clone; every clone feeds the same worker.
#[derive(Clone)]
pub struct SyncScheduler {
    shared: Arc<Shared>,
    requests: mpsc::UnboundedSender<ExecutionRequest>,
}

impl SyncScheduler {
    /// Create a scheduler and the worker that will consume its requests.
    ///
    /// Nothing executes until [`SyncWorker::run`] is driven.
    pub fn new(provider: Arc<dyn AccessProvider>) -> (Self, SyncWorker) {
        let shared = Arc::new(Shared {
            index: PendingIndex::new(),
            listeners: Listeners::new(),
            shutdown: Notify::new(),
        });
        let (tx, rx) = mpsc::unbounded_channel();
        let scheduler = Self {
            shared: Arc::clone(&shared),
            requests: tx,
        };
        let worker = SyncWorker {
            shared,
            requests: rx,
            provider,
        };
        (scheduler, worker)
    }

    /// Create a scheduler and spawn its worker on the current tokio runtime.
    pub fn start(provider: Arc<dyn AccessProvider>) -> (Self, JoinHandle<()>) {
        let (scheduler, worker) = Self::new(provider);
        let handle = tokio::spawn(worker.run());
        (scheduler, handle)
    }

    /// Register a listener for queued/finished/result notifications.
    pub fn add_listener(&self, listener: Arc<dyn SyncListener>) {
        self.shared.listeners.add(listener);
    }

    /// Request a synchronization of `path` for `owner`.
    ///
    /// Fire-and-forget: the outcome is reported to listeners. A request for a
    /// key that is already pending or executing is collapsed into it and
    /// emits no notification.
    pub fn enqueue(
        &self,
        owner: &str,
        path: &str,
        work: Arc<dyn SyncWork>,
    ) -> Result<EnqueueResult> {
        let key = SyncKey::new(owner, path);
        let request_id = RequestId::new();

        let inserted = self.shared.index.put_if_absent(
            &key.owner,
            &key.path,
            PendingSync { request_id, work },
        );
        if !inserted {
            debug!(%key, "sync already pending, collapsing request");
            metrics::sync_enqueued().add(1, &[KeyValue::new("result", "duplicate")]);
            return Ok(EnqueueResult::AlreadyPending);
        }

        if self.requests.is_closed() {
            return Err(self.rollback(&key, request_id));
        }

        // Notify before posting so listeners never see the finish first.
        self.shared.listeners.sync_queued(&key);

        let request = ExecutionRequest {
            id: request_id,
            key: key.clone(),
        };
        if self.requests.send(request).is_err() {
            // The worker stopped after the queued notification went out;
            // close it out so listeners are not left waiting for a finish.
            let err = self.rollback(&key, request_id);
            self.shared.listeners.sync_finished(&key, false);
            return Err(err);
        }

        info!(%key, request_id = %request_id, "sync queued");
        metrics::sync_enqueued().add(1, &[KeyValue::new("result", "queued")]);
        Ok(EnqueueResult::Queued(request_id))
    }

    /// Cancel the synchronization of `path`, or whatever is running under it.
    ///
    /// A queued request for the exact key is dropped without ever executing.
    /// If the running synchronization is `path` or nested under it, its
    /// cooperative cancellation flag is set; it still finishes (with a
    /// canceled outcome) and is reported as usual.
    pub fn cancel(&self, owner: &str, path: &str) -> CancelOutcome {
        let key = SyncKey::new(owner, path);

        let outcome = match self.shared.index.take_for_cancel(&key.owner, &key.path) {
            Some(CancelTarget::Pending(pending)) => {
                pending.work.cancel();
                info!(%key, request_id = %pending.request_id, "pending sync canceled");
                CancelOutcome::Pending
            }
            Some(CancelTarget::Executing(pending)) => {
                pending.work.cancel();
                info!(
                    %key,
                    running = pending.work.target_path(),
                    request_id = %pending.request_id,
                    "running sync signaled to cancel"
                );
                CancelOutcome::Executing
            }
            None => {
                debug!(%key, "nothing to cancel");
                CancelOutcome::NotFound
            }
        };

        let target = match outcome {
            CancelOutcome::Pending => "pending",
            CancelOutcome::Executing => "executing",
            CancelOutcome::NotFound => "none",
        };
        metrics::sync_canceled().add(1, &[KeyValue::new("target", target)]);
        outcome
    }

    /// Is `path`, or any folder below it, pending or executing for `owner`?
    pub fn is_synchronizing(&self, owner: &str, path: &str) -> bool {
        if owner.is_empty() {
            return false;
        }
        self.shared.index.contains(owner, path)
    }

    /// Lifecycle state of an exact key.
    pub fn state(&self, owner: &str, path: &str) -> SyncState {
        self.shared.index.state(owner, path)
    }

    /// Key currently executing on the worker.
    pub fn current(&self) -> Option<SyncKey> {
        self.shared.index.current()
    }

    /// Number of synchronizations pending or executing.
    pub fn pending_count(&self) -> usize {
        self.shared.index.len()
    }

    /// Ask the worker to stop after the synchronization it is running.
    /// Still-queued synchronizations are canceled and discarded.
    pub fn shutdown(&self) {
        self.shared.shutdown.notify_one();
    }

    fn rollback(&self, key: &SyncKey, request_id: RequestId) -> Error {
        self.shared
            .index
            .remove_if(&key.owner, &key.path, |p| p.request_id == request_id);
        warn!(%key, "sync worker has stopped, request rejected");
        metrics::sync_enqueued().add(1, &[KeyValue::new("result", "stopped")]);
        Error::SchedulerStopped
    }
}

/// The single sequential consumer of a [`SyncScheduler`]'s requests.
pub struct SyncWorker {
    shared: Arc<Shared>,
    requests: mpsc::UnboundedReceiver<ExecutionRequest>,
    provider: Arc<dyn AccessProvider>,
}

impl SyncWorker {
    /// Process requests in arrival order until shutdown is signaled or every
    /// [`SyncScheduler`] handle is dropped.
    pub async fn run(mut self) {
        info!("sync worker started");

        loop {
            let request = tokio::select! {
                biased;
                _ = self.shared.shutdown.notified() => {
                    info!("sync worker shutting down");
                    break;
                }
                request = self.requests.recv() => match request {
                    Some(request) => request,
                    None => {
                        info!("all scheduler handles dropped, sync worker stopping");
                        break;
                    }
                },
            };

            self.process(request).await;
        }

        // Reject new requests first, then discard what is left.
        self.requests.close();
        self.discard_pending();
    }

    /// Execute one request, if its work is still pending.
    async fn process(&self, request: ExecutionRequest) {
        let ExecutionRequest { id, key } = request;

        let Some(pending) = self
            .shared
            .index
            .begin_execution(&key.owner, &key.path, |p| p.request_id == id)
        else {
            debug!(%key, request_id = %id, "sync no longer pending, skipping");
            return;
        };

        let span = start_sync_span(&key, id);
        record_state_transition(&span, SyncState::Pending, SyncState::Executing);

        async {
            let guard = ExecutionGuard {
                index: &self.shared.index,
                key: &key,
            };
            let outcome = self.execute(&key, &pending.work).await;

            // The entry must be gone before anyone hears about the finish.
            drop(guard);
            record_state_transition(&span, SyncState::Executing, SyncState::Absent);

            let result = match &outcome.error {
                None => {
                    info!(duration_ms = outcome.duration_ms, "sync completed");
                    "success"
                }
                Some(SyncError::Canceled) => {
                    info!(duration_ms = outcome.duration_ms, "sync canceled");
                    "canceled"
                }
                Some(e @ SyncError::AccessResolution(_)) => {
                    error!(error = %e, "error while trying to get authorization");
                    "failure"
                }
                Some(e) => {
                    warn!(error = %e, duration_ms = outcome.duration_ms, "sync failed");
                    "failure"
                }
            };
            metrics::sync_finished().add(1, &[KeyValue::new("result", result)]);
            metrics::sync_duration_ms().record(outcome.duration_ms as f64, &[]);

            self.shared.listeners.sync_finished(&key, outcome.success);
            self.shared
                .listeners
                .result(&key, pending.work.as_ref(), &outcome);
        }
        .instrument(span.clone())
        .await
    }

    /// Resolve access and run the work on a blocking thread.
    async fn execute(&self, key: &SyncKey, work: &Arc<dyn SyncWork>) -> SyncOutcome {
        let provider = Arc::clone(&self.provider);
        let work = Arc::clone(work);
        let owner = key.owner.clone();
        let start = Instant::now();

        let joined = tokio::task::spawn_blocking(move || {
            // Resolved per attempt: credentials may have been refreshed while
            // the request was queued.
            let access = provider.resolve(&owner)?;
            work.execute(&access)
        })
        .await;

        let duration_ms = start.elapsed().as_millis() as u64;
        match joined {
            Ok(result) => SyncOutcome::from_result(result, duration_ms),
            Err(e) => SyncOutcome::failed(
                SyncError::Execution(format!("sync work did not complete: {e}")),
                duration_ms,
            ),
        }
    }

    fn discard_pending(&self) {
        for (key, pending) in self.shared.index.drain_pending() {
            pending.work.cancel();
            debug!(%key, request_id = %pending.request_id, "discarded pending sync on shutdown");
        }
    }
}

/// Removes the executing entry from the index however execution ends.
struct ExecutionGuard<'a> {
    index: &'a PendingIndex<PendingSync>,
    key: &'a SyncKey,
}

impl Drop for ExecutionGuard<'_> {
    fn drop(&mut self) {
        self.index.finish_execution(&self.key.owner, &self.key.path);
    }
}
