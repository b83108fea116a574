//! Sync execution span helpers.
//!
//! Provides span creation and state-transition recording for synchronizations
//! flowing through the worker.

use tracing::Span;

use crate::model::{RequestId, SyncKey, SyncState};

/// Start a span for one execution attempt.
///
/// The `sync.state` field is declared empty and is filled by
/// [`record_state_transition`].
pub fn start_sync_span(key: &SyncKey, request_id: RequestId) -> Span {
    tracing::info_span!(
        "sync.execute",
        "sync.owner" = %key.owner,
        "sync.path" = %key.path,
        "sync.request_id" = %request_id.0,
        "sync.state" = tracing::field::Empty,
    )
}

/// Record a state transition on the given span.
///
/// Emits a tracing `info` event scoped to the span and updates `sync.state`.
pub fn record_state_transition(span: &Span, from: SyncState, to: SyncState) {
    span.record("sync.state", tracing::field::display(to));
    span.in_scope(|| {
        tracing::info!(from = %from, to = %to, "state_transition");
    });
}
