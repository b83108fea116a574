//! Metric instrument factories for foldersync.
//!
//! Uses the OTel Meter API with the globally-registered `MeterProvider`.
//! All instruments are created lazily from the `"foldersync"` meter.

use opentelemetry::metrics::{Counter, Histogram, Meter};

/// Returns the shared meter for foldersync instruments.
fn meter() -> Meter {
    opentelemetry::global::meter("foldersync")
}

/// Counter: enqueue calls.
/// Labels: `result` ("queued" | "duplicate" | "stopped").
pub fn sync_enqueued() -> Counter<u64> {
    meter()
        .u64_counter("foldersync.sync.enqueued")
        .with_description("Number of synchronization enqueue requests")
        .build()
}

/// Counter: finished execution attempts.
/// Labels: `result` ("success" | "failure" | "canceled").
pub fn sync_finished() -> Counter<u64> {
    meter()
        .u64_counter("foldersync.sync.finished")
        .with_description("Number of finished synchronization attempts")
        .build()
}

/// Counter: cancel calls.
/// Labels: `target` ("pending" | "executing" | "none").
pub fn sync_canceled() -> Counter<u64> {
    meter()
        .u64_counter("foldersync.sync.canceled")
        .with_description("Number of synchronization cancel requests")
        .build()
}

/// Histogram: execution duration in milliseconds, access resolution included.
pub fn sync_duration_ms() -> Histogram<f64> {
    meter()
        .f64_histogram("foldersync.sync.duration_ms")
        .with_description("Synchronization duration in milliseconds")
        .with_unit("ms")
        .build()
}
