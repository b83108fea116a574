//! # foldersync
//!
//! Per-account, sequential folder synchronization scheduler.
//!
//! Requests are keyed by `(owner, remote path)`, deduplicated while pending,
//! executed one at a time in FIFO order by a single worker, and can be
//! canceled while queued or, cooperatively, while running (including by
//! canceling an ancestor folder). Outcomes are reported to listeners.

pub mod access;
pub mod config;
pub mod error;
pub mod event;
pub mod index;
pub mod listener;
pub mod model;
pub mod path;
pub mod scheduler;
pub mod telemetry;
pub mod work;

pub use scheduler::{CancelOutcome, EnqueueResult, SyncScheduler, SyncWorker};
