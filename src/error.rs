//! Error types for foldersync.
//!
//! [`Error`] is returned by the scheduler's own API. [`SyncError`] is the
//! failure carried inside a [`SyncOutcome`](crate::model::SyncOutcome): it
//! never escapes the worker loop as an `Err`, it is reported to listeners.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("sync worker has stopped")]
    SchedulerStopped,

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Why a single synchronization did not succeed.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "type", content = "detail", rename_all = "snake_case")]
pub enum SyncError {
    /// Credentials or session for the owner could not be obtained.
    #[error("access resolution failed: {0}")]
    AccessResolution(String),

    /// The work item reported a failure of its own.
    #[error("execution failed: {0}")]
    Execution(String),

    #[error("io failure ({kind}): {message}")]
    Io { kind: String, message: String },

    /// Cooperative cancellation was observed.
    #[error("synchronization canceled")]
    Canceled,
}

impl SyncError {
    pub fn is_canceled(&self) -> bool {
        matches!(self, SyncError::Canceled)
    }
}

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::Io {
            kind: err.kind().to_string(),
            message: err.to_string(),
        }
    }
}
