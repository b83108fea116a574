//! Core data model.
//!
//! A synchronization is identified by its owner (account) and the remote
//! folder path being synchronized. The payload itself lives in the pending
//! index; everything here is small, cloneable and serializable.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::SyncError;
use crate::path;

// ---------------------------------------------------------------------------
// Key
// ---------------------------------------------------------------------------

/// Identity of a folder synchronization: `(owner, path)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SyncKey {
    /// Account / namespace the folder belongs to.
    pub owner: String,
    /// Normalized remote folder path.
    pub path: String,
}

impl SyncKey {
    /// Build a key, normalizing the path.
    pub fn new(owner: impl Into<String>, path: &str) -> Self {
        Self {
            owner: owner.into(),
            path: path::normalize(path),
        }
    }

    /// Does this key sit at or below `ancestor` within the same owner?
    pub fn is_under(&self, owner: &str, ancestor: &str) -> bool {
        self.owner == owner && path::is_same_or_descendant(&self.path, ancestor)
    }
}

impl std::fmt::Display for SyncKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.owner, self.path)
    }
}

// ---------------------------------------------------------------------------
// Request id
// ---------------------------------------------------------------------------

/// Identifies one accepted enqueue and the execution request it posted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Short display: first 8 chars of UUID
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Where a key currently is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    /// Nothing pending or executing.
    Absent,
    /// Enqueued, waiting for the worker.
    Pending,
    /// Running on the worker right now.
    Executing,
}

impl std::fmt::Display for SyncState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SyncState::Absent => "absent",
            SyncState::Pending => "pending",
            SyncState::Executing => "executing",
        };
        write!(f, "{s}")
    }
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// Result of one execution attempt, handed to result listeners.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncOutcome {
    pub success: bool,
    /// Failure cause, `None` on success.
    pub error: Option<SyncError>,
    /// Time spent resolving access and executing.
    pub duration_ms: u64,
}

impl SyncOutcome {
    pub fn succeeded(duration_ms: u64) -> Self {
        Self {
            success: true,
            error: None,
            duration_ms,
        }
    }

    pub fn failed(error: SyncError, duration_ms: u64) -> Self {
        Self {
            success: false,
            error: Some(error),
            duration_ms,
        }
    }

    pub fn from_result(result: std::result::Result<(), SyncError>, duration_ms: u64) -> Self {
        match result {
            Ok(()) => Self::succeeded(duration_ms),
            Err(e) => Self::failed(e, duration_ms),
        }
    }

    /// Did this attempt end because of cooperative cancellation?
    pub fn was_canceled(&self) -> bool {
        self.error.as_ref().is_some_and(SyncError::is_canceled)
    }
}
