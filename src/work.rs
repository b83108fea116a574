//! The unit of work the scheduler runs.
//!
//! What a synchronization actually does (listing the remote folder, diffing,
//! transferring files) is up to the implementor. The scheduler only needs to
//! run it, ask it to stop, and know which folder it targets.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::access::AccessContext;
use crate::error::SyncError;

/// A folder synchronization that can be executed once.
///
/// `execute` runs on a blocking thread and may block on I/O. Cancellation is
/// cooperative: `cancel` only sets a flag, and `execute` is expected to check
/// it at its own safe points and return [`SyncError::Canceled`].
pub trait SyncWork: Send + Sync {
    /// Run the synchronization with freshly resolved access.
    fn execute(&self, access: &AccessContext) -> Result<(), SyncError>;

    /// Ask a pending or running synchronization to stop.
    fn cancel(&self);

    /// Remote folder this work synchronizes.
    fn target_path(&self) -> &str;
}

/// Shared cancellation flag for [`SyncWork`] implementations.
///
/// Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    canceled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.canceled.store(true, Ordering::SeqCst);
    }

    pub fn is_canceled(&self) -> bool {
        self.canceled.load(Ordering::SeqCst)
    }

    /// Checkpoint for cooperative loops: `token.check()?;`
    pub fn check(&self) -> Result<(), SyncError> {
        if self.is_canceled() {
            Err(SyncError::Canceled)
        } else {
            Ok(())
        }
    }
}
