//! Syncer error handling
//!
//! Errors returned directly by Syncer calls. Failures of individual
//! operations never surface here; they go to the [`ErrorSink`](crate::ErrorSink).

use std::fmt;

use thiserror::Error;

use crate::local::LocalError;
use crate::queue::QueueClosed;
use crate::store::StoreError;

/// Lifecycle state of a Syncer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncerState {
    /// Constructed, workers not running
    Created,
    /// Workers running, accepting operations
    Started,
    /// Draining queued work
    ShuttingDown,
    /// Terminal; construct a new Syncer for another run
    Shutdown,
}

impl fmt::Display for SyncerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SyncerState::Created => "not started",
            SyncerState::Started => "running",
            SyncerState::ShuttingDown => "shutting down",
            SyncerState::Shutdown => "shut down",
        };
        f.write_str(name)
    }
}

/// Errors returned by Syncer calls
#[derive(Error, Debug)]
pub enum SyncError {
    /// Call made in the wrong lifecycle state
    #[error("Cannot {action}: syncer is {state}")]
    Lifecycle {
        action: &'static str,
        state: SyncerState,
    },

    /// Remote asset listing failed; nothing was queued
    #[error("Failed to list remote assets: {0}")]
    RemoteListing(#[source] StoreError),

    /// Local directory walk failed; nothing was queued
    #[error("Failed to list local assets: {0}")]
    LocalListing(#[source] LocalError),

    /// The queue refused an operation
    #[error(transparent)]
    QueueClosed(#[from] QueueClosed),
}

impl SyncError {
    /// Whether this is a programming error in call ordering
    pub fn is_lifecycle(&self) -> bool {
        matches!(self, SyncError::Lifecycle { .. })
    }
}

/// Result type for Syncer calls
pub type SyncResult<T> = Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_display() {
        let err = SyncError::Lifecycle {
            action: "download theme",
            state: SyncerState::Created,
        };
        assert_eq!(err.to_string(), "Cannot download theme: syncer is not started");
        assert!(err.is_lifecycle());
    }

    #[test]
    fn test_listing_display() {
        let err = SyncError::RemoteListing(StoreError::Unauthorized { status: 401 });
        assert!(err.to_string().starts_with("Failed to list remote assets"));
        assert!(!err.is_lifecycle());
    }
}
