//! Sync events and the IO guard
//!
//! Workers report progress and failures as [`SyncEvent`]s on an unbounded
//! channel the caller takes from the Syncer. While an [`IoGuard`] is held,
//! events are buffered instead of delivered, so the command layer can
//! prompt or render without sync output interleaving. Dropping the last
//! guard flushes the buffer in order.
//!
//! Guards nest: the buffer is flushed only when every guard is gone.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::mpsc;

use crate::error_sink::SyncFailure;
use crate::operation::Operation;

/// What a completed operation did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationOutcome {
    /// Local file written with new content
    Downloaded,
    /// Local file already matched the remote content
    Unchanged,
    Uploaded,
    Deleted,
    /// Delete target was already gone
    AlreadyAbsent,
}

/// Events emitted while a sync runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// Operation finished successfully
    Completed {
        operation: Operation,
        outcome: OperationOutcome,
    },
    /// Operation hit a transient failure and will be retried
    Retrying {
        operation: Operation,
        delay: Duration,
        message: String,
    },
    /// Operation failed for good; also recorded in the error sink
    Failed(SyncFailure),
}

#[derive(Default)]
struct ReporterState {
    locks: usize,
    buffered: Vec<SyncEvent>,
}

/// Delivers events, holding them back while IO is locked
pub(crate) struct Reporter {
    tx: mpsc::UnboundedSender<SyncEvent>,
    state: Mutex<ReporterState>,
}

impl Reporter {
    pub(crate) fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<SyncEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let reporter = Arc::new(Self {
            tx,
            state: Mutex::new(ReporterState::default()),
        });
        (reporter, rx)
    }

    pub(crate) fn emit(&self, event: SyncEvent) {
        let mut state = self.lock();
        if state.locks > 0 {
            state.buffered.push(event);
        } else {
            let _ = self.tx.send(event);
        }
    }

    pub(crate) fn lock_io(self: &Arc<Self>) -> IoGuard {
        self.lock().locks += 1;
        IoGuard {
            reporter: Arc::clone(self),
        }
    }

    #[cfg(test)]
    pub(crate) fn is_locked(&self) -> bool {
        self.lock().locks > 0
    }

    fn unlock(&self) {
        let mut state = self.lock();
        state.locks = state.locks.saturating_sub(1);
        if state.locks == 0 {
            for event in state.buffered.drain(..) {
                let _ = self.tx.send(event);
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, ReporterState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Scoped IO lock; released on drop, on every exit path
#[must_use = "IO is unlocked as soon as the guard is dropped"]
pub struct IoGuard {
    reporter: Arc<Reporter>,
}

impl Drop for IoGuard {
    fn drop(&mut self) {
        self.reporter.unlock();
    }
}
