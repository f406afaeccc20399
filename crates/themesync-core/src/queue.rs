//! Operation queue
//!
//! Unbounded FIFO of [`Operation`]s shared by the worker pool. A worker
//! claims an operation by dequeuing it; the operation's path stays marked
//! in flight until the [`ClaimedOperation`] is dropped, and no other
//! operation on that path is handed out meanwhile. Because the queue is
//! scanned from the front, the earliest pending operation for a path is
//! always the one claimed, so same-path operations keep submission order.

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use tokio::sync::Notify;

use crate::operation::Operation;

/// Returned by [`OperationQueue::enqueue`] after the queue was closed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("operation queue is closed")]
pub struct QueueClosed(pub Operation);

#[derive(Default)]
struct State {
    pending: VecDeque<Operation>,
    in_flight: HashSet<String>,
    closed: bool,
}

#[derive(Default)]
struct Inner {
    state: Mutex<State>,
    notify: Notify,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Thread-safe work queue with per-path in-flight tracking
#[derive(Clone, Default)]
pub struct OperationQueue {
    inner: Arc<Inner>,
}

impl OperationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an operation; never blocks
    pub fn enqueue(&self, operation: Operation) -> Result<(), QueueClosed> {
        {
            let mut state = self.inner.lock();
            if state.closed {
                return Err(QueueClosed(operation));
            }
            state.pending.push_back(operation);
        }
        self.inner.notify.notify_waiters();
        Ok(())
    }

    /// Wait for the next operation whose path is not in flight
    ///
    /// Returns `None` once the queue is closed and nothing is pending.
    pub async fn dequeue(&self) -> Option<ClaimedOperation> {
        loop {
            // Registered before checking state so no wakeup is missed
            let notified = self.inner.notify.notified();

            {
                let mut state = self.inner.lock();
                let State {
                    pending, in_flight, ..
                } = &mut *state;

                if let Some(index) = pending.iter().position(|op| !in_flight.contains(&op.path)) {
                    if let Some(operation) = pending.remove(index) {
                        in_flight.insert(operation.path.clone());
                        return Some(ClaimedOperation {
                            operation,
                            queue: self.inner.clone(),
                        });
                    }
                }

                if state.closed && state.pending.is_empty() {
                    return None;
                }
            }

            notified.await;
        }
    }

    /// Refuse further enqueues and wake every waiting consumer
    ///
    /// Already queued operations are still handed out. Idempotent.
    pub fn close(&self) {
        self.inner.lock().closed = true;
        self.inner.notify.notify_waiters();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    /// Number of operations waiting to be claimed
    pub fn len(&self) -> usize {
        self.inner.lock().pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of paths currently claimed by workers
    pub fn in_flight(&self) -> usize {
        self.inner.lock().in_flight.len()
    }
}

/// An operation handed to a worker
///
/// The path is released for other operations when this is dropped.
pub struct ClaimedOperation {
    operation: Operation,
    queue: Arc<Inner>,
}

impl ClaimedOperation {
    pub fn operation(&self) -> &Operation {
        &self.operation
    }

    pub fn operation_mut(&mut self) -> &mut Operation {
        &mut self.operation
    }
}

impl Drop for ClaimedOperation {
    fn drop(&mut self) {
        self.queue.lock().in_flight.remove(&self.operation.path);
        self.queue.notify.notify_waiters();
    }
}
