//! Failure aggregation for one sync run
//!
//! Workers record failures here instead of aborting the run. Records are
//! kept in the order they were recorded and never dropped.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::operation::Operation;

/// Why an operation failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Transient remote failure that persisted through every attempt
    RetriesExhausted,
    /// Remote store rejected the request
    Remote,
    /// Local filesystem error
    Local,
    /// The operation panicked
    Internal,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureKind::RetriesExhausted => "retries exhausted",
            FailureKind::Remote => "remote",
            FailureKind::Local => "local",
            FailureKind::Internal => "internal",
        };
        f.write_str(name)
    }
}

/// One failed operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncFailure {
    pub operation: Operation,
    pub kind: FailureKind,
    pub message: String,
}

impl SyncFailure {
    pub fn new(operation: Operation, kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            operation,
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for SyncFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}: {}",
            self.operation.kind, self.operation.path, self.message
        )
    }
}

/// Shared, append-only collection of failures
#[derive(Clone, Default)]
pub struct ErrorSink {
    records: Arc<Mutex<Vec<SyncFailure>>>,
    any: Arc<AtomicBool>,
}

impl ErrorSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a failure
    pub fn record(&self, failure: SyncFailure) {
        self.lock().push(failure);
        self.any.store(true, Ordering::Release);
    }

    /// Whether any failure was recorded; once true, stays true
    pub fn has_any_error(&self) -> bool {
        self.any.load(Ordering::Acquire)
    }

    /// Failure descriptions for display, in record order
    pub fn error_messages(&self) -> Vec<String> {
        self.lock().iter().map(ToString::to_string).collect()
    }

    /// Snapshot of all recorded failures
    pub fn failures(&self) -> Vec<SyncFailure> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, Vec<SyncFailure>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
