//! Worker pool internals
//!
//! Each worker loops: claim an operation, run it against the store and the
//! local theme, report the outcome. Transient remote failures are retried
//! in place while the path stays claimed; everything else is recorded in
//! the error sink right away.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::error_sink::{ErrorSink, FailureKind, SyncFailure};
use crate::io_guard::{OperationOutcome, Reporter, SyncEvent};
use crate::local::{DeleteOutcome, LocalError, LocalTheme, WriteOutcome};
use crate::models::{AssetContent, Theme};
use crate::operation::{Operation, OperationKind};
use crate::queue::OperationQueue;
use crate::store::{StoreError, ThemeStore};

/// Upper bound on the worker pool size
///
/// Keeps a single invocation within the platform's per-shop request budget.
pub const MAX_WORKERS: usize = 8;

/// Default pool size: available parallelism, clamped to `1..=MAX_WORKERS`
pub fn default_worker_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .clamp(1, MAX_WORKERS)
}

/// Retry and backoff for transient remote failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per operation, including the first
    pub max_attempts: u32,
    /// Delay before the first retry; doubles on each further retry
    pub base_delay: Duration,
    /// Cap on any single delay, including server-requested ones
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    /// Run every operation exactly once
    pub fn no_retries() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay after failed attempt number `attempt` (1-based)
    ///
    /// A delay requested by the server replaces the exponential one.
    pub fn delay_for(&self, attempt: u32, requested: Option<Duration>) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let backoff = self.base_delay.saturating_mul(1u32 << exponent);
        requested.unwrap_or(backoff).min(self.max_delay)
    }
}

/// Failure of a single attempt
#[derive(Debug, Error)]
enum OperationError {
    #[error(transparent)]
    Remote(#[from] StoreError),
    #[error(transparent)]
    Local(#[from] LocalError),
}

impl OperationError {
    fn is_retryable(&self) -> bool {
        match self {
            OperationError::Remote(e) => e.is_retryable(),
            OperationError::Local(_) => false,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            OperationError::Remote(e) => e.retry_after(),
            OperationError::Local(_) => None,
        }
    }
}

/// Everything a worker needs, shared across the pool
pub(crate) struct WorkerContext {
    pub(crate) theme: Theme,
    pub(crate) store: Arc<dyn ThemeStore>,
    pub(crate) local: LocalTheme,
    pub(crate) sink: ErrorSink,
    pub(crate) reporter: Arc<Reporter>,
    pub(crate) retry: RetryPolicy,
}

/// Drain the queue until it is closed and empty
///
/// A panicking operation is recorded as a failure; the worker keeps going.
pub(crate) async fn run_worker(id: usize, queue: OperationQueue, ctx: Arc<WorkerContext>) {
    debug!(worker = id, "Worker started");
    while let Some(mut claimed) = queue.dequeue().await {
        let result = AssertUnwindSafe(ctx.process(claimed.operation_mut()))
            .catch_unwind()
            .await;
        if let Err(panic) = result {
            ctx.record_panic(claimed.operation(), panic.as_ref());
        }
    }
    debug!(worker = id, "Worker stopped");
}

impl WorkerContext {
    fn record_panic(&self, operation: &Operation, panic: &(dyn Any + Send)) {
        let reason = panic
            .downcast_ref::<&str>()
            .copied()
            .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
            .unwrap_or("unknown panic");
        error!("{} panicked: {}", operation, reason);

        let failure = SyncFailure::new(
            operation.clone(),
            FailureKind::Internal,
            format!("internal error: {}", reason),
        );
        self.sink.record(failure.clone());
        self.reporter.emit(SyncEvent::Failed(failure));
    }

    /// Run one operation to completion or terminal failure
    pub(crate) async fn process(&self, operation: &mut Operation) {
        loop {
            operation.attempt += 1;

            let error = match self.execute(operation).await {
                Ok(outcome) => {
                    debug!("{} done ({:?})", operation, outcome);
                    self.reporter.emit(SyncEvent::Completed {
                        operation: operation.clone(),
                        outcome,
                    });
                    return;
                }
                Err(error) => error,
            };

            if error.is_retryable() && operation.attempt < self.retry.max_attempts {
                let delay = self.retry.delay_for(operation.attempt, error.retry_after());
                warn!(
                    attempt = operation.attempt,
                    delay_ms = delay.as_millis() as u64,
                    "{} failed, retrying: {}",
                    operation,
                    error
                );
                self.reporter.emit(SyncEvent::Retrying {
                    operation: operation.clone(),
                    delay,
                    message: error.to_string(),
                });
                tokio::time::sleep(delay).await;
                continue;
            }

            let failure = self.failure_for(operation, &error);
            warn!("{}", failure);
            self.sink.record(failure.clone());
            self.reporter.emit(SyncEvent::Failed(failure));
            return;
        }
    }

    fn failure_for(&self, operation: &Operation, error: &OperationError) -> SyncFailure {
        match error {
            OperationError::Local(e) => {
                SyncFailure::new(operation.clone(), FailureKind::Local, e.describe())
            }
            OperationError::Remote(e) if e.is_retryable() => SyncFailure::new(
                operation.clone(),
                FailureKind::RetriesExhausted,
                format!("{} (gave up after {} attempts)", e, operation.attempt),
            ),
            OperationError::Remote(e) => {
                SyncFailure::new(operation.clone(), FailureKind::Remote, e.to_string())
            }
        }
    }

    async fn execute(&self, operation: &Operation) -> Result<OperationOutcome, OperationError> {
        let path = operation.path.as_str();

        match operation.kind {
            OperationKind::Download => {
                let asset = self.store.get_asset(&self.theme, path).await?;
                let content = asset.content.ok_or_else(|| {
                    StoreError::Decode(format!("response for '{}' has no content", path))
                })?;
                match self.local.write(path, content.as_bytes())? {
                    WriteOutcome::Written => Ok(OperationOutcome::Downloaded),
                    WriteOutcome::Unchanged => Ok(OperationOutcome::Unchanged),
                }
            }
            OperationKind::Upload => {
                let bytes = self.local.read(path)?;
                let content = AssetContent::from_bytes(path, bytes);
                self.store.put_asset(&self.theme, path, &content).await?;
                Ok(OperationOutcome::Uploaded)
            }
            OperationKind::DeleteLocal => match self.local.delete(path)? {
                DeleteOutcome::Deleted => Ok(OperationOutcome::Deleted),
                DeleteOutcome::Missing => Ok(OperationOutcome::AlreadyAbsent),
            },
            OperationKind::DeleteRemote => match self.store.delete_asset(&self.theme, path).await
            {
                Ok(()) => Ok(OperationOutcome::Deleted),
                Err(StoreError::NotFound) => Ok(OperationOutcome::AlreadyAbsent),
                Err(e) => Err(e.into()),
            },
        }
    }
}
