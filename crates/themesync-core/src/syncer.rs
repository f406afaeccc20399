//! Syncer facade
//!
//! Owns the operation queue, the worker pool, and the error sink for one
//! command invocation. Verbs list and filter assets, then enqueue work;
//! workers drain the queue concurrently; `shutdown` waits for the drain.
//!
//! ## Usage
//!
//! ```ignore
//! let ctx = SyncContext::new(".", store);
//! let mut syncer = Syncer::new(ctx, theme, include_filter, ignore_filter);
//!
//! syncer.start_threads()?;
//! syncer.download_theme(true).await?;
//! syncer.shutdown().await;
//!
//! if syncer.has_any_error() {
//!     for message in syncer.error_messages() { eprintln!("{}", message); }
//! }
//! ```
//!
//! ## Lifecycle
//!
//! `Created → Started → ShuttingDown → Shutdown`. Verbs are only accepted
//! while `Started`; `shutdown` is terminal and idempotent.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{SyncError, SyncResult, SyncerState};
use crate::error_sink::{ErrorSink, SyncFailure};
use crate::filter::{IgnoreFilter, IncludeFilter};
use crate::io_guard::{IoGuard, Reporter, SyncEvent};
use crate::local::LocalTheme;
use crate::models::Theme;
use crate::operation::Operation;
use crate::queue::OperationQueue;
use crate::store::ThemeStore;
use crate::worker::{default_worker_count, run_worker, RetryPolicy, WorkerContext, MAX_WORKERS};

/// Explicit context for a sync run
///
/// Replaces any process-wide session state: the store client, the theme
/// root, and the pool settings are all passed in here.
#[derive(Clone)]
pub struct SyncContext {
    /// Local theme root
    pub root: PathBuf,
    /// Remote store client, already scoped to one shop
    pub store: Arc<dyn ThemeStore>,
    /// Worker pool size
    pub workers: usize,
    pub retry: RetryPolicy,
}

impl SyncContext {
    pub fn new(root: impl Into<PathBuf>, store: Arc<dyn ThemeStore>) -> Self {
        Self {
            root: root.into(),
            store,
            workers: default_worker_count(),
            retry: RetryPolicy::default(),
        }
    }

    /// Set the pool size, clamped to `1..=MAX_WORKERS`
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.clamp(1, MAX_WORKERS);
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

/// Concurrent engine reconciling a local theme directory with a remote theme
pub struct Syncer {
    run_id: Uuid,
    theme: Theme,
    include_filter: IncludeFilter,
    ignore_filter: IgnoreFilter,
    local: LocalTheme,
    store: Arc<dyn ThemeStore>,
    workers: usize,
    retry: RetryPolicy,
    queue: OperationQueue,
    sink: ErrorSink,
    reporter: Arc<Reporter>,
    event_rx: Option<mpsc::UnboundedReceiver<SyncEvent>>,
    handles: Vec<JoinHandle<()>>,
    state: SyncerState,
}

impl Syncer {
    pub fn new(
        ctx: SyncContext,
        theme: Theme,
        include_filter: IncludeFilter,
        ignore_filter: IgnoreFilter,
    ) -> Self {
        let (reporter, event_rx) = Reporter::new();

        Self {
            run_id: Uuid::new_v4(),
            theme,
            include_filter,
            ignore_filter,
            local: LocalTheme::new(ctx.root),
            store: ctx.store,
            workers: ctx.workers.clamp(1, MAX_WORKERS),
            retry: ctx.retry,
            queue: OperationQueue::new(),
            sink: ErrorSink::new(),
            reporter,
            event_rx: Some(event_rx),
            handles: Vec::new(),
            state: SyncerState::Created,
        }
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    pub fn state(&self) -> SyncerState {
        self.state
    }

    /// Take the event receiver (can only be called once)
    pub fn take_events(&mut self) -> Option<mpsc::UnboundedReceiver<SyncEvent>> {
        self.event_rx.take()
    }

    // ==================== Lifecycle ====================

    /// Spawn the worker pool
    ///
    /// Must be called from within a tokio runtime.
    pub fn start_threads(&mut self) -> SyncResult<()> {
        if self.state != SyncerState::Created {
            return Err(self.lifecycle_error("start workers"));
        }

        let ctx = Arc::new(WorkerContext {
            theme: self.theme.clone(),
            store: Arc::clone(&self.store),
            local: self.local.clone(),
            sink: self.sink.clone(),
            reporter: Arc::clone(&self.reporter),
            retry: self.retry,
        });

        self.handles = (0..self.workers)
            .map(|id| tokio::spawn(run_worker(id, self.queue.clone(), Arc::clone(&ctx))))
            .collect();
        self.state = SyncerState::Started;

        info!(
            run = %self.run_id,
            theme_id = self.theme.id,
            workers = self.workers,
            "Sync workers started"
        );
        Ok(())
    }

    /// Drain queued work and stop the pool
    ///
    /// In-flight and queued operations run to completion; no new work is
    /// accepted. Calling this again is a no-op.
    ///
    /// Events emitted while draining are held by an IO guard and flushed as
    /// one block once every worker has stopped. The guard only batches
    /// output; it does not pause workers.
    pub async fn shutdown(&mut self) {
        match self.state {
            SyncerState::ShuttingDown | SyncerState::Shutdown => return,
            SyncerState::Created => {
                self.queue.close();
                self.state = SyncerState::Shutdown;
                return;
            }
            SyncerState::Started => {}
        }

        let _io = self.reporter.lock_io();
        self.state = SyncerState::ShuttingDown;
        debug!(run = %self.run_id, pending = self.queue.len(), "Draining operation queue");

        self.queue.close();
        for handle in self.handles.drain(..) {
            if let Err(e) = handle.await {
                warn!(run = %self.run_id, "Sync worker ended abnormally: {}", e);
            }
        }

        self.state = SyncerState::Shutdown;
        info!(
            run = %self.run_id,
            failures = self.sink.len(),
            "Sync workers stopped"
        );
    }

    // ==================== Verbs ====================

    /// Queue downloads for every remote asset passing the filters
    ///
    /// With `delete`, also queues removal of local files that are absent
    /// remotely and not filtered out. Returns the number of operations
    /// queued; the work itself completes during `shutdown`.
    pub async fn download_theme(&self, delete: bool) -> SyncResult<usize> {
        self.ensure_started("download theme")?;
        info!(run = %self.run_id, theme_id = self.theme.id, delete, "Downloading theme");

        let mut remote_keys: Vec<String> = self
            .store
            .list_assets(&self.theme)
            .await
            .map_err(SyncError::RemoteListing)?
            .into_iter()
            .map(|asset| asset.key)
            .collect();
        remote_keys.sort();
        remote_keys.dedup();

        let local_keys = self.local.list().map_err(SyncError::LocalListing)?;

        let mut operations: Vec<Operation> = remote_keys
            .iter()
            .filter(|key| self.participates(key))
            .map(Operation::download)
            .collect();

        if delete {
            let remote: HashSet<&str> = remote_keys.iter().map(String::as_str).collect();
            operations.extend(
                local_keys
                    .iter()
                    .filter(|key| !remote.contains(key.as_str()))
                    .filter(|key| self.participates(key))
                    .map(Operation::delete_local),
            );
        }

        self.enqueue_all(operations)
    }

    /// Queue uploads for every local file passing the filters
    ///
    /// With `delete`, also queues removal of remote assets that are absent
    /// locally and not filtered out. Uploads are ordered so templates land
    /// before the JSON that references them, and `config/settings_data.json`
    /// goes last.
    pub async fn upload_theme(&self, delete: bool) -> SyncResult<usize> {
        self.ensure_started("upload theme")?;
        info!(run = %self.run_id, theme_id = self.theme.id, delete, "Uploading theme");

        let mut local_keys: Vec<String> = self
            .local
            .list()
            .map_err(SyncError::LocalListing)?
            .into_iter()
            .filter(|key| self.participates(key))
            .collect();
        local_keys.sort_by(|a, b| upload_priority(a).cmp(&upload_priority(b)).then(a.cmp(b)));

        let mut operations: Vec<Operation> =
            local_keys.iter().map(Operation::upload).collect();

        if delete {
            let local: HashSet<&str> = local_keys.iter().map(String::as_str).collect();
            let mut remote_keys: Vec<String> = self
                .store
                .list_assets(&self.theme)
                .await
                .map_err(SyncError::RemoteListing)?
                .into_iter()
                .map(|asset| asset.key)
                .filter(|key| !local.contains(key.as_str()))
                .filter(|key| self.participates(key))
                .collect();
            remote_keys.sort();
            remote_keys.dedup();
            operations.extend(remote_keys.into_iter().map(Operation::delete_remote));
        }

        self.enqueue_all(operations)
    }

    // ==================== Status ====================

    /// Whether any operation failed during this run
    pub fn has_any_error(&self) -> bool {
        self.sink.has_any_error()
    }

    /// Failure descriptions for display, in the order they happened
    pub fn error_messages(&self) -> Vec<String> {
        self.sink.error_messages()
    }

    pub fn failures(&self) -> Vec<SyncFailure> {
        self.sink.failures()
    }

    /// Hold back sync events until the returned guard is dropped
    pub fn lock_io(&self) -> IoGuard {
        self.reporter.lock_io()
    }

    // ==================== Internals ====================

    /// Whether a path passes both filters
    fn participates(&self, path: &str) -> bool {
        if self.ignore_filter.ignore(path) {
            debug!("Skipping ignored {}", path);
            return false;
        }
        if !self.include_filter.matches(path) {
            debug!("Skipping {} (not included)", path);
            return false;
        }
        true
    }

    fn enqueue_all(&self, operations: Vec<Operation>) -> SyncResult<usize> {
        let count = operations.len();
        for operation in operations {
            debug!("Queueing {}", operation);
            self.queue.enqueue(operation)?;
        }
        info!(run = %self.run_id, queued = count, "Operations queued");
        Ok(count)
    }

    fn ensure_started(&self, action: &'static str) -> SyncResult<()> {
        if self.state == SyncerState::Started {
            Ok(())
        } else {
            Err(self.lifecycle_error(action))
        }
    }

    fn lifecycle_error(&self, action: &'static str) -> SyncError {
        SyncError::Lifecycle {
            action,
            state: self.state,
        }
    }
}

impl Drop for Syncer {
    fn drop(&mut self) {
        // Let detached workers finish queued work and exit
        self.queue.close();
    }
}

/// Upload order: lower goes first
fn upload_priority(key: &str) -> u8 {
    match key {
        "config/settings_schema.json" => 1,
        "config/settings_data.json" => 4,
        _ if key.ends_with(".liquid") => 0,
        _ if key.starts_with("locales/") => 2,
        _ => 3,
    }
}
