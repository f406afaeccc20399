//! Themesync Core Library
//!
//! This crate provides the engine behind `themesync`: it reconciles a local
//! directory of theme assets with a remote theme exposed by a storefront's
//! admin API.
//!
//! # Architecture
//!
//! - **Syncer**: facade owning one invocation's queue, worker pool, and error sink
//! - **ThemeStore**: async trait over the remote theme (HTTP and in-memory impls)
//! - **Filters**: ignore/include rule sets deciding which paths take part
//!
//! Verbs only list and enqueue; a fixed pool of tokio tasks does the transfers.
//! Individual failures never abort a run; they are collected and reported at
//! the end.
//!
//! # Quick Start
//!
//! ```text
//! let store = Arc::new(AdminApiStore::new("shop.myshopify.com", token, DEFAULT_API_VERSION)?);
//! let theme = resolve_theme(store.as_ref(), &ThemeSelector::Live).await?.unwrap();
//!
//! let mut syncer = Syncer::new(SyncContext::new(".", store), theme, include, ignore);
//! syncer.start_threads()?;
//! syncer.download_theme(true).await?;
//! syncer.shutdown().await;
//! ```
//!
//! # Modules
//!
//! - `syncer`: Syncer facade (main entry point)
//! - `queue`: operation queue with per-path claims
//! - `worker`: worker loop and retry policy
//! - `error_sink`: failure aggregation
//! - `io_guard`: scoped output suppression and sync events
//! - `store`: remote theme store trait and implementations
//! - `local`: local theme directory access
//! - `filter`: ignore and include filters
//! - `resolve`: theme selection
//! - `config`: application configuration

pub mod config;
pub mod error;
pub mod error_sink;
pub mod filter;
pub mod io_guard;
pub mod local;
pub mod models;
pub mod operation;
pub mod queue;
pub mod resolve;
pub mod store;
pub mod syncer;
mod worker;

pub use config::Config;
pub use error::{SyncError, SyncResult, SyncerState};
pub use error_sink::{ErrorSink, FailureKind, SyncFailure};
pub use filter::{FilterError, IgnoreFilter, IncludeFilter, IGNORE_FILE};
pub use io_guard::{IoGuard, OperationOutcome, SyncEvent};
pub use local::{LocalError, LocalTheme};
pub use models::{Asset, AssetContent, Theme, ThemeRole};
pub use operation::{Operation, OperationKind};
pub use queue::{ClaimedOperation, OperationQueue, QueueClosed};
pub use resolve::{resolve_theme, select_theme, ThemeSelector};
pub use store::{
    AdminApiStore, MemoryThemeStore, StoreCall, StoreError, StoreResult, ThemeStore,
    DEFAULT_API_VERSION,
};
pub use syncer::{SyncContext, Syncer};
pub use worker::{default_worker_count, RetryPolicy, MAX_WORKERS};
