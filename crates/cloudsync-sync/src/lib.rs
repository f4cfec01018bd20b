//! # cloudsync-sync
//!
//! The reconciliation core of CloudSync.
//!
//! - [`reconcile`]: the generic list, diff, delete and upsert algorithm with one
//!   converter per resource kind ([`converters`])
//! - [`state_machine`]: the persisted sync-task lifecycle
//! - [`executor`]: runs one task under its deadline and records the outcome
//! - [`propagation`]: fans permission-group edits out into per-user tasks
//! - [`queue`] / [`scheduler`]: the worker pool and the periodic sweeps
//! - [`SyncService`]: the facade callers use
//!
//! ## Example
//!
//! ```ignore
//! use cloudsync_sync::{CreateSyncTaskRequest, SyncConfig, SyncService};
//!
//! let service = SyncService::new(stores, factory, SyncConfig::default());
//! let task = service
//!     .create_sync_task(CreateSyncTaskRequest::new("user-sync", "user", 11, 5, "aws"))
//!     .await?;
//! let done = service.execute_sync_task(task.id).await?;
//! ```

pub mod config;
pub mod converters;
pub mod error;
pub mod executor;
mod pagination;
pub mod propagation;
pub mod queue;
pub mod reconcile;
pub mod routines;
pub mod scheduler;
pub mod service;
pub mod state_machine;
mod stores;

pub use config::SyncConfig;
pub use error::{ErrorCategory, SyncError};
pub use executor::TaskExecutor;
pub use propagation::{PermissionPropagator, PolicyUpdateResult};
pub use queue::{TaskQueue, WorkerPool};
pub use reconcile::{ReconcileEngine, ReconcileOutcome, ReconcileRequest};
pub use routines::SyncRoutines;
pub use scheduler::start_sync_scheduler;
pub use service::{SweepReport, SyncService};
pub use state_machine::{CreateSyncTaskRequest, TaskStateMachine, expected_target};
pub use stores::SyncStores;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;
