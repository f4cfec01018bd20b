//! # cloudsync-storage
//!
//! Storage abstraction layer for the CloudSync reconciliation core.
//!
//! This crate defines the traits and record types every persistence backend
//! must provide. It contains no implementation; see `cloudsync-db-memory` for
//! the in-process backend.
//!
//! ## Overview
//!
//! - [`AssetStorage`]: reconciled inventory records, keyed per tenant/model/asset id
//! - [`SyncTaskStorage`]: the persisted sync-task lifecycle, including the atomic
//!   "mark running" guard
//! - [`CloudAccountStorage`]: read-only account lookup
//! - [`PermissionGroupStorage`], [`CloudUserStorage`], [`PolicyAuditStorage`]:
//!   the IAM model that drives permission propagation
//!
//! ## Example
//!
//! ```ignore
//! use cloudsync_storage::{AssetStorage, StorageError};
//!
//! async fn known_ids(storage: &dyn AssetStorage) -> Result<Vec<String>, StorageError> {
//!     storage
//!         .list_asset_ids_by_region("tenant-a", "cloud_vm", 42, "cn-hangzhou")
//!         .await
//! }
//! ```

mod error;
mod traits;
mod types;

pub use error::{ErrorCategory, StorageError};
pub use traits::{
    AssetStorage, CloudAccountStorage, CloudUserStorage, PermissionGroupStorage,
    PolicyAuditStorage, SyncTaskStorage,
};
pub use types::{
    AccountFilter, Asset, AssetFilter, AssetKey, CloudUser, CloudUserKey, DEFAULT_MAX_RETRIES,
    GroupFilter, NewSyncTask, PermissionGroup, PolicyChangeRecord, PolicyKey, PolicyRef,
    PolicyType, SyncSummary, SyncTask, SyncTaskFilter, SyncTaskKind, SyncTaskStatus,
    TargetKind, TaskTransition, TaskTrigger, UserFilter, UserStatus, dedupe_policies,
};

/// Type alias for a storage result.
pub type StorageResult<T> = Result<T, StorageError>;

/// Shareable trait objects for each store.
pub type DynAssetStorage = std::sync::Arc<dyn AssetStorage>;
pub type DynSyncTaskStorage = std::sync::Arc<dyn SyncTaskStorage>;
pub type DynCloudAccountStorage = std::sync::Arc<dyn CloudAccountStorage>;
pub type DynPermissionGroupStorage = std::sync::Arc<dyn PermissionGroupStorage>;
pub type DynCloudUserStorage = std::sync::Arc<dyn CloudUserStorage>;
pub type DynPolicyAuditStorage = std::sync::Arc<dyn PolicyAuditStorage>;
