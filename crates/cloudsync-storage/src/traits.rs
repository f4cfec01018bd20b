//! Storage traits for the CloudSync persistence layer.
//!
//! Every backend implements these traits. Implementations must be thread-safe
//! (`Send + Sync`): the executor, the propagator and the sweeps all share one
//! instance.

use async_trait::async_trait;
use cloudsync_core::CloudAccount;
use time::OffsetDateTime;

use crate::error::StorageError;
use crate::types::{
    AccountFilter, Asset, AssetFilter, AssetKey, CloudUser, CloudUserKey, GroupFilter,
    NewSyncTask, PermissionGroup, PolicyChangeRecord, PolicyRef, SyncSummary, SyncTask,
    SyncTaskFilter, SyncTaskStatus, TaskTransition, UserFilter,
};

/// Inventory records produced by reconciliation.
#[async_trait]
pub trait AssetStorage: Send + Sync {
    /// Inserts or replaces the record keyed by `(tenant, model, asset id)`.
    ///
    /// Upserting the same record twice leaves the store unchanged.
    async fn upsert(&self, asset: &Asset) -> Result<(), StorageError>;

    /// Deletes the given asset ids within one tenant and model.
    ///
    /// Ids that are already absent are ignored. Returns the number of records removed.
    async fn delete_by_asset_ids(
        &self,
        tenant_id: &str,
        model_uid: &str,
        asset_ids: &[String],
    ) -> Result<u64, StorageError>;

    /// Lists the asset ids stored for one `(tenant, model, account, region)` scope.
    async fn list_asset_ids_by_region(
        &self,
        tenant_id: &str,
        model_uid: &str,
        cloud_account_id: i64,
        region: &str,
    ) -> Result<Vec<String>, StorageError>;

    /// Reads one record. Returns `None` if it does not exist.
    async fn get(&self, key: &AssetKey) -> Result<Option<Asset>, StorageError>;

    async fn list(&self, filter: &AssetFilter) -> Result<Vec<Asset>, StorageError>;
}

/// The persisted sync-task lifecycle.
///
/// The store is the only source of truth for "is this task running":
/// [`SyncTaskStorage::mark_as_running`] and [`SyncTaskStorage::increment_retry`]
/// must be atomic conditional updates.
#[async_trait]
pub trait SyncTaskStorage: Send + Sync {
    /// Persists a new task in `pending` with zero progress and zero retries.
    async fn create(&self, task: NewSyncTask) -> Result<SyncTask, StorageError>;

    /// Returns `None` if the task does not exist.
    async fn get_by_id(&self, id: i64) -> Result<Option<SyncTask>, StorageError>;

    /// Lists tasks matching the filter, newest first.
    async fn list(&self, filter: &SyncTaskFilter) -> Result<Vec<SyncTask>, StorageError>;

    /// Sets the status and error message without any transition check.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the task does not exist.
    async fn update_status(
        &self,
        id: i64,
        status: SyncTaskStatus,
        error_message: Option<String>,
    ) -> Result<(), StorageError>;

    /// Records progress, clamped to `0..=100`.
    ///
    /// While the task is running progress never decreases: a lower value is ignored.
    async fn update_progress(&self, id: i64, progress: u8) -> Result<(), StorageError>;

    /// Moves the task to `running` only if it is currently `pending`.
    ///
    /// The status check and the write happen as one atomic step. Any other
    /// status (running, retrying or finished) is refused without touching the
    /// task, and the refusal carries the task as found.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the task does not exist.
    async fn mark_as_running(
        &self,
        id: i64,
        start_time: OffsetDateTime,
    ) -> Result<TaskTransition, StorageError>;

    /// Marks success, sets the end time and forces progress to 100.
    async fn mark_as_success(
        &self,
        id: i64,
        end_time: OffsetDateTime,
        summary: Option<SyncSummary>,
    ) -> Result<(), StorageError>;

    /// Marks failure with the given message and sets the end time.
    async fn mark_as_failed(
        &self,
        id: i64,
        end_time: OffsetDateTime,
        message: &str,
    ) -> Result<(), StorageError>;

    /// Increments `retry_count` and sets status to `retrying`, only if the task
    /// is `failed` with `retry_count < max_retries`.
    ///
    /// Check and write are one atomic step, so concurrent retries never push
    /// `retry_count` past `max_retries`.
    async fn increment_retry(&self, id: i64) -> Result<TaskTransition, StorageError>;

    /// Oldest pending tasks first.
    async fn list_pending_tasks(&self, limit: usize) -> Result<Vec<SyncTask>, StorageError>;

    /// Failed tasks whose `retry_count` is still below `max_retries`, oldest first.
    async fn list_failed_retryable_tasks(
        &self,
        limit: usize,
    ) -> Result<Vec<SyncTask>, StorageError>;
}

/// Read-only cloud account lookup.
#[async_trait]
pub trait CloudAccountStorage: Send + Sync {
    async fn get_by_id(&self, id: i64) -> Result<Option<CloudAccount>, StorageError>;

    async fn list(&self, filter: &AccountFilter) -> Result<Vec<CloudAccount>, StorageError>;
}

/// Permission groups and their policy sets.
#[async_trait]
pub trait PermissionGroupStorage: Send + Sync {
    async fn get_by_id(&self, id: i64) -> Result<Option<PermissionGroup>, StorageError>;

    async fn list(&self, filter: &GroupFilter) -> Result<Vec<PermissionGroup>, StorageError>;

    /// Inserts or replaces a group by id.
    async fn save(&self, group: &PermissionGroup) -> Result<(), StorageError>;

    /// Replaces the group's policy set and returns the group as it was before.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the group does not exist.
    async fn update_policies(
        &self,
        id: i64,
        policies: Vec<PolicyRef>,
    ) -> Result<PermissionGroup, StorageError>;
}

/// Locally tracked cloud identities.
#[async_trait]
pub trait CloudUserStorage: Send + Sync {
    async fn get_by_id(&self, id: i64) -> Result<Option<CloudUser>, StorageError>;

    async fn find_by_key(&self, key: &CloudUserKey) -> Result<Option<CloudUser>, StorageError>;

    /// Lists users matching the filter ordered by id, honouring `limit`/`offset`.
    async fn list(&self, filter: &UserFilter) -> Result<Vec<CloudUser>, StorageError>;

    /// Inserts or updates by natural key.
    ///
    /// A new user gets a store-assigned id. An existing user keeps its id, its
    /// group memberships and its personal policies.
    async fn upsert(&self, user: &CloudUser) -> Result<CloudUser, StorageError>;

    /// Soft-deletes a user by setting its status to `deleted`.
    async fn mark_deleted(&self, id: i64) -> Result<(), StorageError>;
}

/// Audit trail of group policy edits.
#[async_trait]
pub trait PolicyAuditStorage: Send + Sync {
    async fn record(&self, change: PolicyChangeRecord) -> Result<PolicyChangeRecord, StorageError>;

    /// Changes for one group, oldest first.
    async fn list_for_group(&self, group_id: i64)
    -> Result<Vec<PolicyChangeRecord>, StorageError>;
}
