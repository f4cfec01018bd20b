//! Fan-out of a permission-group edit into per-user permission-sync tasks.

use std::sync::Arc;

use cloudsync_core::now_utc;
use cloudsync_storage::{
    CloudUser, DynCloudUserStorage, DynPermissionGroupStorage, DynPolicyAuditStorage, NewSyncTask,
    PermissionGroup, PolicyChangeRecord, PolicyRef, SyncTask, SyncTaskKind, TargetKind,
    TaskTrigger, UserStatus, dedupe_policies,
};
use serde::Serialize;

use crate::SyncResult;
use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::routines::list_group_members;
use crate::state_machine::TaskStateMachine;
use crate::stores::SyncStores;

/// Outcome of a group policy edit.
#[derive(Debug, Clone, Serialize)]
pub struct PolicyUpdateResult {
    pub change: PolicyChangeRecord,
    /// One permission-sync task per affected (user, provider).
    pub tasks: Vec<SyncTask>,
}

/// Turns group policy edits into permission-sync tasks.
pub struct PermissionPropagator {
    groups: DynPermissionGroupStorage,
    users: DynCloudUserStorage,
    audit: DynPolicyAuditStorage,
    machine: Arc<TaskStateMachine>,
    config: Arc<SyncConfig>,
}

impl PermissionPropagator {
    pub fn new(stores: &SyncStores, machine: Arc<TaskStateMachine>, config: Arc<SyncConfig>) -> Self {
        Self {
            groups: stores.groups.clone(),
            users: stores.users.clone(),
            audit: stores.audit.clone(),
            machine,
            config,
        }
    }

    /// Replaces a group's policy set, audits the change and fans it out to
    /// every member.
    pub async fn update_group_policies(
        &self,
        group_id: i64,
        policies: Vec<PolicyRef>,
        operator: Option<String>,
    ) -> SyncResult<PolicyUpdateResult> {
        // 1. Persist the new set, keeping the old one for the audit trail
        let new_policies = dedupe_policies(policies);
        let previous = self
            .groups
            .update_policies(group_id, new_policies.clone())
            .await?;
        let change = self
            .audit
            .record(PolicyChangeRecord {
                id: 0,
                group_id,
                tenant_id: previous.tenant_id.clone(),
                old_policies: previous.policies,
                new_policies,
                operator,
                changed_at: now_utc(),
            })
            .await?;
        tracing::info!(
            group_id,
            old = change.old_policies.len(),
            new = change.new_policies.len(),
            operator = change.operator.as_deref().unwrap_or("-"),
            "Permission group policies updated"
        );

        // 2-3. Fan out to the group's members
        let tasks = self.sync_permission_changes(group_id, &[]).await?;
        Ok(PolicyUpdateResult { change, tasks })
    }

    /// Creates one permission-sync task per (user, provider the group targets).
    ///
    /// With an empty `user_ids` the affected users are the group's active
    /// members; otherwise exactly the listed users (e.g. users just removed
    /// from the group). A task that cannot be created is logged and skipped.
    pub async fn sync_permission_changes(
        &self,
        group_id: i64,
        user_ids: &[i64],
    ) -> SyncResult<Vec<SyncTask>> {
        let group = self
            .groups
            .get_by_id(group_id)
            .await?
            .ok_or_else(|| SyncError::not_found("PermissionGroup", group_id))?;

        let users = if user_ids.is_empty() {
            list_group_members(
                self.users.as_ref(),
                &group.tenant_id,
                group.id,
                self.config.propagation_page_size,
            )
            .await?
        } else {
            self.load_users(&group, user_ids).await
        };

        let mut tasks = Vec::with_capacity(users.len() * group.cloud_platforms.len());
        for user in &users {
            for provider in &group.cloud_platforms {
                let new_task = NewSyncTask {
                    tenant_id: user.tenant_id.clone(),
                    task_type: SyncTaskKind::PermissionSync,
                    target_type: TargetKind::User,
                    target_id: user.id,
                    cloud_account_id: user.cloud_account_id,
                    provider: *provider,
                    max_retries: self.config.default_max_retries,
                    trigger: TaskTrigger::Propagation,
                };
                match self.machine.create_task(new_task).await {
                    Ok(task) => tasks.push(task),
                    Err(e) => tracing::warn!(
                        group_id,
                        user_id = user.id,
                        provider = %provider,
                        error = %e,
                        "Failed to create permission sync task"
                    ),
                }
            }
        }

        tracing::info!(
            group_id,
            users = users.len(),
            platforms = group.cloud_platforms.len(),
            tasks = tasks.len(),
            "Propagated permission change"
        );
        Ok(tasks)
    }

    /// Explicitly named users of the group's tenant; unknown or deleted ones are skipped.
    async fn load_users(&self, group: &PermissionGroup, user_ids: &[i64]) -> Vec<CloudUser> {
        let mut users = Vec::with_capacity(user_ids.len());
        for &user_id in user_ids {
            match self.users.get_by_id(user_id).await {
                Ok(Some(user))
                    if user.tenant_id == group.tenant_id && user.status != UserStatus::Deleted =>
                {
                    users.push(user)
                }
                Ok(_) => tracing::warn!(
                    group_id = group.id,
                    user_id,
                    "Skipping unknown or deleted user"
                ),
                Err(e) => tracing::warn!(
                    group_id = group.id,
                    user_id,
                    error = %e,
                    "Failed to load user for propagation"
                ),
            }
        }
        users
    }
}

impl std::fmt::Debug for PermissionPropagator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermissionPropagator")
            .field("page_size", &self.config.propagation_page_size)
            .finish_non_exhaustive()
    }
}
