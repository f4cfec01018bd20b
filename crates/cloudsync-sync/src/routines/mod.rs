//! The work each task kind performs.
//!
//! Routines return a [`SyncSummary`] on completion. Per-item failures are
//! folded into the summary; only an error of the routine as a whole is
//! returned, and that is what fails the task.

mod account_sync;
mod group_sync;
mod permission_sync;
mod user_sync;

use std::sync::Arc;

use cloudsync_cloud::AdapterFactory;
use cloudsync_core::CloudAccount;
use cloudsync_storage::{
    CloudUser, CloudUserStorage, DynCloudAccountStorage, DynCloudUserStorage,
    DynPermissionGroupStorage, PermissionGroup, SyncSummary, SyncTask, SyncTaskKind, UserFilter,
    UserStatus,
};

use crate::SyncResult;
use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::reconcile::ReconcileEngine;
use crate::state_machine::TaskStateMachine;
use crate::stores::SyncStores;

/// Shared collaborators of every routine.
pub struct SyncRoutines {
    accounts: DynCloudAccountStorage,
    users: DynCloudUserStorage,
    groups: DynPermissionGroupStorage,
    factory: Arc<AdapterFactory>,
    engine: ReconcileEngine,
    machine: Arc<TaskStateMachine>,
    config: Arc<SyncConfig>,
}

impl SyncRoutines {
    pub fn new(
        stores: &SyncStores,
        factory: Arc<AdapterFactory>,
        machine: Arc<TaskStateMachine>,
        config: Arc<SyncConfig>,
    ) -> Self {
        Self {
            accounts: stores.accounts.clone(),
            users: stores.users.clone(),
            groups: stores.groups.clone(),
            factory,
            engine: ReconcileEngine::new(
                stores.assets.clone(),
                config.list_page_size,
                config.max_pages,
            ),
            machine,
            config,
        }
    }

    pub fn engine(&self) -> &ReconcileEngine {
        &self.engine
    }

    /// Runs the routine for the task's kind.
    pub async fn run(&self, task: &SyncTask) -> SyncResult<SyncSummary> {
        match task.task_type {
            SyncTaskKind::UserSync => self.user_sync(task).await,
            SyncTaskKind::PermissionSync => self.permission_sync(task).await,
            SyncTaskKind::GroupSync => self.group_sync(task).await,
            SyncTaskKind::BatchUserSync => self.batch_user_sync(task).await,
        }
    }

    pub(crate) async fn load_account(&self, id: i64) -> SyncResult<CloudAccount> {
        self.accounts
            .get_by_id(id)
            .await?
            .ok_or_else(|| SyncError::not_found("CloudAccount", id))
    }

    pub(crate) async fn load_user(&self, id: i64) -> SyncResult<CloudUser> {
        self.users
            .get_by_id(id)
            .await?
            .ok_or_else(|| SyncError::not_found("CloudUser", id))
    }

    pub(crate) async fn load_group(&self, id: i64) -> SyncResult<PermissionGroup> {
        self.groups
            .get_by_id(id)
            .await?
            .ok_or_else(|| SyncError::not_found("PermissionGroup", id))
    }

    /// Best-effort progress checkpoint. Inline runs have no task to report on.
    pub(crate) async fn report(&self, task_id: Option<i64>, progress: u8) {
        if let Some(id) = task_id {
            self.machine.update_progress(id, progress).await;
        }
    }
}

impl std::fmt::Debug for SyncRoutines {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncRoutines")
            .field("factory", &self.factory)
            .field("engine", &self.engine)
            .finish_non_exhaustive()
    }
}

/// Active users of a tenant whose membership list contains `group_id`.
///
/// Scans the tenant page by page so a large tenant is never loaded in one call.
pub(crate) async fn list_group_members(
    users: &dyn CloudUserStorage,
    tenant_id: &str,
    group_id: i64,
    page_size: usize,
) -> SyncResult<Vec<CloudUser>> {
    let page_size = page_size.max(1);
    let mut members = Vec::new();
    let mut offset = 0;
    loop {
        let page = users
            .list(&UserFilter {
                tenant_id: Some(tenant_id.to_string()),
                status: Some(UserStatus::Active),
                limit: Some(page_size),
                offset: Some(offset),
                ..Default::default()
            })
            .await?;
        let fetched = page.len();
        members.extend(page.into_iter().filter(|u| u.in_group(group_id)));
        if fetched < page_size {
            break;
        }
        offset += fetched;
    }
    Ok(members)
}

/// Progress of step `done` out of `total`, spread over `from..=to`.
pub(crate) fn checkpoint(from: u8, to: u8, done: usize, total: usize) -> u8 {
    if total == 0 {
        return to;
    }
    let span = usize::from(to.saturating_sub(from));
    let step = span * done.min(total) / total;
    from.saturating_add(u8::try_from(step).unwrap_or(u8::MAX)).min(to)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cloudsync_core::Provider;
    use cloudsync_db_memory::InMemoryUserStorage;

    #[test]
    fn test_checkpoint_spreads_over_range() {
        assert_eq!(checkpoint(40, 90, 0, 10), 40);
        assert_eq!(checkpoint(40, 90, 5, 10), 65);
        assert_eq!(checkpoint(40, 90, 10, 10), 90);
        assert_eq!(checkpoint(40, 90, 0, 0), 90);
        assert_eq!(checkpoint(10, 90, 20, 10), 90);
    }

    #[tokio::test]
    async fn test_group_members_are_collected_across_pages() {
        let users = InMemoryUserStorage::new();
        for i in 0..7 {
            let groups = if i % 2 == 0 { vec![1] } else { vec![2] };
            users
                .upsert(
                    &CloudUser::new("t1", Provider::Aws, 1, format!("u-{i}"), format!("user{i}"))
                        .with_groups(groups),
                )
                .await
                .unwrap();
        }
        users
            .upsert(&CloudUser::new("t2", Provider::Aws, 1, "x", "other").with_groups([1]))
            .await
            .unwrap();

        let members = list_group_members(&users, "t1", 1, 2).await.unwrap();
        let names: Vec<_> = members.iter().map(|u| u.username.as_str()).collect();
        assert_eq!(names, vec!["user0", "user2", "user4", "user6"]);
    }
}
