use std::collections::BTreeSet;

use cloudsync_cloud::PermissionChange;
use cloudsync_core::Provider;
use cloudsync_storage::{CloudUser, SyncSummary, SyncTask, UserStatus};

use super::SyncRoutines;
use crate::SyncResult;

impl SyncRoutines {
    pub(crate) async fn permission_sync(&self, task: &SyncTask) -> SyncResult<SyncSummary> {
        let user = self.load_user(task.target_id).await?;
        self.report(Some(task.id), 20).await;
        self.sync_user_permissions(&user, task.provider).await
    }

    /// Makes the user's provider-side policies equal to its effective set.
    ///
    /// The effective set is the union of the policies its groups hold for
    /// `provider` plus its personal policies on `provider`. Policies found on
    /// the provider but absent from that set are detached.
    pub(crate) async fn sync_user_permissions(
        &self,
        user: &CloudUser,
        provider: Provider,
    ) -> SyncResult<SyncSummary> {
        let mut summary = SyncSummary::new();
        if user.provider != provider || user.status == UserStatus::Deleted {
            tracing::debug!(
                user_id = user.id,
                user_provider = %user.provider,
                provider = %provider,
                status = %user.status,
                "Nothing to push for user on this provider"
            );
            summary.record_skip();
            return Ok(summary);
        }

        let target = self.effective_policies(user, provider).await?;
        let account = self.load_account(user.cloud_account_id).await?;
        let adapter = self.factory.create_adapter(&account)?;
        let current: BTreeSet<String> = adapter
            .get_user_policies(&user.cloud_user_id)
            .await?
            .into_iter()
            .map(|p| p.policy_id)
            .collect();

        let change = PermissionChange {
            attach: target.difference(&current).cloned().collect(),
            detach: current.difference(&target).cloned().collect(),
        };
        if change.is_empty() {
            tracing::debug!(user_id = user.id, provider = %provider, "Permissions already in sync");
            summary.record_skip();
            return Ok(summary);
        }

        adapter
            .update_user_permissions(&user.cloud_user_id, &change)
            .await?;
        for _ in 0..change.attach.len() + change.detach.len() {
            summary.record_success();
        }
        tracing::info!(
            user_id = user.id,
            cloud_user_id = %user.cloud_user_id,
            provider = %provider,
            attached = change.attach.len(),
            detached = change.detach.len(),
            "Updated user permissions"
        );
        Ok(summary)
    }

    async fn effective_policies(
        &self,
        user: &CloudUser,
        provider: Provider,
    ) -> SyncResult<BTreeSet<String>> {
        let mut target = BTreeSet::new();
        for group_id in &user.permission_groups {
            match self.groups.get_by_id(*group_id).await? {
                Some(group) => {
                    target.extend(group.policies_for(provider).map(|p| p.policy_id.clone()));
                }
                None => tracing::warn!(
                    user_id = user.id,
                    group_id,
                    "User references a missing permission group"
                ),
            }
        }
        target.extend(
            user.personal_policies
                .iter()
                .filter(|p| p.provider == provider)
                .map(|p| p.policy_id.clone()),
        );
        Ok(target)
    }
}
