use cloudsync_storage::{SyncSummary, SyncTask};

use super::{SyncRoutines, checkpoint, list_group_members};
use crate::SyncResult;

impl SyncRoutines {
    /// Permission-syncs every active member of a group on the task's provider.
    ///
    /// One member failing does not stop the others.
    pub(crate) async fn group_sync(&self, task: &SyncTask) -> SyncResult<SyncSummary> {
        let group = self.load_group(task.target_id).await?;
        let members: Vec<_> = list_group_members(
            self.users.as_ref(),
            &group.tenant_id,
            group.id,
            self.config.propagation_page_size,
        )
        .await?
        .into_iter()
        .filter(|u| u.provider == task.provider)
        .collect();
        self.report(Some(task.id), 10).await;

        let mut summary = SyncSummary::new();
        for (done, user) in members.iter().enumerate() {
            match self.sync_user_permissions(user, task.provider).await {
                Ok(outcome) => summary.merge(outcome),
                Err(e) => {
                    tracing::warn!(
                        task_id = task.id,
                        group_id = group.id,
                        user_id = user.id,
                        error = %e,
                        "Permission sync failed for group member"
                    );
                    summary.record_failure(format!("user {}: {e}", user.id));
                }
            }
            self.report(Some(task.id), checkpoint(10, 90, done + 1, members.len()))
                .await;
        }
        Ok(summary)
    }
}
