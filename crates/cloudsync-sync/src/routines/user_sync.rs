use cloudsync_cloud::CloudError;
use cloudsync_storage::{SyncSummary, SyncTask, UserStatus};

use super::SyncRoutines;
use crate::SyncResult;
use crate::converters::identity;

impl SyncRoutines {
    /// Refreshes one local user from its provider.
    ///
    /// A user the provider no longer knows is soft-deleted.
    pub(crate) async fn user_sync(&self, task: &SyncTask) -> SyncResult<SyncSummary> {
        let mut user = self.load_user(task.target_id).await?;
        let account = self.load_account(user.cloud_account_id).await?;
        let adapter = self.factory.create_adapter(&account)?;
        self.report(Some(task.id), 30).await;

        let mut summary = SyncSummary::new();
        match adapter.get_user(&user.cloud_user_id).await {
            Ok(record) => {
                identity::refresh_user(&mut user, &record);
                user.status = UserStatus::Active;
                self.users.upsert(&user).await?;
                summary.record_success();
            }
            Err(CloudError::NotFound(_)) => {
                if user.status != UserStatus::Deleted {
                    self.users.mark_deleted(user.id).await?;
                    summary.record_deleted(1);
                    tracing::info!(
                        user_id = user.id,
                        cloud_user_id = %user.cloud_user_id,
                        provider = %user.provider,
                        "Cloud user no longer exists, marked deleted"
                    );
                } else {
                    summary.record_skip();
                }
            }
            Err(e) => return Err(e.into()),
        }
        Ok(summary)
    }
}
