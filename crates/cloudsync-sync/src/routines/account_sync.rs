use std::collections::HashSet;

use cloudsync_cloud::CloudAdapter;
use cloudsync_core::{CloudAccount, ResourceKind};
use cloudsync_storage::{SyncSummary, SyncTask, UserFilter, UserStatus};

use super::{SyncRoutines, checkpoint};
use crate::SyncResult;
use crate::converters::identity;
use crate::pagination::Paginator;
use crate::reconcile::ReconcileRequest;

impl SyncRoutines {
    pub(crate) async fn batch_user_sync(&self, task: &SyncTask) -> SyncResult<SyncSummary> {
        let account = self.load_account(task.cloud_account_id).await?;
        self.sync_account(&account, Some(task.id)).await
    }

    /// Full sweep of one account: its users, then every supported asset kind in
    /// every configured region.
    ///
    /// A kind or region that fails is recorded in the summary and the sweep
    /// moves on. Only adapter construction and account-wide rejections
    /// (credentials, disabled account) fail the sweep.
    pub async fn sync_account(
        &self,
        account: &CloudAccount,
        task_id: Option<i64>,
    ) -> SyncResult<SyncSummary> {
        let adapter = self.factory.create_adapter(account)?;
        self.report(task_id, 10).await;

        let mut summary = SyncSummary::new();

        // 1. Identities
        if adapter.supports(ResourceKind::Identity) {
            match self.reconcile_users(&adapter, account).await {
                Ok(users) => summary.merge(users),
                Err(e) if e.is_account_fatal() => return Err(e),
                Err(e) => {
                    tracing::warn!(account_id = account.id, error = %e, "User reconciliation failed");
                    summary.record_failure(format!("identity: {e}"));
                }
            }
        } else {
            summary.record_skip();
        }
        self.report(task_id, 20).await;

        // 2. Assets, kind by kind and region by region
        let regions = account_regions(account);
        if regions.is_empty() {
            tracing::warn!(account_id = account.id, "Account has no regions, skipping assets");
        }
        let kinds: Vec<ResourceKind> = ResourceKind::ASSETS
            .into_iter()
            .filter(|kind| {
                let supported = adapter.supports(*kind);
                if !supported {
                    summary.record_skip();
                }
                supported
            })
            .collect();

        for (done, kind) in kinds.iter().enumerate() {
            self.report(task_id, checkpoint(40, 90, done, kinds.len()))
                .await;
            for region in &regions {
                let request = ReconcileRequest::new(account, region);
                match self.engine.reconcile_kind(*kind, &adapter, &request).await {
                    Ok(outcome) => outcome.record_into(&mut summary),
                    Err(e) if e.is_account_fatal() => return Err(e),
                    Err(e) => {
                        tracing::warn!(
                            account_id = account.id,
                            kind = %kind,
                            region = %region,
                            error = %e,
                            "Asset reconciliation failed"
                        );
                        summary.record_failure(format!("{kind}/{region}: {e}"));
                    }
                }
            }
        }
        self.report(task_id, 90).await;

        tracing::info!(
            account_id = account.id,
            provider = %account.provider,
            total = summary.total,
            failed = summary.failed,
            deleted = summary.deleted,
            "Account sync finished"
        );
        Ok(summary)
    }

    /// Mirrors the provider's user list into the local store.
    ///
    /// Local users of the account missing upstream are soft-deleted, and only
    /// when the listing was complete.
    async fn reconcile_users(
        &self,
        adapter: &CloudAdapter,
        account: &CloudAccount,
    ) -> SyncResult<SyncSummary> {
        let mut pager = Paginator::new(self.config.list_page_size, self.config.max_pages);
        let mut records = Vec::new();
        while let Some(request) = pager.next_request() {
            let page = adapter.list_users(&request).await?;
            records.extend(page.items);
            pager.advance(page.next_token);
        }

        let mut summary = SyncSummary::new();
        let mut upstream = HashSet::with_capacity(records.len());
        for record in &records {
            upstream.insert(record.user_id.as_str());
            let user = identity::cloud_user(record, account);
            match self.users.upsert(&user).await {
                Ok(_) => summary.record_success(),
                Err(e) => {
                    tracing::warn!(
                        account_id = account.id,
                        cloud_user_id = %record.user_id,
                        error = %e,
                        "Failed to upsert cloud user"
                    );
                    summary.record_failure(format!("user {}: {e}", record.user_id));
                }
            }
        }

        if !pager.is_complete() {
            tracing::warn!(account_id = account.id, "Incomplete user listing, skipping deletion");
            return Ok(summary);
        }

        let local = self
            .users
            .list(&UserFilter {
                tenant_id: Some(account.tenant_id.clone()),
                provider: Some(account.provider),
                cloud_account_id: Some(account.id),
                ..Default::default()
            })
            .await?;
        for user in local
            .iter()
            .filter(|u| u.status != UserStatus::Deleted && !upstream.contains(u.cloud_user_id.as_str()))
        {
            match self.users.mark_deleted(user.id).await {
                Ok(()) => summary.record_deleted(1),
                Err(e) => {
                    tracing::warn!(user_id = user.id, error = %e, "Failed to mark cloud user deleted");
                    summary.record_failure(format!("user {}: {e}", user.cloud_user_id));
                }
            }
        }
        Ok(summary)
    }
}

/// Regions to sweep: the configured list, else the default region.
fn account_regions(account: &CloudAccount) -> Vec<String> {
    if !account.regions.is_empty() {
        return account.regions.clone();
    }
    account
        .primary_region()
        .map(|r| vec![r.to_string()])
        .unwrap_or_default()
}
