//! Diff-based reconcile-and-persist, one engine for every resource kind.

use std::collections::HashSet;

use cloudsync_cloud::{
    CacheInstance, CloudAdapter, CloudResult, ComputeInstance, DocumentDbInstance,
    FileStorageInstance, InstanceFilter, MessageQueueInstance, ObjectStorageBucket,
    PublicIpInstance, RelationalDbInstance, SearchClusterInstance, VpcInstance,
};
use cloudsync_core::{CloudAccount, ResourceKind};
use cloudsync_storage::{DynAssetStorage, SyncSummary};
use serde::Serialize;

use crate::SyncResult;
use crate::converters::{AssetConverter, AssetScope, model_uid};
use crate::error::SyncError;
use crate::pagination::Paginator;

/// One `(tenant, account, kind, region)` reconciliation.
#[derive(Debug, Clone, Copy)]
pub struct ReconcileRequest<'a> {
    pub tenant_id: &'a str,
    pub account: &'a CloudAccount,
    pub region: &'a str,
    /// Narrows the listing. A filtered run upserts only and never deletes.
    pub filter: Option<&'a InstanceFilter>,
}

impl<'a> ReconcileRequest<'a> {
    pub fn new(account: &'a CloudAccount, region: &'a str) -> Self {
        Self {
            tenant_id: &account.tenant_id,
            account,
            region,
            filter: None,
        }
    }

    pub fn with_filter(mut self, filter: &'a InstanceFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    fn scope(&self) -> AssetScope<'a> {
        AssetScope {
            tenant_id: self.tenant_id,
            account: self.account,
            region: self.region,
        }
    }
}

/// Result of one reconciliation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileOutcome {
    /// Records the provider reported.
    pub listed: usize,
    /// Records upserted successfully.
    pub synced: usize,
    /// Local records removed because the provider no longer lists them.
    pub deleted: u64,
    /// Records whose upsert failed.
    pub failed: usize,
    /// False when the listing was cut short and deletion was skipped.
    pub complete: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl ReconcileOutcome {
    /// Folds this run into a task summary.
    pub fn record_into(&self, summary: &mut SyncSummary) {
        summary.succeeded += self.synced as u64;
        summary.total += self.synced as u64;
        for error in &self.errors {
            summary.record_failure(error.clone());
        }
        summary.record_deleted(self.deleted);
    }
}

/// Runs the reconcile algorithm against an [`AssetStorage`](cloudsync_storage::AssetStorage).
#[derive(Clone)]
pub struct ReconcileEngine {
    assets: DynAssetStorage,
    page_size: u32,
    max_pages: usize,
}

impl ReconcileEngine {
    pub fn new(assets: DynAssetStorage, page_size: u32, max_pages: usize) -> Self {
        Self {
            assets,
            page_size,
            max_pages,
        }
    }

    /// Reconciles one asset kind, dispatching to its record type.
    pub async fn reconcile_kind(
        &self,
        kind: ResourceKind,
        adapter: &CloudAdapter,
        request: &ReconcileRequest<'_>,
    ) -> SyncResult<ReconcileOutcome> {
        match kind {
            ResourceKind::Compute => self.reconcile::<ComputeInstance>(adapter, request).await,
            ResourceKind::RelationalDb => {
                self.reconcile::<RelationalDbInstance>(adapter, request).await
            }
            ResourceKind::Cache => self.reconcile::<CacheInstance>(adapter, request).await,
            ResourceKind::DocumentDb => {
                self.reconcile::<DocumentDbInstance>(adapter, request).await
            }
            ResourceKind::Vpc => self.reconcile::<VpcInstance>(adapter, request).await,
            ResourceKind::PublicIp => self.reconcile::<PublicIpInstance>(adapter, request).await,
            ResourceKind::FileStorage => {
                self.reconcile::<FileStorageInstance>(adapter, request).await
            }
            ResourceKind::ObjectStorage => {
                self.reconcile::<ObjectStorageBucket>(adapter, request).await
            }
            ResourceKind::MessageQueue => {
                self.reconcile::<MessageQueueInstance>(adapter, request).await
            }
            ResourceKind::SearchCluster => {
                self.reconcile::<SearchClusterInstance>(adapter, request).await
            }
            ResourceKind::Identity => Err(SyncError::validation(
                "identity is reconciled by the account user sync, not the asset engine",
            )),
        }
    }

    /// Lists `T` in the request's region and makes the local store match.
    ///
    /// Listing errors are returned and leave the store untouched. Per-record
    /// upsert failures and a failed delete batch are logged and counted, never
    /// returned.
    pub async fn reconcile<T: AssetConverter>(
        &self,
        adapter: &CloudAdapter,
        request: &ReconcileRequest<'_>,
    ) -> SyncResult<ReconcileOutcome> {
        let model = model_uid::<T>();
        let account_id = request.account.id;

        // 1. Provider-side view of the scope
        let (records, complete) = self.list_all::<T>(adapter, request).await?;
        let mut outcome = ReconcileOutcome {
            listed: records.len(),
            complete,
            ..Default::default()
        };

        // 2-4. Diff against the local view and remove what disappeared
        if request.filter.is_none() {
            let local_ids = self
                .assets
                .list_asset_ids_by_region(request.tenant_id, model, account_id, request.region)
                .await?;
            let cloud_ids: HashSet<&str> = records.iter().map(|r| r.meta().id.as_str()).collect();
            let to_delete: Vec<String> = local_ids
                .into_iter()
                .filter(|id| !cloud_ids.contains(id.as_str()))
                .collect();

            if !to_delete.is_empty() {
                if complete {
                    match self
                        .assets
                        .delete_by_asset_ids(request.tenant_id, model, &to_delete)
                        .await
                    {
                        Ok(deleted) => outcome.deleted = deleted,
                        Err(e) => tracing::warn!(
                            model_uid = model,
                            account_id,
                            region = request.region,
                            count = to_delete.len(),
                            error = %e,
                            "Failed to delete stale assets"
                        ),
                    }
                } else {
                    tracing::warn!(
                        model_uid = model,
                        account_id,
                        region = request.region,
                        stale = to_delete.len(),
                        "Incomplete listing, skipping deletion"
                    );
                }
            }
        }

        // 5. Upsert every provider record on its own
        let scope = request.scope();
        for record in &records {
            let asset = record.to_asset(&scope);
            match self.assets.upsert(&asset).await {
                Ok(()) => outcome.synced += 1,
                Err(e) => {
                    tracing::warn!(
                        model_uid = model,
                        asset_id = %asset.asset_id,
                        region = request.region,
                        error = %e,
                        "Failed to upsert asset"
                    );
                    outcome.failed += 1;
                    outcome
                        .errors
                        .push(format!("{model}/{}: {e}", asset.asset_id));
                }
            }
        }

        tracing::debug!(
            model_uid = model,
            account_id,
            region = request.region,
            listed = outcome.listed,
            synced = outcome.synced,
            deleted = outcome.deleted,
            failed = outcome.failed,
            "Reconciled assets"
        );
        Ok(outcome)
    }

    async fn list_all<T: AssetConverter>(
        &self,
        adapter: &CloudAdapter,
        request: &ReconcileRequest<'_>,
    ) -> CloudResult<(Vec<T>, bool)> {
        let mut pager = Paginator::new(self.page_size, self.max_pages);
        let mut records = Vec::new();
        while let Some(page_request) = pager.next_request() {
            let page = match request.filter {
                Some(filter) => {
                    adapter
                        .list_instances_with_filter::<T>(request.region, filter, &page_request)
                        .await?
                }
                None => {
                    adapter
                        .list_instances::<T>(request.region, &page_request)
                        .await?
                }
            };
            records.extend(page.items);
            pager.advance(page.next_token);
        }
        Ok((records, pager.is_complete()))
    }
}

impl std::fmt::Debug for ReconcileEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconcileEngine")
            .field("page_size", &self.page_size)
            .field("max_pages", &self.max_pages)
            .finish()
    }
}
