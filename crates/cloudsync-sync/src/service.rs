//! The operations the sync core exposes to its callers.

use std::sync::Arc;

use cloudsync_cloud::{AdapterFactory, InstanceFilter};
use cloudsync_core::{AccountStatus, CloudAccount, ResourceKind};
use cloudsync_storage::{
    AccountFilter, NewSyncTask, PolicyRef, SyncSummary, SyncTask, SyncTaskFilter, SyncTaskKind,
    SyncTaskStatus, TargetKind, TaskTrigger,
};
use futures_util::StreamExt;
use futures_util::stream;
use serde::Serialize;

use crate::SyncResult;
use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::executor::TaskExecutor;
use crate::propagation::{PermissionPropagator, PolicyUpdateResult};
use crate::queue::{TaskQueue, WorkerPool};
use crate::reconcile::{ReconcileOutcome, ReconcileRequest};
use crate::routines::SyncRoutines;
use crate::state_machine::{CreateSyncTaskRequest, TaskStateMachine};
use crate::stores::SyncStores;

/// Tally of one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Tasks the sweep picked up.
    pub picked: usize,
    /// Tasks that ended in `success`.
    pub succeeded: usize,
    /// Tasks that ended in `failed`, or could not be moved at all.
    pub failed: usize,
    /// Tasks another executor got to first.
    pub skipped: usize,
}

/// Facade over the state machine, executor, propagator and queue.
pub struct SyncService {
    stores: SyncStores,
    factory: Arc<AdapterFactory>,
    config: Arc<SyncConfig>,
    machine: Arc<TaskStateMachine>,
    routines: Arc<SyncRoutines>,
    executor: Arc<TaskExecutor>,
    propagator: PermissionPropagator,
    queue: Option<TaskQueue>,
}

impl SyncService {
    /// A service without background workers.
    ///
    /// Tasks run only through [`Self::execute_sync_task`] and the sweeps;
    /// asynchronous submission fails with `QueueClosed`.
    pub fn new(stores: SyncStores, factory: Arc<AdapterFactory>, config: SyncConfig) -> Self {
        let config = Arc::new(config);
        let machine = Arc::new(TaskStateMachine::new(
            stores.tasks.clone(),
            config.default_max_retries,
        ));
        let routines = Arc::new(SyncRoutines::new(
            &stores,
            factory.clone(),
            machine.clone(),
            config.clone(),
        ));
        let executor = Arc::new(TaskExecutor::new(
            machine.clone(),
            routines.clone(),
            config.clone(),
        ));
        let propagator = PermissionPropagator::new(&stores, machine.clone(), config.clone());
        Self {
            stores,
            factory,
            config,
            machine,
            routines,
            executor,
            propagator,
            queue: None,
        }
    }

    /// A service whose submissions run on a pool of `config.workers` workers.
    pub fn start(
        stores: SyncStores,
        factory: Arc<AdapterFactory>,
        config: SyncConfig,
    ) -> (Arc<Self>, WorkerPool) {
        let mut service = Self::new(stores, factory, config);
        let (queue, pool) = TaskQueue::start(
            service.executor.clone(),
            service.config.workers,
            service.config.queue_capacity,
        );
        service.queue = Some(queue);
        (Arc::new(service), pool)
    }

    pub fn config(&self) -> &Arc<SyncConfig> {
        &self.config
    }

    pub fn factory(&self) -> &Arc<AdapterFactory> {
        &self.factory
    }

    pub fn executor(&self) -> &Arc<TaskExecutor> {
        &self.executor
    }

    /// Validates and persists a task in `pending`.
    ///
    /// A request without a tenant inherits the cloud account's tenant.
    pub async fn create_sync_task(&self, request: CreateSyncTaskRequest) -> SyncResult<SyncTask> {
        let mut request = request;
        if request.tenant_id.as_deref().is_none_or(|t| t.trim().is_empty()) {
            let account_id = request
                .cloud_account_id
                .ok_or_else(|| SyncError::validation("cloud_account_id is required"))?;
            let account = self.load_account(account_id).await?;
            request.tenant_id = Some(account.tenant_id);
        }
        self.machine.create(&request).await
    }

    /// Runs a pending task now and returns it in its final state.
    pub async fn execute_sync_task(&self, task_id: i64) -> SyncResult<SyncTask> {
        self.executor.execute(task_id).await
    }

    /// Hands a task to the worker pool and returns immediately.
    pub async fn submit_sync_task(&self, task_id: i64) -> SyncResult<()> {
        match &self.queue {
            Some(queue) => queue.submit(task_id).await,
            None => Err(SyncError::QueueClosed),
        }
    }

    pub async fn get_sync_task_status(&self, task_id: i64) -> SyncResult<SyncTask> {
        self.machine.get(task_id).await
    }

    pub async fn list_sync_tasks(&self, filter: &SyncTaskFilter) -> SyncResult<Vec<SyncTask>> {
        Ok(self.stores.tasks.list(filter).await?)
    }

    /// Moves a failed task back to `pending` and queues it when workers run.
    pub async fn retry_sync_task(&self, task_id: i64) -> SyncResult<SyncTask> {
        let task = self.machine.retry(task_id).await?;
        self.dispatch(task.id).await;
        Ok(task)
    }

    /// Replaces a group's policies and fans the change out to its members.
    pub async fn update_group_policies(
        &self,
        group_id: i64,
        policies: Vec<PolicyRef>,
        operator: Option<String>,
    ) -> SyncResult<PolicyUpdateResult> {
        let result = self
            .propagator
            .update_group_policies(group_id, policies, operator)
            .await?;
        for task in &result.tasks {
            self.dispatch(task.id).await;
        }
        Ok(result)
    }

    /// Creates the permission-sync tasks for a group edit.
    pub async fn sync_permission_changes(
        &self,
        group_id: i64,
        user_ids: &[i64],
    ) -> SyncResult<Vec<SyncTask>> {
        let tasks = self
            .propagator
            .sync_permission_changes(group_id, user_ids)
            .await?;
        for task in &tasks {
            self.dispatch(task.id).await;
        }
        Ok(tasks)
    }

    /// Executes up to `sweep_batch_size` pending tasks, `max_concurrent` at a time.
    pub async fn process_pending_tasks(&self, max_concurrent: usize) -> SyncResult<SweepReport> {
        let pending = self
            .stores
            .tasks
            .list_pending_tasks(self.config.sweep_batch_size)
            .await?;
        let ids: Vec<i64> = pending.iter().map(|t| t.id).collect();
        Ok(self.execute_all(ids, max_concurrent).await)
    }

    /// Retries failed tasks that still have budget and executes them.
    pub async fn process_failed_tasks(&self) -> SyncResult<SweepReport> {
        let failed = self
            .stores
            .tasks
            .list_failed_retryable_tasks(self.config.sweep_batch_size)
            .await?;

        let mut report = SweepReport::default();
        let mut retried = Vec::with_capacity(failed.len());
        for task in failed {
            match self.machine.retry(task.id).await {
                Ok(task) => retried.push(task.id),
                Err(e) => {
                    tracing::warn!(task_id = task.id, error = %e, "Could not retry failed task");
                    report.picked += 1;
                    report.failed += 1;
                }
            }
        }

        let executed = self.execute_all(retried, self.config.max_concurrent).await;
        report.picked += executed.picked;
        report.succeeded += executed.succeeded;
        report.failed += executed.failed;
        report.skipped += executed.skipped;
        Ok(report)
    }

    /// Creates a scheduled batch sync for every active account that has none
    /// pending or running.
    pub async fn schedule_account_syncs(&self) -> SyncResult<Vec<SyncTask>> {
        let accounts = self
            .stores
            .accounts
            .list(&AccountFilter {
                status: Some(AccountStatus::Active),
                ..Default::default()
            })
            .await?;

        let mut created = Vec::new();
        for account in accounts.iter().filter(|a| a.is_active()) {
            if self.has_open_account_sync(account.id).await? {
                tracing::debug!(account_id = account.id, "Account sync already queued");
                continue;
            }
            let task = self
                .machine
                .create_task(self.account_task(account, TaskTrigger::Scheduled))
                .await?;
            self.dispatch(task.id).await;
            created.push(task);
        }
        Ok(created)
    }

    /// Checks an account's credentials against its provider.
    pub async fn validate_account(&self, account_id: i64) -> SyncResult<()> {
        let account = self.load_account(account_id).await?;
        let adapter = self.factory.create_adapter(&account)?;
        let deadline = self.config.validation_timeout();
        match tokio::time::timeout(deadline, adapter.validate_credentials()).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(SyncError::timeout("validate_credentials", deadline)),
        }
    }

    /// Runs the batch account sync inline and returns its summary.
    ///
    /// Shares its routine with batch-user-sync tasks but records no task.
    pub async fn sync_users(&self, account_id: i64) -> SyncResult<SyncSummary> {
        let account = self.load_account(account_id).await?;
        let deadline = self.config.timeout_for(SyncTaskKind::BatchUserSync);
        match tokio::time::timeout(deadline, self.routines.sync_account(&account, None)).await {
            Ok(result) => result,
            Err(_) => Err(SyncError::timeout("sync_users", deadline)),
        }
    }

    /// Creates a batch-user-sync task, queues it and returns it right away.
    pub async fn sync_users_async(&self, account_id: i64) -> SyncResult<SyncTask> {
        let account = self.load_account(account_id).await?;
        let Some(queue) = &self.queue else {
            return Err(SyncError::QueueClosed);
        };
        let task = self
            .machine
            .create_task(self.account_task(&account, TaskTrigger::Manual))
            .await?;
        queue.submit(task.id).await?;
        Ok(task)
    }

    /// Reconciles a single (account, kind, region) scope outside any task.
    pub async fn reconcile(
        &self,
        account_id: i64,
        kind: ResourceKind,
        region: &str,
        filter: Option<&InstanceFilter>,
    ) -> SyncResult<ReconcileOutcome> {
        let account = self.load_account(account_id).await?;
        let adapter = self.factory.create_adapter(&account)?;
        let mut request = ReconcileRequest::new(&account, region);
        if let Some(filter) = filter {
            request = request.with_filter(filter);
        }
        self.routines
            .engine()
            .reconcile_kind(kind, &adapter, &request)
            .await
    }

    /// Drops the cached adapter of an account, e.g. after credential rotation.
    pub fn invalidate_account(&self, account: &CloudAccount) -> bool {
        self.factory.clear_account_cache(account.provider, account.id)
    }

    async fn load_account(&self, account_id: i64) -> SyncResult<CloudAccount> {
        self.stores
            .accounts
            .get_by_id(account_id)
            .await?
            .ok_or_else(|| SyncError::not_found("CloudAccount", account_id))
    }

    fn account_task(&self, account: &CloudAccount, trigger: TaskTrigger) -> NewSyncTask {
        NewSyncTask {
            tenant_id: account.tenant_id.clone(),
            task_type: SyncTaskKind::BatchUserSync,
            target_type: TargetKind::Account,
            target_id: account.id,
            cloud_account_id: account.id,
            provider: account.provider,
            max_retries: self.config.default_max_retries,
            trigger,
        }
    }

    async fn has_open_account_sync(&self, account_id: i64) -> SyncResult<bool> {
        let tasks = self
            .stores
            .tasks
            .list(&SyncTaskFilter {
                task_type: Some(SyncTaskKind::BatchUserSync),
                cloud_account_id: Some(account_id),
                ..Default::default()
            })
            .await?;
        Ok(tasks.iter().any(|t| {
            matches!(
                t.status,
                SyncTaskStatus::Pending | SyncTaskStatus::Running | SyncTaskStatus::Retrying
            )
        }))
    }

    /// Queues a task when workers run; otherwise the pending sweep picks it up.
    async fn dispatch(&self, task_id: i64) {
        let Some(queue) = &self.queue else {
            return;
        };
        if let Err(e) = queue.submit(task_id).await {
            tracing::warn!(task_id, error = %e, "Failed to queue sync task");
        }
    }

    async fn execute_all(&self, ids: Vec<i64>, max_concurrent: usize) -> SweepReport {
        let mut report = SweepReport {
            picked: ids.len(),
            ..Default::default()
        };
        let executor = &self.executor;
        let results: Vec<SyncResult<SyncTask>> = stream::iter(ids)
            .map(|id| async move { executor.execute(id).await })
            .buffer_unordered(max_concurrent.max(1))
            .collect()
            .await;

        for result in results {
            match result {
                Ok(task) if task.status == SyncTaskStatus::Success => report.succeeded += 1,
                Ok(_) => report.failed += 1,
                Err(SyncError::AlreadyRunning(_) | SyncError::InvalidTransition { .. }) => {
                    report.skipped += 1
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Sweep could not execute sync task");
                    report.failed += 1;
                }
            }
        }
        report
    }
}

impl std::fmt::Debug for SyncService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncService")
            .field("factory", &self.factory)
            .field("config", &self.config)
            .field("workers", &self.queue.is_some())
            .finish_non_exhaustive()
    }
}
