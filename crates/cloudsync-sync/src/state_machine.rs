//! The sync-task lifecycle.
//!
//! ```text
//! pending -> running -> success
//!                    -> failed -> retrying -> pending   (while retry_count < max_retries)
//! ```
//!
//! [`TaskStateMachine::mark_running`] and [`TaskStateMachine::retry`] guard
//! concurrency through the store's atomic conditional updates; neither reads
//! the task before writing it.

use std::str::FromStr;

use cloudsync_core::{Provider, now_utc};
use cloudsync_storage::{
    DynSyncTaskStorage, NewSyncTask, SyncSummary, SyncTask, SyncTaskKind, SyncTaskStatus,
    TargetKind, TaskTransition, TaskTrigger,
};
use serde::Deserialize;

use crate::SyncResult;
use crate::error::SyncError;

/// Untrusted task creation request, as received from a caller.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CreateSyncTaskRequest {
    /// Filled from the cloud account when absent.
    pub tenant_id: Option<String>,
    pub task_type: Option<String>,
    pub target_type: Option<String>,
    pub target_id: Option<i64>,
    pub cloud_account_id: Option<i64>,
    pub provider: Option<String>,
    pub max_retries: Option<u32>,
    pub trigger: TaskTrigger,
}

impl CreateSyncTaskRequest {
    pub fn new(
        task_type: impl Into<String>,
        target_type: impl Into<String>,
        target_id: i64,
        cloud_account_id: i64,
        provider: impl Into<String>,
    ) -> Self {
        Self {
            task_type: Some(task_type.into()),
            target_type: Some(target_type.into()),
            target_id: Some(target_id),
            cloud_account_id: Some(cloud_account_id),
            provider: Some(provider.into()),
            ..Default::default()
        }
    }

    pub fn with_tenant(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }
}

/// Persisted state transitions of sync tasks.
pub struct TaskStateMachine {
    tasks: DynSyncTaskStorage,
    default_max_retries: u32,
}

impl TaskStateMachine {
    pub fn new(tasks: DynSyncTaskStorage, default_max_retries: u32) -> Self {
        Self {
            tasks,
            default_max_retries,
        }
    }

    pub fn storage(&self) -> &DynSyncTaskStorage {
        &self.tasks
    }

    /// Checks a raw request and turns it into a typed one.
    pub fn validate(&self, request: &CreateSyncTaskRequest) -> SyncResult<NewSyncTask> {
        let task_type: SyncTaskKind = parse_required(request.task_type.as_deref(), "task_type")?;
        let target_type: TargetKind =
            parse_required(request.target_type.as_deref(), "target_type")?;
        let provider: Provider = parse_required(request.provider.as_deref(), "provider")?;
        let target_id = request
            .target_id
            .ok_or_else(|| SyncError::validation("target_id is required"))?;
        let cloud_account_id = request
            .cloud_account_id
            .ok_or_else(|| SyncError::validation("cloud_account_id is required"))?;
        let tenant_id = request
            .tenant_id
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| SyncError::validation("tenant_id is required"))?;

        let expected = expected_target(task_type);
        if target_type != expected {
            return Err(SyncError::validation(format!(
                "{task_type} tasks target a {expected}, got {target_type}"
            )));
        }

        Ok(NewSyncTask {
            tenant_id: tenant_id.to_string(),
            task_type,
            target_type,
            target_id,
            cloud_account_id,
            provider,
            max_retries: request.max_retries.unwrap_or(self.default_max_retries),
            trigger: request.trigger,
        })
    }

    /// Validates and persists a new `pending` task.
    pub async fn create(&self, request: &CreateSyncTaskRequest) -> SyncResult<SyncTask> {
        let new_task = self.validate(request)?;
        self.create_task(new_task).await
    }

    /// Persists an already typed task.
    pub async fn create_task(&self, new_task: NewSyncTask) -> SyncResult<SyncTask> {
        let task = self.tasks.create(new_task).await?;
        tracing::info!(
            task_id = task.id,
            task_type = %task.task_type,
            target_type = %task.target_type,
            target_id = task.target_id,
            provider = %task.provider,
            trigger = ?task.trigger,
            "Created sync task"
        );
        Ok(task)
    }

    pub async fn get(&self, id: i64) -> SyncResult<SyncTask> {
        self.tasks
            .get_by_id(id)
            .await?
            .ok_or_else(|| SyncError::not_found("SyncTask", id))
    }

    /// Claims a `pending` task by moving it to `running`.
    ///
    /// # Errors
    ///
    /// - `AlreadyRunning` when the task is running (the task is left untouched)
    /// - `InvalidTransition` for any other status that is not `pending`
    pub async fn mark_running(&self, id: i64) -> SyncResult<SyncTask> {
        match self.tasks.mark_as_running(id, now_utc()).await? {
            TaskTransition::Applied(task) => {
                tracing::info!(task_id = id, "Sync task running");
                Ok(task)
            }
            TaskTransition::Refused(task) if task.status == SyncTaskStatus::Running => {
                Err(SyncError::AlreadyRunning(id))
            }
            TaskTransition::Refused(task) => Err(SyncError::InvalidTransition {
                task_id: id,
                from: task.status,
                to: SyncTaskStatus::Running,
            }),
        }
    }

    pub async fn mark_success(&self, id: i64, summary: SyncSummary) -> SyncResult<()> {
        tracing::info!(
            task_id = id,
            total = summary.total,
            succeeded = summary.succeeded,
            failed = summary.failed,
            deleted = summary.deleted,
            "Sync task succeeded"
        );
        self.tasks
            .mark_as_success(id, now_utc(), Some(summary))
            .await?;
        Ok(())
    }

    pub async fn mark_failed(&self, id: i64, message: &str) -> SyncResult<()> {
        tracing::info!(task_id = id, error = %message, "Sync task marked failed");
        self.tasks.mark_as_failed(id, now_utc(), message).await?;
        Ok(())
    }

    /// Sends a failed task back to `pending` through `retrying`.
    ///
    /// # Errors
    ///
    /// `MaxRetriesExceeded` when the task is not `failed` or its retry budget is
    /// spent; the task is left untouched.
    pub async fn retry(&self, id: i64) -> SyncResult<SyncTask> {
        let retrying = match self.tasks.increment_retry(id).await? {
            TaskTransition::Applied(task) => task,
            TaskTransition::Refused(task) => {
                return Err(SyncError::MaxRetriesExceeded {
                    task_id: id,
                    retry_count: task.retry_count,
                    max_retries: task.max_retries,
                    status: task.status,
                });
            }
        };

        self.tasks
            .update_status(id, SyncTaskStatus::Pending, retrying.error_message.clone())
            .await?;
        tracing::info!(
            task_id = id,
            retry_count = retrying.retry_count,
            max_retries = retrying.max_retries,
            "Sync task queued for retry"
        );
        self.get(id).await
    }

    /// Records progress. Failures are logged and swallowed.
    pub async fn update_progress(&self, id: i64, progress: u8) {
        let progress = progress.min(100);
        match self.tasks.update_progress(id, progress).await {
            Ok(()) => tracing::debug!(task_id = id, progress, "Sync task progress"),
            Err(e) => tracing::warn!(task_id = id, progress, error = %e, "Failed to record progress"),
        }
    }
}

impl std::fmt::Debug for TaskStateMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskStateMachine")
            .field("default_max_retries", &self.default_max_retries)
            .finish()
    }
}

/// Target kind each task kind operates on.
pub fn expected_target(kind: SyncTaskKind) -> TargetKind {
    match kind {
        SyncTaskKind::UserSync | SyncTaskKind::PermissionSync => TargetKind::User,
        SyncTaskKind::GroupSync => TargetKind::Group,
        SyncTaskKind::BatchUserSync => TargetKind::Account,
    }
}

fn parse_required<T>(value: Option<&str>, field: &str) -> SyncResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let value = value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| SyncError::validation(format!("{field} is required")))?;
    value
        .parse()
        .map_err(|e| SyncError::validation(format!("invalid {field}: {e}")))
}
