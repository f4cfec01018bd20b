//! Runs one sync task end-to-end.

use std::sync::Arc;

use cloudsync_storage::SyncTask;
use tracing::Instrument;

use crate::SyncResult;
use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::routines::SyncRoutines;
use crate::state_machine::TaskStateMachine;

/// Drives a task through `running` to `success` or `failed`.
///
/// Every execution path (inline, queue worker, periodic sweep) ends up in
/// [`TaskExecutor::execute`].
pub struct TaskExecutor {
    machine: Arc<TaskStateMachine>,
    routines: Arc<SyncRoutines>,
    config: Arc<SyncConfig>,
}

impl TaskExecutor {
    pub fn new(
        machine: Arc<TaskStateMachine>,
        routines: Arc<SyncRoutines>,
        config: Arc<SyncConfig>,
    ) -> Self {
        Self {
            machine,
            routines,
            config,
        }
    }

    /// Executes a pending task and returns it in its final state.
    ///
    /// A routine failure or an expired deadline is not an `Err`: it is recorded
    /// on the returned task as `failed` with the error text.
    ///
    /// # Errors
    ///
    /// - `NotFound` when the task does not exist
    /// - `AlreadyRunning` when the task is running (the task is left untouched)
    /// - `InvalidTransition` when the task is neither pending nor running
    /// - `Storage` when the final status cannot be written
    pub async fn execute(&self, task_id: i64) -> SyncResult<SyncTask> {
        let task = self.machine.mark_running(task_id).await?;
        let span = tracing::info_span!(
            "sync_task",
            task_id,
            kind = %task.task_type,
            provider = %task.provider,
            target_id = task.target_id
        );
        self.run_to_completion(task).instrument(span).await
    }

    async fn run_to_completion(&self, task: SyncTask) -> SyncResult<SyncTask> {
        let deadline = self.config.timeout_for(task.task_type);
        let outcome = match tokio::time::timeout(deadline, self.routines.run(&task)).await {
            Ok(result) => result,
            Err(_) => Err(SyncError::timeout(task.task_type.to_string(), deadline)),
        };

        match outcome {
            Ok(summary) => {
                if summary.is_partial() {
                    tracing::warn!(
                        failed = summary.failed,
                        total = summary.total,
                        "Sync task completed with per-item failures"
                    );
                }
                self.machine.mark_success(task.id, summary).await?;
            }
            Err(e) => {
                tracing::error!(
                    task_id = task.id,
                    category = %e.category(),
                    error = %e,
                    "Sync task execution failed"
                );
                self.machine.mark_failed(task.id, &e.to_string()).await?;
            }
        }
        self.machine.get(task.id).await
    }
}

impl std::fmt::Debug for TaskExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskExecutor")
            .field("routines", &self.routines)
            .finish_non_exhaustive()
    }
}
