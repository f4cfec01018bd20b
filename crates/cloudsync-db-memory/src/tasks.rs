use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use cloudsync_storage::{
    NewSyncTask, StorageError, SyncSummary, SyncTask, SyncTaskFilter, SyncTaskStatus,
    SyncTaskStorage, TaskTransition,
};
use dashmap::DashMap;
use time::OffsetDateTime;

use crate::paginate;

const ENTITY: &str = "SyncTask";

/// In-memory sync-task store.
///
/// Every mutation runs under the map's per-entry write guard, which makes
/// [`SyncTaskStorage::mark_as_running`] and [`SyncTaskStorage::increment_retry`]
/// single conditional updates.
#[derive(Debug)]
pub struct InMemorySyncTaskStorage {
    data: DashMap<i64, SyncTask>,
    next_id: AtomicI64,
}

impl Default for InMemorySyncTaskStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemorySyncTaskStorage {
    pub fn new() -> Self {
        Self {
            data: DashMap::new(),
            next_id: AtomicI64::new(1),
        }
    }

    fn with_task<R>(
        &self,
        id: i64,
        f: impl FnOnce(&mut SyncTask) -> R,
    ) -> Result<R, StorageError> {
        let mut entry = self
            .data
            .get_mut(&id)
            .ok_or_else(|| StorageError::not_found(ENTITY, id))?;
        Ok(f(entry.value_mut()))
    }

    fn collect_sorted(
        &self,
        mut predicate: impl FnMut(&SyncTask) -> bool,
        newest_first: bool,
    ) -> Vec<SyncTask> {
        let mut tasks: Vec<SyncTask> = self
            .data
            .iter()
            .filter(|entry| predicate(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        if newest_first {
            tasks.sort_by(|a, b| b.id.cmp(&a.id));
        } else {
            tasks.sort_by_key(|t| t.id);
        }
        tasks
    }
}

#[async_trait]
impl SyncTaskStorage for InMemorySyncTaskStorage {
    async fn create(&self, task: NewSyncTask) -> Result<SyncTask, StorageError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let now = OffsetDateTime::now_utc();
        let stored = SyncTask {
            id,
            tenant_id: task.tenant_id,
            task_type: task.task_type,
            target_type: task.target_type,
            target_id: task.target_id,
            cloud_account_id: task.cloud_account_id,
            provider: task.provider,
            status: SyncTaskStatus::Pending,
            progress: 0,
            retry_count: 0,
            max_retries: task.max_retries,
            error_message: None,
            trigger: task.trigger,
            result: None,
            start_time: None,
            end_time: None,
            created_at: now,
            updated_at: now,
        };
        self.data.insert(id, stored.clone());
        Ok(stored)
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<SyncTask>, StorageError> {
        Ok(self.data.get(&id).map(|entry| entry.value().clone()))
    }

    async fn list(&self, filter: &SyncTaskFilter) -> Result<Vec<SyncTask>, StorageError> {
        let tasks = self.collect_sorted(|t| filter.matches(t), true);
        Ok(paginate(tasks, filter.offset, filter.limit))
    }

    async fn update_status(
        &self,
        id: i64,
        status: SyncTaskStatus,
        error_message: Option<String>,
    ) -> Result<(), StorageError> {
        self.with_task(id, |task| {
            task.status = status;
            task.error_message = error_message;
            task.updated_at = OffsetDateTime::now_utc();
        })
    }

    async fn update_progress(&self, id: i64, progress: u8) -> Result<(), StorageError> {
        let progress = progress.min(100);
        self.with_task(id, |task| {
            if task.status == SyncTaskStatus::Running && progress < task.progress {
                return;
            }
            task.progress = progress;
            task.updated_at = OffsetDateTime::now_utc();
        })
    }

    async fn mark_as_running(
        &self,
        id: i64,
        start_time: OffsetDateTime,
    ) -> Result<TaskTransition, StorageError> {
        self.with_task(id, |task| {
            if task.status != SyncTaskStatus::Pending {
                return TaskTransition::Refused(task.clone());
            }
            task.status = SyncTaskStatus::Running;
            task.progress = 0;
            task.error_message = None;
            task.start_time = Some(start_time);
            task.end_time = None;
            task.updated_at = OffsetDateTime::now_utc();
            TaskTransition::Applied(task.clone())
        })
    }

    async fn mark_as_success(
        &self,
        id: i64,
        end_time: OffsetDateTime,
        summary: Option<SyncSummary>,
    ) -> Result<(), StorageError> {
        self.with_task(id, |task| {
            task.status = SyncTaskStatus::Success;
            task.progress = 100;
            task.error_message = None;
            task.result = summary;
            task.end_time = Some(end_time);
            task.updated_at = OffsetDateTime::now_utc();
        })
    }

    async fn mark_as_failed(
        &self,
        id: i64,
        end_time: OffsetDateTime,
        message: &str,
    ) -> Result<(), StorageError> {
        self.with_task(id, |task| {
            task.status = SyncTaskStatus::Failed;
            task.error_message = Some(message.to_string());
            task.end_time = Some(end_time);
            task.updated_at = OffsetDateTime::now_utc();
        })
    }

    async fn increment_retry(&self, id: i64) -> Result<TaskTransition, StorageError> {
        self.with_task(id, |task| {
            if !task.can_retry() {
                return TaskTransition::Refused(task.clone());
            }
            task.retry_count += 1;
            task.status = SyncTaskStatus::Retrying;
            task.updated_at = OffsetDateTime::now_utc();
            TaskTransition::Applied(task.clone())
        })
    }

    async fn list_pending_tasks(&self, limit: usize) -> Result<Vec<SyncTask>, StorageError> {
        let tasks = self.collect_sorted(|t| t.status == SyncTaskStatus::Pending, false);
        Ok(paginate(tasks, None, Some(limit)))
    }

    async fn list_failed_retryable_tasks(
        &self,
        limit: usize,
    ) -> Result<Vec<SyncTask>, StorageError> {
        let tasks = self.collect_sorted(|t| t.can_retry(), false);
        Ok(paginate(tasks, None, Some(limit)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cloudsync_core::Provider;
    use cloudsync_storage::{DEFAULT_MAX_RETRIES, SyncTaskKind, TargetKind, TaskTrigger};
    use std::sync::Arc;

    fn new_task() -> NewSyncTask {
        NewSyncTask {
            tenant_id: "t1".into(),
            task_type: SyncTaskKind::UserSync,
            target_type: TargetKind::User,
            target_id: 5,
            cloud_account_id: 9,
            provider: Provider::Aliyun,
            max_retries: DEFAULT_MAX_RETRIES,
            trigger: TaskTrigger::Manual,
        }
    }

    #[tokio::test]
    async fn test_create_starts_pending() {
        let storage = InMemorySyncTaskStorage::new();
        let task = storage.create(new_task()).await.unwrap();
        assert_eq!(task.id, 1);
        assert_eq!(task.status, SyncTaskStatus::Pending);
        assert_eq!(task.progress, 0);
        assert_eq!(task.retry_count, 0);
        assert!(storage.get_by_id(2).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_mark_as_running_only_once() {
        let storage = Arc::new(InMemorySyncTaskStorage::new());
        let task = storage.create(new_task()).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let storage = storage.clone();
            handles.push(tokio::spawn(async move {
                storage
                    .mark_as_running(task.id, OffsetDateTime::now_utc())
                    .await
                    .unwrap()
            }));
        }
        let mut winners = 0;
        for handle in handles {
            if matches!(handle.await.unwrap(), TaskTransition::Applied(_)) {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn test_mark_as_running_refuses_finished_tasks() {
        let storage = InMemorySyncTaskStorage::new();
        let task = storage.create(new_task()).await.unwrap();
        storage
            .mark_as_running(task.id, OffsetDateTime::now_utc())
            .await
            .unwrap();
        storage
            .mark_as_success(task.id, OffsetDateTime::now_utc(), None)
            .await
            .unwrap();
        let done = storage.get_by_id(task.id).await.unwrap().unwrap();

        let outcome = storage
            .mark_as_running(task.id, OffsetDateTime::now_utc())
            .await
            .unwrap();
        assert_eq!(outcome, TaskTransition::Refused(done.clone()));
        assert_eq!(storage.get_by_id(task.id).await.unwrap().unwrap(), done);

        let failed = storage.create(new_task()).await.unwrap();
        storage
            .mark_as_failed(failed.id, OffsetDateTime::now_utc(), "boom")
            .await
            .unwrap();
        assert!(matches!(
            storage
                .mark_as_running(failed.id, OffsetDateTime::now_utc())
                .await
                .unwrap(),
            TaskTransition::Refused(ref t) if t.status == SyncTaskStatus::Failed
        ));
    }

    #[tokio::test]
    async fn test_concurrent_retries_stay_within_budget() {
        let storage = Arc::new(InMemorySyncTaskStorage::new());
        let mut one_retry = new_task();
        one_retry.max_retries = 1;
        let task = storage.create(one_retry).await.unwrap();
        storage
            .mark_as_failed(task.id, OffsetDateTime::now_utc(), "boom")
            .await
            .unwrap();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let storage = storage.clone();
            handles.push(tokio::spawn(async move {
                storage.increment_retry(task.id).await.unwrap()
            }));
        }
        let mut applied = 0;
        for handle in handles {
            if matches!(handle.await.unwrap(), TaskTransition::Applied(_)) {
                applied += 1;
            }
        }
        assert_eq!(applied, 1);
        let current = storage.get_by_id(task.id).await.unwrap().unwrap();
        assert_eq!(current.retry_count, 1);
        assert_eq!(current.status, SyncTaskStatus::Retrying);
    }

    #[tokio::test]
    async fn test_progress_is_clamped_and_monotonic_while_running() {
        let storage = InMemorySyncTaskStorage::new();
        let task = storage.create(new_task()).await.unwrap();
        storage
            .mark_as_running(task.id, OffsetDateTime::now_utc())
            .await
            .unwrap();

        storage.update_progress(task.id, 40).await.unwrap();
        storage.update_progress(task.id, 20).await.unwrap();
        let current = storage.get_by_id(task.id).await.unwrap().unwrap();
        assert_eq!(current.progress, 40);

        storage.update_progress(task.id, 250).await.unwrap();
        let current = storage.get_by_id(task.id).await.unwrap().unwrap();
        assert_eq!(current.progress, 100);
    }

    #[tokio::test]
    async fn test_success_forces_full_progress() {
        let storage = InMemorySyncTaskStorage::new();
        let task = storage.create(new_task()).await.unwrap();
        storage
            .mark_as_running(task.id, OffsetDateTime::now_utc())
            .await
            .unwrap();
        storage
            .mark_as_success(task.id, OffsetDateTime::now_utc(), None)
            .await
            .unwrap();

        let done = storage.get_by_id(task.id).await.unwrap().unwrap();
        assert_eq!(done.status, SyncTaskStatus::Success);
        assert_eq!(done.progress, 100);
        assert!(done.end_time.is_some());
    }

    #[tokio::test]
    async fn test_failed_retryable_listing_respects_budget() {
        let storage = InMemorySyncTaskStorage::new();
        let mut spent = new_task();
        spent.max_retries = 0;
        let spent = storage.create(spent).await.unwrap();
        let retryable = storage.create(new_task()).await.unwrap();
        for id in [spent.id, retryable.id] {
            storage
                .mark_as_failed(id, OffsetDateTime::now_utc(), "boom")
                .await
                .unwrap();
        }

        let listed = storage.list_failed_retryable_tasks(10).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, retryable.id);
    }

    #[tokio::test]
    async fn test_missing_task_is_not_found() {
        let storage = InMemorySyncTaskStorage::new();
        let err = storage
            .mark_as_failed(42, OffsetDateTime::now_utc(), "x")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
