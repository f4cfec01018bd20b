mod common;

use std::time::Duration;

use cloudsync_core::{AccountStatus, Provider};
use cloudsync_storage::{
    AssetFilter, AssetStorage, CloudUser, CloudUserStorage, CloudUserKey, PermissionGroup,
    PermissionGroupStorage, PolicyRef, SyncTaskFilter, SyncTaskKind, SyncTaskStatus,
    SyncTaskStorage, TaskTrigger, UserStatus,
};
use cloudsync_sync::{CreateSyncTaskRequest, SyncConfig, SyncError, SyncService, start_sync_scheduler};
use tokio::sync::watch;

use common::{Harness, account};

fn user_key(cloud_user_id: &str) -> CloudUserKey {
    CloudUserKey {
        tenant_id: "t1".into(),
        provider: Provider::Aws,
        cloud_account_id: 1,
        cloud_user_id: cloud_user_id.into(),
    }
}

async fn wait_for_status(service: &SyncService, task_id: i64, status: SyncTaskStatus) {
    for _ in 0..200 {
        if service.get_sync_task_status(task_id).await.unwrap().status == status {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("task {task_id} never reached {status}");
}

#[tokio::test]
async fn test_account_sync_mirrors_users_and_assets() {
    let h = Harness::new();
    h.compute.set_ids(&["i-1", "i-2"]);
    h.identity.set_users(&[("u-1", "alice"), ("u-2", "bob")]);
    let stale = h
        .mem
        .users
        .upsert(&CloudUser::new("t1", Provider::Aws, 1, "u-old", "carol"))
        .await
        .unwrap();
    let service = h.service(SyncConfig::default());

    let summary = service.sync_users(1).await.unwrap();

    // Two users plus two compute instances; every other asset kind is skipped.
    assert_eq!(summary.succeeded, 4);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.deleted, 1);
    assert_eq!(summary.skipped, 9);

    let alice = h.mem.users.find_by_key(&user_key("u-1")).await.unwrap().unwrap();
    assert_eq!(alice.username, "alice");
    assert_eq!(alice.status, UserStatus::Active);
    let stale = h.mem.users.get_by_id(stale.id).await.unwrap().unwrap();
    assert_eq!(stale.status, UserStatus::Deleted);

    let assets = h
        .stores
        .assets
        .list(&AssetFilter::new().with_account(1))
        .await
        .unwrap();
    assert_eq!(assets.len(), 2);
}

#[tokio::test]
async fn test_account_sync_records_asset_failures_and_fails_on_credentials() {
    let h = Harness::new();
    h.identity.set_users(&[("u-1", "alice")]);
    h.compute
        .fail_with(Some(cloudsync_cloud::CloudError::api("InternalError", "boom")));
    let service = h.service(SyncConfig::default());

    let summary = service.sync_users(1).await.unwrap();
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.failed, 1);
    assert!(summary.errors[0].starts_with("compute/us-east-1"));

    h.identity.reject_credentials();
    let task = service
        .create_sync_task(CreateSyncTaskRequest::new("batch-user-sync", "account", 1, 1, "aws"))
        .await
        .unwrap();
    let done = service.execute_sync_task(task.id).await.unwrap();
    assert_eq!(done.status, SyncTaskStatus::Failed);
    assert!(done.error_message.unwrap().contains("Credential"));
}

#[tokio::test]
async fn test_disabled_account_is_not_synced() {
    let h = Harness::new();
    h.mem
        .accounts
        .insert(account(2).with_status(AccountStatus::Disabled));
    let service = h.service(SyncConfig::default());

    let err = service.sync_users(2).await.unwrap_err();
    assert!(matches!(err, SyncError::AccountDisabled { account_id: 2, .. }));
    assert!(err.is_account_fatal());
}

#[tokio::test]
async fn test_async_sync_runs_on_the_worker_pool() {
    let h = Harness::new();
    h.compute.set_ids(&["i-1"]);
    h.identity.set_users(&[("u-1", "alice")]);

    let inline = h.service(SyncConfig::default());
    assert!(matches!(
        inline.sync_users_async(1).await,
        Err(SyncError::QueueClosed)
    ));

    let (service, pool) = SyncService::start(h.stores.clone(), h.factory.clone(), SyncConfig {
        workers: 2,
        ..Default::default()
    });
    let task = service.sync_users_async(1).await.unwrap();
    assert_eq!(task.task_type, SyncTaskKind::BatchUserSync);
    assert_eq!(task.trigger, TaskTrigger::Manual);

    wait_for_status(&service, task.id, SyncTaskStatus::Success).await;
    let done = service.get_sync_task_status(task.id).await.unwrap();
    assert_eq!(done.progress, 100);
    assert_eq!(done.result.unwrap().succeeded, 2);

    pool.shutdown().await;
    assert!(matches!(
        service.submit_sync_task(task.id).await,
        Err(SyncError::QueueClosed)
    ));
}

#[tokio::test]
async fn test_schedule_account_syncs_skips_inactive_and_queued_accounts() {
    let h = Harness::new();
    h.mem.accounts.insert(account(2));
    h.mem
        .accounts
        .insert(account(3).with_status(AccountStatus::Disabled));
    let service = h.service(SyncConfig::default());

    let created = service.schedule_account_syncs().await.unwrap();
    let accounts: Vec<i64> = created.iter().map(|t| t.cloud_account_id).collect();
    assert_eq!(accounts, vec![1, 2]);
    assert!(created.iter().all(|t| t.trigger == TaskTrigger::Scheduled));

    let again = service.schedule_account_syncs().await.unwrap();
    assert!(again.is_empty());

    let report = service.process_pending_tasks(2).await.unwrap();
    assert_eq!(report.picked, 2);
    assert_eq!(report.succeeded, 2);

    let next = service.schedule_account_syncs().await.unwrap();
    assert_eq!(next.len(), 2);
}

#[tokio::test]
async fn test_failed_sweep_retries_within_budget() {
    let h = Harness::new();
    let group = PermissionGroup::new(10, "t1", "developers")
        .with_platforms([Provider::Aws])
        .with_policies(vec![PolicyRef::new("ReadOnly", Provider::Aws)]);
    h.mem.groups.save(&group).await.unwrap();
    let user = h
        .mem
        .users
        .upsert(&CloudUser::new("t1", Provider::Aws, 1, "u-1", "alice").with_groups([10]))
        .await
        .unwrap();
    h.identity.fail_updates_for("u-1");
    let service = h.service(SyncConfig::default());

    let task = service
        .create_sync_task(CreateSyncTaskRequest {
            max_retries: Some(1),
            ..CreateSyncTaskRequest::new("permission-sync", "user", user.id, 1, "aws")
        })
        .await
        .unwrap();
    let pending = service.process_pending_tasks(4).await.unwrap();
    assert_eq!(pending.failed, 1);

    let first = service.process_failed_tasks().await.unwrap();
    assert_eq!(first.picked, 1);
    assert_eq!(first.failed, 1);
    let after = service.get_sync_task_status(task.id).await.unwrap();
    assert_eq!(after.status, SyncTaskStatus::Failed);
    assert_eq!(after.retry_count, 1);

    // Budget spent: the task is no longer picked up.
    let second = service.process_failed_tasks().await.unwrap();
    assert_eq!(second.picked, 0);
}

#[tokio::test]
async fn test_pending_sweep_skips_running_tasks() {
    let h = Harness::new();
    let service = h.service(SyncConfig::default());
    let task = service
        .create_sync_task(CreateSyncTaskRequest::new("batch-user-sync", "account", 1, 1, "aws"))
        .await
        .unwrap();
    h.mem
        .tasks
        .update_status(task.id, SyncTaskStatus::Running, None)
        .await
        .unwrap();

    let report = service.process_pending_tasks(4).await.unwrap();
    assert_eq!(report.picked, 0);

    let tasks = service
        .list_sync_tasks(&SyncTaskFilter {
            status: Some(SyncTaskStatus::Running),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(tasks.len(), 1);
}

#[tokio::test]
async fn test_validate_account() {
    let h = Harness::new();
    let service = h.service(SyncConfig::default());
    service.validate_account(1).await.unwrap();

    assert!(service.validate_account(404).await.unwrap_err().is_not_found());

    h.identity.reject_credentials();
    let err = service.validate_account(1).await.unwrap_err();
    assert!(matches!(err, SyncError::Credential(_)));
}

#[tokio::test(start_paused = true)]
async fn test_validate_account_times_out() {
    let h = Harness::new();
    h.identity.delay_calls(Duration::from_secs(60));
    let service = h.service(SyncConfig {
        validation_timeout_secs: 2,
        ..Default::default()
    });

    let err = service.validate_account(1).await.unwrap_err();
    assert!(matches!(err, SyncError::Timeout { .. }));
}

#[tokio::test]
async fn test_invalidate_account_drops_cached_adapter() {
    let h = Harness::new();
    let service = h.service(SyncConfig::default());
    service.validate_account(1).await.unwrap();
    assert_eq!(service.factory().cached_count(), 1);

    assert!(service.invalidate_account(&account(1)));
    assert_eq!(service.factory().cached_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_scheduler_schedules_and_executes_account_syncs() {
    let h = Harness::new();
    h.identity.set_users(&[("u-1", "alice")]);
    let service = std::sync::Arc::new(h.service(SyncConfig {
        poll_interval_secs: 1,
        account_sync_interval_secs: 3600,
        ..Default::default()
    }));
    let (shutdown, shutdown_rx) = watch::channel(false);
    let handle = start_sync_scheduler(service.clone(), shutdown_rx);

    tokio::time::sleep(Duration::from_secs(3)).await;

    let tasks = service
        .list_sync_tasks(&SyncTaskFilter {
            task_type: Some(SyncTaskKind::BatchUserSync),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].status, SyncTaskStatus::Success);

    shutdown.send(true).unwrap();
    handle.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_scheduler_runs_with_zero_intervals() {
    let h = Harness::new();
    let service = std::sync::Arc::new(h.service(SyncConfig {
        poll_interval_secs: 0,
        account_sync_interval_secs: 0,
        ..Default::default()
    }));
    let (shutdown, shutdown_rx) = watch::channel(false);
    let handle = start_sync_scheduler(service.clone(), shutdown_rx);

    tokio::time::sleep(Duration::from_secs(2)).await;
    shutdown.send(true).unwrap();
    handle.await.unwrap();

    let tasks = service
        .list_sync_tasks(&SyncTaskFilter::default())
        .await
        .unwrap();
    assert!(!tasks.is_empty());
}
