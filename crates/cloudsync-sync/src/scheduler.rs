use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};

use crate::service::SyncService;

/// Starts the periodic sweeps.
///
/// Every poll interval the pending and failed-retryable tasks are swept; every
/// account-sync interval a batch sync is scheduled for each active account.
/// The loop ends when `shutdown` flips to `true` or its sender is dropped.
pub fn start_sync_scheduler(
    service: Arc<SyncService>,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let config = service.config().clone();
        let mut poll = interval(config.poll_interval());
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut accounts = interval(config.account_sync_interval());
        accounts.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            poll_interval_secs = config.poll_interval_secs,
            account_sync_interval_secs = config.account_sync_interval_secs,
            "Sync scheduler started"
        );

        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                _ = accounts.tick() => {
                    match service.schedule_account_syncs().await {
                        Ok(tasks) if !tasks.is_empty() => {
                            tracing::info!(count = tasks.len(), "Scheduled account syncs");
                        }
                        Ok(_) => {}
                        Err(e) => tracing::error!(error = %e, "Failed to schedule account syncs"),
                    }
                }
                _ = poll.tick() => {
                    match service.process_failed_tasks().await {
                        Ok(report) if report.picked > 0 => {
                            tracing::info!(?report, "Retried failed sync tasks");
                        }
                        Ok(_) => {}
                        Err(e) => tracing::error!(error = %e, "Failed to sweep failed sync tasks"),
                    }
                    match service.process_pending_tasks(config.max_concurrent).await {
                        Ok(report) if report.picked > 0 => {
                            tracing::info!(?report, "Processed pending sync tasks");
                        }
                        Ok(_) => {}
                        Err(e) => tracing::error!(error = %e, "Failed to sweep pending sync tasks"),
                    }
                }
            }
        }

        tracing::info!("Sync scheduler stopped");
    })
}
