//! Wires stores, adapters and the sync service together and runs them until
//! shutdown.

use std::sync::Arc;

use cloudsync_cloud::{AdapterFactory, AdapterRegistry};
use cloudsync_db_memory::{MemoryStores, create_memory_stores};
use cloudsync_sync::{SyncService, SyncStores, WorkerPool, start_sync_scheduler};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::AppConfig;

/// The running worker.
pub struct Worker {
    pub service: Arc<SyncService>,
    pub stores: MemoryStores,
    pool: WorkerPool,
    scheduler: JoinHandle<()>,
    shutdown: watch::Sender<bool>,
}

impl Worker {
    /// Builds the service over in-memory stores and starts the pool and scheduler.
    ///
    /// Provider SDK integrations register their builders in `registry`.
    pub fn start(cfg: &AppConfig, registry: AdapterRegistry) -> Self {
        let stores = create_memory_stores();
        for seed in &cfg.accounts {
            stores.accounts.insert(seed.to_account());
        }
        tracing::info!(accounts = cfg.accounts.len(), "Seeded cloud accounts");

        if registry.is_empty() {
            tracing::warn!("No cloud adapter builders registered; account syncs will fail");
        } else {
            tracing::info!(providers = ?registry.providers(), "Cloud adapters registered");
        }
        let factory = Arc::new(AdapterFactory::new(
            Arc::new(registry),
            cfg.adapter.settings(),
        ));

        let (service, pool) = SyncService::start(sync_stores(&stores), factory, cfg.sync.clone());
        let (shutdown, shutdown_rx) = watch::channel(false);
        let scheduler = start_sync_scheduler(service.clone(), shutdown_rx);

        Self {
            service,
            stores,
            pool,
            scheduler,
            shutdown,
        }
    }

    /// Stops the scheduler, then drains the worker pool.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.scheduler.await {
            tracing::error!(error = %e, "Sync scheduler panicked");
        }
        self.pool.shutdown().await;
    }
}

/// Runs the worker until Ctrl+C.
pub async fn run(cfg: AppConfig) -> anyhow::Result<()> {
    let worker = Worker::start(&cfg, AdapterRegistry::new());
    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown signal received");
    worker.shutdown().await;
    Ok(())
}

fn sync_stores(stores: &MemoryStores) -> SyncStores {
    SyncStores {
        assets: stores.asset_storage(),
        tasks: stores.task_storage(),
        accounts: stores.account_storage(),
        groups: stores.group_storage(),
        users: stores.user_storage(),
        audit: stores.audit_storage(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AccountSeed;
    use cloudsync_core::Provider;
    use cloudsync_storage::CloudAccountStorage;

    #[tokio::test]
    async fn test_worker_seeds_accounts_and_shuts_down() {
        let cfg = AppConfig {
            accounts: vec![AccountSeed {
                id: 7,
                tenant_id: "t1".into(),
                name: "prod".into(),
                provider: Provider::Aliyun,
                access_key_id: "LTAI".into(),
                access_key_secret: "secret".into(),
                regions: vec!["cn-hangzhou".into()],
                default_region: None,
            }],
            ..Default::default()
        };

        let worker = Worker::start(&cfg, AdapterRegistry::new());
        let account = worker.stores.accounts.get_by_id(7).await.unwrap().unwrap();
        assert_eq!(account.provider, Provider::Aliyun);
        assert_eq!(account.regions, vec!["cn-hangzhou"]);
        worker.shutdown().await;
    }
}
