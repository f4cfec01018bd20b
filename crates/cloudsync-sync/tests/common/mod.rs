//! Scripted provider adapters and store wiring shared by the integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use cloudsync_cloud::{
    AdapterBuilder, AdapterFactory, AdapterRegistry, AdapterSettings, BackoffPolicy, Capabilities,
    CloudError, CloudResult, CloudUserRecord, ComputeInstance, IdentityAdapter, InstanceAdapter,
    InstanceFilter, InstanceMeta, Page, PageRequest, PermissionChange, PolicyRecord,
    RateLimitSettings,
};
use cloudsync_core::{CloudAccount, Credentials, Provider};
use cloudsync_db_memory::{InMemoryAssetStorage, MemoryStores, create_memory_stores};
use cloudsync_storage::{Asset, AssetFilter, AssetKey, AssetStorage, StorageError};
use cloudsync_sync::{SyncConfig, SyncService, SyncStores};

pub const TENANT: &str = "t1";
pub const REGION: &str = "us-east-1";

/// Compute listing served from a mutable script, paged by offset tokens.
#[derive(Default)]
pub struct ScriptedCompute {
    instances: Mutex<Vec<ComputeInstance>>,
    /// Every page claims another page follows with the same token.
    looping: Mutex<bool>,
    fail: Mutex<Option<CloudError>>,
}

impl ScriptedCompute {
    pub fn set_ids(&self, ids: &[&str]) {
        *self.instances.lock().unwrap() = ids
            .iter()
            .map(|id| ComputeInstance {
                meta: InstanceMeta::new(*id, format!("vm-{id}"), REGION).with_status("Running"),
                instance_type: Some("t3.micro".into()),
                ..Default::default()
            })
            .collect();
    }

    pub fn set_looping(&self, looping: bool) {
        *self.looping.lock().unwrap() = looping;
    }

    pub fn fail_with(&self, err: Option<CloudError>) {
        *self.fail.lock().unwrap() = err;
    }

    fn page(&self, page: &PageRequest, keep: impl Fn(&ComputeInstance) -> bool) -> CloudResult<Page<ComputeInstance>> {
        if let Some(err) = self.fail.lock().unwrap().clone() {
            return Err(err);
        }
        let all: Vec<ComputeInstance> = self
            .instances
            .lock()
            .unwrap()
            .iter()
            .filter(|i| keep(i))
            .cloned()
            .collect();
        if *self.looping.lock().unwrap() {
            return Ok(Page::with_next(all.into_iter().take(1).collect(), "again"));
        }

        let offset: usize = page.token.as_deref().map_or(0, |t| t.parse().unwrap());
        let size = page.page_size.max(1) as usize;
        let items: Vec<_> = all.iter().skip(offset).take(size).cloned().collect();
        let next = offset + items.len();
        if next < all.len() {
            Ok(Page::with_next(items, next.to_string()))
        } else {
            Ok(Page::last(items))
        }
    }
}

#[async_trait]
impl InstanceAdapter<ComputeInstance> for ScriptedCompute {
    async fn list_instances(
        &self,
        _region: &str,
        page: &PageRequest,
    ) -> CloudResult<Page<ComputeInstance>> {
        self.page(page, |_| true)
    }

    async fn list_instances_with_filter(
        &self,
        _region: &str,
        filter: &InstanceFilter,
        page: &PageRequest,
    ) -> CloudResult<Page<ComputeInstance>> {
        self.page(page, |i| filter.matches(&i.meta))
    }
}

/// IAM side of a provider with recorded permission updates.
#[derive(Default)]
pub struct ScriptedIdentity {
    users: Mutex<Vec<CloudUserRecord>>,
    attached: Mutex<HashMap<String, Vec<String>>>,
    updates: Mutex<Vec<(String, PermissionChange)>>,
    failing_users: Mutex<HashSet<String>>,
    rejected_credentials: Mutex<bool>,
    delay: Mutex<Option<Duration>>,
}

impl ScriptedIdentity {
    pub fn set_users(&self, users: &[(&str, &str)]) {
        *self.users.lock().unwrap() = users
            .iter()
            .map(|(id, name)| CloudUserRecord {
                user_id: id.to_string(),
                username: name.to_string(),
                display_name: Some(name.to_uppercase()),
                ..Default::default()
            })
            .collect();
    }

    pub fn attach(&self, user_id: &str, policies: &[&str]) {
        self.attached.lock().unwrap().insert(
            user_id.to_string(),
            policies.iter().map(|p| p.to_string()).collect(),
        );
    }

    pub fn attached(&self, user_id: &str) -> Vec<String> {
        let mut policies = self
            .attached
            .lock()
            .unwrap()
            .get(user_id)
            .cloned()
            .unwrap_or_default();
        policies.sort();
        policies
    }

    pub fn updates(&self) -> Vec<(String, PermissionChange)> {
        self.updates.lock().unwrap().clone()
    }

    pub fn fail_updates_for(&self, user_id: &str) {
        self.failing_users.lock().unwrap().insert(user_id.to_string());
    }

    pub fn reject_credentials(&self) {
        *self.rejected_credentials.lock().unwrap() = true;
    }

    pub fn delay_calls(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    async fn pause(&self) {
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl IdentityAdapter for ScriptedIdentity {
    async fn validate_credentials(&self) -> CloudResult<()> {
        self.pause().await;
        if *self.rejected_credentials.lock().unwrap() {
            return Err(CloudError::Credential("InvalidAccessKeyId".into()));
        }
        Ok(())
    }

    async fn list_users(&self, _page: &PageRequest) -> CloudResult<Page<CloudUserRecord>> {
        if *self.rejected_credentials.lock().unwrap() {
            return Err(CloudError::Credential("InvalidAccessKeyId".into()));
        }
        Ok(Page::last(self.users.lock().unwrap().clone()))
    }

    async fn get_user(&self, user_id: &str) -> CloudResult<CloudUserRecord> {
        self.pause().await;
        self.users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.user_id == user_id)
            .cloned()
            .ok_or_else(|| CloudError::NotFound(format!("user {user_id}")))
    }

    async fn get_user_policies(&self, user_id: &str) -> CloudResult<Vec<PolicyRecord>> {
        Ok(self
            .attached(user_id)
            .into_iter()
            .map(|id| PolicyRecord {
                policy_name: id.clone(),
                policy_id: id,
                ..Default::default()
            })
            .collect())
    }

    async fn update_user_permissions(
        &self,
        user_id: &str,
        change: &PermissionChange,
    ) -> CloudResult<()> {
        if self.failing_users.lock().unwrap().contains(user_id) {
            return Err(CloudError::api("NoPermission", "access denied"));
        }
        self.updates
            .lock()
            .unwrap()
            .push((user_id.to_string(), change.clone()));
        let mut attached = self.attached.lock().unwrap();
        let current = attached.entry(user_id.to_string()).or_default();
        current.retain(|p| !change.detach.contains(p));
        current.extend(change.attach.iter().cloned());
        Ok(())
    }
}

/// Hands the scripted adapters to every account of one provider.
pub struct ScriptedBuilder {
    pub provider: Provider,
    pub compute: Arc<ScriptedCompute>,
    pub identity: Arc<ScriptedIdentity>,
}

impl AdapterBuilder for ScriptedBuilder {
    fn provider(&self) -> Provider {
        self.provider
    }

    fn build(&self, _account: &CloudAccount) -> Result<Capabilities, CloudError> {
        Ok(Capabilities::new()
            .with_instances::<ComputeInstance>(self.compute.clone())
            .with_identity(self.identity.clone()))
    }
}

/// Asset store that rejects upserts of chosen asset ids.
pub struct FailingAssetStorage {
    inner: InMemoryAssetStorage,
    failing: HashSet<String>,
}

impl FailingAssetStorage {
    pub fn new(failing: &[&str]) -> Self {
        Self {
            inner: InMemoryAssetStorage::new(),
            failing: failing.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[async_trait]
impl AssetStorage for FailingAssetStorage {
    async fn upsert(&self, asset: &Asset) -> Result<(), StorageError> {
        if self.failing.contains(&asset.asset_id) {
            return Err(StorageError::internal(format!(
                "write rejected for {}",
                asset.asset_id
            )));
        }
        self.inner.upsert(asset).await
    }

    async fn delete_by_asset_ids(
        &self,
        tenant_id: &str,
        model_uid: &str,
        asset_ids: &[String],
    ) -> Result<u64, StorageError> {
        self.inner
            .delete_by_asset_ids(tenant_id, model_uid, asset_ids)
            .await
    }

    async fn list_asset_ids_by_region(
        &self,
        tenant_id: &str,
        model_uid: &str,
        cloud_account_id: i64,
        region: &str,
    ) -> Result<Vec<String>, StorageError> {
        self.inner
            .list_asset_ids_by_region(tenant_id, model_uid, cloud_account_id, region)
            .await
    }

    async fn get(&self, key: &AssetKey) -> Result<Option<Asset>, StorageError> {
        self.inner.get(key).await
    }

    async fn list(&self, filter: &AssetFilter) -> Result<Vec<Asset>, StorageError> {
        self.inner.list(filter).await
    }
}

pub fn sync_stores(mem: &MemoryStores) -> SyncStores {
    SyncStores {
        assets: mem.asset_storage(),
        tasks: mem.task_storage(),
        accounts: mem.account_storage(),
        groups: mem.group_storage(),
        users: mem.user_storage(),
        audit: mem.audit_storage(),
    }
}

/// Calls go out immediately and are never retried.
pub fn fast_settings() -> AdapterSettings {
    AdapterSettings {
        rate_limit: RateLimitSettings {
            requests_per_second: 10_000.0,
            burst: 10_000,
        },
        backoff: BackoffPolicy::new(1, Duration::from_millis(1), Duration::from_millis(1)),
    }
}

pub fn account(id: i64) -> CloudAccount {
    CloudAccount::new(
        id,
        TENANT,
        format!("acct-{id}"),
        Provider::Aws,
        Credentials::new("AKIA", "secret"),
    )
    .with_regions([REGION])
}

/// In-memory stores, one active AWS account (id 1) and scripted adapters.
pub struct Harness {
    pub mem: MemoryStores,
    pub stores: SyncStores,
    pub factory: Arc<AdapterFactory>,
    pub compute: Arc<ScriptedCompute>,
    pub identity: Arc<ScriptedIdentity>,
}

impl Harness {
    pub fn new() -> Self {
        let mem = create_memory_stores();
        mem.accounts.insert(account(1));
        let compute = Arc::new(ScriptedCompute::default());
        let identity = Arc::new(ScriptedIdentity::default());
        let registry = AdapterRegistry::new().with(Arc::new(ScriptedBuilder {
            provider: Provider::Aws,
            compute: compute.clone(),
            identity: identity.clone(),
        }));
        let factory = Arc::new(AdapterFactory::new(Arc::new(registry), fast_settings()));
        Self {
            stores: sync_stores(&mem),
            mem,
            factory,
            compute,
            identity,
        }
    }

    pub fn service(&self, config: SyncConfig) -> SyncService {
        SyncService::new(self.stores.clone(), self.factory.clone(), config)
    }

    pub fn with_asset_storage(mut self, assets: Arc<dyn AssetStorage>) -> Self {
        self.stores.assets = assets;
        self
    }
}
