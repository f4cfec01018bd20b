use async_trait::async_trait;
use cloudsync_storage::{Asset, AssetFilter, AssetKey, AssetStorage, StorageError};
use dashmap::DashMap;

/// In-memory inventory keyed by `(tenant, model, asset id)`.
#[derive(Debug, Default)]
pub struct InMemoryAssetStorage {
    data: DashMap<AssetKey, Asset>,
}

impl InMemoryAssetStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[async_trait]
impl AssetStorage for InMemoryAssetStorage {
    async fn upsert(&self, asset: &Asset) -> Result<(), StorageError> {
        if asset.asset_id.is_empty() {
            return Err(StorageError::invalid_record("asset_id must not be empty"));
        }
        self.data.insert(asset.key(), asset.clone());
        Ok(())
    }

    async fn delete_by_asset_ids(
        &self,
        tenant_id: &str,
        model_uid: &str,
        asset_ids: &[String],
    ) -> Result<u64, StorageError> {
        let removed = asset_ids
            .iter()
            .filter(|id| {
                self.data
                    .remove(&AssetKey::new(tenant_id, model_uid, id.as_str()))
                    .is_some()
            })
            .count();
        Ok(removed as u64)
    }

    async fn list_asset_ids_by_region(
        &self,
        tenant_id: &str,
        model_uid: &str,
        cloud_account_id: i64,
        region: &str,
    ) -> Result<Vec<String>, StorageError> {
        let filter = AssetFilter::new()
            .with_tenant(tenant_id)
            .with_model(model_uid)
            .with_account(cloud_account_id)
            .with_region(region);
        let mut ids: Vec<String> = self
            .data
            .iter()
            .filter(|entry| filter.matches(entry.value()))
            .map(|entry| entry.key().asset_id.clone())
            .collect();
        ids.sort();
        Ok(ids)
    }

    async fn get(&self, key: &AssetKey) -> Result<Option<Asset>, StorageError> {
        Ok(self.data.get(key).map(|entry| entry.value().clone()))
    }

    async fn list(&self, filter: &AssetFilter) -> Result<Vec<Asset>, StorageError> {
        let mut assets: Vec<Asset> = self
            .data
            .iter()
            .filter(|entry| filter.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        assets.sort_by(|a, b| a.key().cmp(&b.key()));
        Ok(assets)
    }
}
