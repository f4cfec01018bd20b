use cloudsync_core::Provider;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Unique identity of an inventory record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AssetKey {
    pub tenant_id: String,
    pub model_uid: String,
    pub asset_id: String,
}

impl AssetKey {
    pub fn new(
        tenant_id: impl Into<String>,
        model_uid: impl Into<String>,
        asset_id: impl Into<String>,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            model_uid: model_uid.into(),
            asset_id: asset_id.into(),
        }
    }
}

/// A reconciled provider-side resource as stored in the inventory.
///
/// Upserting the same `Asset` twice leaves the store unchanged: the record
/// carries no write timestamps of its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub tenant_id: String,
    /// Resource model the record belongs to (e.g. `cloud_vm`).
    pub model_uid: String,
    /// Provider-side identifier.
    pub asset_id: String,
    pub asset_name: String,
    pub cloud_account_id: i64,
    pub provider: Provider,
    /// Region the record was listed from; deletion is scoped by it.
    pub region: String,
    /// Provider-specific fields: zone, instance type, network ids, tags, lifecycle timestamps.
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

impl Asset {
    pub fn new(
        tenant_id: impl Into<String>,
        model_uid: impl Into<String>,
        asset_id: impl Into<String>,
        asset_name: impl Into<String>,
        cloud_account_id: i64,
        provider: Provider,
        region: impl Into<String>,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            model_uid: model_uid.into(),
            asset_id: asset_id.into(),
            asset_name: asset_name.into(),
            cloud_account_id,
            provider,
            region: region.into(),
            attributes: Map::new(),
        }
    }

    pub fn key(&self) -> AssetKey {
        AssetKey::new(&self.tenant_id, &self.model_uid, &self.asset_id)
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set_attribute(key, value);
        self
    }

    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.attributes.insert(key.into(), value.into());
    }

    /// Sets the attribute only when the value is present and non-empty.
    pub fn set_opt_attribute(&mut self, key: impl Into<String>, value: Option<&str>) {
        if let Some(v) = value
            && !v.is_empty()
        {
            self.attributes
                .insert(key.into(), Value::String(v.to_string()));
        }
    }

    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }
}

/// Filter for listing inventory records.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssetFilter {
    pub tenant_id: Option<String>,
    pub model_uid: Option<String>,
    pub cloud_account_id: Option<i64>,
    pub region: Option<String>,
}

impl AssetFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tenant(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    pub fn with_model(mut self, model_uid: impl Into<String>) -> Self {
        self.model_uid = Some(model_uid.into());
        self
    }

    pub fn with_account(mut self, account_id: i64) -> Self {
        self.cloud_account_id = Some(account_id);
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn matches(&self, asset: &Asset) -> bool {
        self.tenant_id.as_ref().is_none_or(|t| *t == asset.tenant_id)
            && self.model_uid.as_ref().is_none_or(|m| *m == asset.model_uid)
            && self
                .cloud_account_id
                .is_none_or(|a| a == asset.cloud_account_id)
            && self.region.as_ref().is_none_or(|r| *r == asset.region)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_opt_attribute_skips_empty() {
        let mut asset = Asset::new("t1", "cloud_vm", "i-1", "web", 1, Provider::Aliyun, "cn-hangzhou");
        asset.set_opt_attribute("zone", Some(""));
        asset.set_opt_attribute("vpc_id", None);
        asset.set_opt_attribute("image_id", Some("img-1"));
        assert_eq!(asset.attributes.len(), 1);
        assert_eq!(asset.attribute("image_id"), Some(&Value::from("img-1")));
    }

    #[test]
    fn test_filter_matches() {
        let asset = Asset::new("t1", "cloud_vm", "i-1", "web", 7, Provider::Aws, "us-east-1");
        assert!(AssetFilter::new().matches(&asset));
        assert!(
            AssetFilter::new()
                .with_tenant("t1")
                .with_account(7)
                .with_region("us-east-1")
                .matches(&asset)
        );
        assert!(!AssetFilter::new().with_region("us-west-2").matches(&asset));
        assert!(!AssetFilter::new().with_model("cloud_rds").matches(&asset));
    }
}
