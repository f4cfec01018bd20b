//! Relational, cache and document databases.

use cloudsync_cloud::{CacheInstance, DocumentDbInstance, RelationalDbInstance};
use cloudsync_storage::Asset;

use super::{AssetConverter, set_opt};

impl AssetConverter for RelationalDbInstance {
    fn write_attributes(&self, asset: &mut Asset) {
        set_opt(asset, "engine", self.engine.as_deref());
        set_opt(asset, "engine_version", self.engine_version.as_deref());
        set_opt(asset, "instance_class", self.instance_class.as_deref());
        set_opt(asset, "storage_gb", self.storage_gb);
        set_opt(asset, "connection_host", self.connection_host.as_deref());
        set_opt(asset, "port", self.port);
        set_opt(asset, "charge_type", self.charge_type.as_deref());
    }
}

impl AssetConverter for CacheInstance {
    fn write_attributes(&self, asset: &mut Asset) {
        set_opt(asset, "engine", self.engine.as_deref());
        set_opt(asset, "engine_version", self.engine_version.as_deref());
        set_opt(asset, "capacity_mb", self.capacity_mb);
        set_opt(asset, "connection_host", self.connection_host.as_deref());
        set_opt(asset, "port", self.port);
        set_opt(asset, "architecture", self.architecture.as_deref());
    }
}

impl AssetConverter for DocumentDbInstance {
    fn write_attributes(&self, asset: &mut Asset) {
        set_opt(asset, "engine_version", self.engine_version.as_deref());
        set_opt(asset, "instance_class", self.instance_class.as_deref());
        set_opt(asset, "storage_gb", self.storage_gb);
        set_opt(asset, "replica_count", self.replica_count);
        set_opt(asset, "connection_host", self.connection_host.as_deref());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converters::AssetScope;
    use cloudsync_cloud::InstanceMeta;
    use cloudsync_core::{CloudAccount, Credentials, Provider};
    use serde_json::Value;

    #[test]
    fn test_each_database_kind_has_its_own_model() {
        let account = CloudAccount::new(1, "t1", "a", Provider::Tencent, Credentials::new("id", "key"));
        let scope = AssetScope {
            tenant_id: "t1",
            account: &account,
            region: "ap-guangzhou",
        };
        let meta = InstanceMeta::new("db-1", "orders", "ap-guangzhou");

        let rds = RelationalDbInstance {
            meta: meta.clone(),
            engine: Some("MySQL".into()),
            port: Some(3306),
            ..Default::default()
        }
        .to_asset(&scope);
        let redis = CacheInstance {
            meta: meta.clone(),
            capacity_mb: Some(1024),
            ..Default::default()
        }
        .to_asset(&scope);
        let mongo = DocumentDbInstance {
            meta,
            replica_count: Some(3),
            ..Default::default()
        }
        .to_asset(&scope);

        assert_eq!(rds.model_uid, "cloud_rds");
        assert_eq!(rds.attribute("port"), Some(&Value::from(3306)));
        assert_eq!(redis.model_uid, "cloud_redis");
        assert_eq!(redis.attribute("capacity_mb"), Some(&Value::from(1024)));
        assert_eq!(mongo.model_uid, "cloud_mongodb");
        assert_eq!(mongo.attribute("replica_count"), Some(&Value::from(3)));
        assert_ne!(rds.key(), redis.key());
    }
}
