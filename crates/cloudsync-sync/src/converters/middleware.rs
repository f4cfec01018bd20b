//! Message brokers and search clusters.

use cloudsync_cloud::{MessageQueueInstance, SearchClusterInstance};
use cloudsync_storage::Asset;

use super::{AssetConverter, set_opt};

impl AssetConverter for MessageQueueInstance {
    fn write_attributes(&self, asset: &mut Asset) {
        set_opt(asset, "version", self.version.as_deref());
        set_opt(asset, "spec_type", self.spec_type.as_deref());
        set_opt(asset, "topic_quota", self.topic_quota);
        set_opt(asset, "disk_size_gb", self.disk_size_gb);
        set_opt(asset, "endpoint", self.endpoint.as_deref());
    }
}

impl AssetConverter for SearchClusterInstance {
    fn write_attributes(&self, asset: &mut Asset) {
        set_opt(asset, "version", self.version.as_deref());
        set_opt(asset, "node_count", self.node_count);
        set_opt(asset, "node_spec", self.node_spec.as_deref());
        set_opt(asset, "disk_size_gb", self.disk_size_gb);
        set_opt(asset, "endpoint", self.endpoint.as_deref());
        set_opt(asset, "dashboard_endpoint", self.dashboard_endpoint.as_deref());
    }
}
