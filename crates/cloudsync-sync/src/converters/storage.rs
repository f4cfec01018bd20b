//! File storage and object storage.

use cloudsync_cloud::{FileStorageInstance, ObjectStorageBucket};
use cloudsync_storage::Asset;

use super::{AssetConverter, set_list, set_opt};

impl AssetConverter for FileStorageInstance {
    fn write_attributes(&self, asset: &mut Asset) {
        set_opt(asset, "protocol_type", self.protocol_type.as_deref());
        set_opt(asset, "storage_type", self.storage_type.as_deref());
        set_opt(asset, "capacity_gb", self.capacity_gb);
        set_opt(asset, "used_gb", self.used_gb);
        set_list(asset, "mount_targets", &self.mount_targets);
    }
}

impl AssetConverter for ObjectStorageBucket {
    fn write_attributes(&self, asset: &mut Asset) {
        set_opt(asset, "storage_class", self.storage_class.as_deref());
        set_opt(asset, "acl", self.acl.as_deref());
        set_opt(asset, "versioning", self.versioning);
        set_opt(asset, "extranet_endpoint", self.extranet_endpoint.as_deref());
        set_opt(asset, "intranet_endpoint", self.intranet_endpoint.as_deref());
    }
}
