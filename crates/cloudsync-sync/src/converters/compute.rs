use cloudsync_cloud::ComputeInstance;
use cloudsync_storage::Asset;

use super::{AssetConverter, set_list, set_opt};

impl AssetConverter for ComputeInstance {
    fn write_attributes(&self, asset: &mut Asset) {
        set_opt(asset, "instance_type", self.instance_type.as_deref());
        set_opt(asset, "cpu", self.cpu);
        set_opt(asset, "memory_mb", self.memory_mb);
        set_opt(asset, "os_name", self.os_name.as_deref());
        set_opt(asset, "image_id", self.image_id.as_deref());
        set_opt(asset, "subnet_id", self.subnet_id.as_deref());
        set_list(asset, "private_ips", &self.private_ips);
        set_list(asset, "public_ips", &self.public_ips);
        set_list(asset, "security_group_ids", &self.security_group_ids);
        set_opt(asset, "charge_type", self.charge_type.as_deref());
    }
}
