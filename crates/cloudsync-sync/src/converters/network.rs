//! Virtual networks and public IPs.

use cloudsync_cloud::{PublicIpInstance, VpcInstance};
use cloudsync_storage::Asset;

use super::{AssetConverter, set_list, set_opt};

impl AssetConverter for VpcInstance {
    fn write_attributes(&self, asset: &mut Asset) {
        set_opt(asset, "cidr_block", self.cidr_block.as_deref());
        set_opt(asset, "ipv6_cidr_block", self.ipv6_cidr_block.as_deref());
        asset.set_attribute("is_default", self.is_default);
        set_list(asset, "subnet_ids", &self.subnet_ids);
        set_opt(asset, "description", self.description.as_deref());
    }
}

impl AssetConverter for PublicIpInstance {
    fn write_attributes(&self, asset: &mut Asset) {
        set_opt(asset, "ip_address", self.ip_address.as_deref());
        set_opt(asset, "bandwidth_mbps", self.bandwidth_mbps);
        set_opt(asset, "isp", self.isp.as_deref());
        set_opt(asset, "bound_instance_id", self.bound_instance_id.as_deref());
        set_opt(asset, "bound_instance_type", self.bound_instance_type.as_deref());
        set_opt(asset, "charge_type", self.charge_type.as_deref());
    }
}
