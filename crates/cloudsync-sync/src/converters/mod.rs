//! Provider record -> inventory record conversion.
//!
//! The reconciliation engine is generic over [`AssetConverter`]; each resource
//! kind only supplies the fields that go into the attribute bag. Identity
//! records have their own converters in [`identity`].

mod compute;
mod database;
pub mod identity;
mod middleware;
mod network;
mod storage;

use cloudsync_cloud::{CloudRecord, InstanceMeta};
use cloudsync_core::{CloudAccount, format_rfc3339};
use cloudsync_storage::Asset;
use serde_json::{Map, Value};

/// Where a listing came from.
#[derive(Debug, Clone, Copy)]
pub struct AssetScope<'a> {
    pub tenant_id: &'a str,
    pub account: &'a CloudAccount,
    pub region: &'a str,
}

/// Converts one provider record into an [`Asset`].
pub trait AssetConverter: CloudRecord {
    /// Writes the kind-specific fields into the attribute bag.
    fn write_attributes(&self, asset: &mut Asset);

    fn to_asset(&self, scope: &AssetScope<'_>) -> Asset {
        let meta = self.meta();
        let mut asset = Asset::new(
            scope.tenant_id,
            model_uid::<Self>(),
            &meta.id,
            display_name(meta),
            scope.account.id,
            scope.account.provider,
            scope.region,
        );
        write_meta(&mut asset, meta, scope.region);
        self.write_attributes(&mut asset);
        asset
    }
}

/// Inventory model of a record type, e.g. `cloud_vm`.
pub fn model_uid<T: CloudRecord>() -> &'static str {
    T::KIND.model_uid().unwrap_or(T::KIND.as_str())
}

fn display_name(meta: &InstanceMeta) -> &str {
    if meta.name.trim().is_empty() {
        &meta.id
    } else {
        &meta.name
    }
}

/// Fields every kind carries.
fn write_meta(asset: &mut Asset, meta: &InstanceMeta, scope_region: &str) {
    let region = if meta.region.is_empty() {
        scope_region
    } else {
        &meta.region
    };
    asset.set_attribute("region", region);
    asset.set_opt_attribute("status", Some(meta.status.as_str()));
    asset.set_opt_attribute("zone", meta.zone.as_deref());
    asset.set_opt_attribute("vpc_id", meta.vpc_id.as_deref());
    if !meta.tags.is_empty() {
        let tags: Map<String, Value> = meta
            .tags
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();
        asset.set_attribute("tags", Value::Object(tags));
    }
    if let Some(created_at) = meta.created_at {
        asset.set_attribute("created_at", format_rfc3339(created_at));
    }
    if let Some(expires_at) = meta.expires_at {
        asset.set_attribute("expires_at", format_rfc3339(expires_at));
    }
}

/// Sets a scalar attribute when present.
pub(crate) fn set_opt<V: Into<Value>>(asset: &mut Asset, key: &str, value: Option<V>) {
    if let Some(value) = value {
        asset.set_attribute(key, value);
    }
}

/// Sets a list attribute when non-empty.
pub(crate) fn set_list(asset: &mut Asset, key: &str, values: &[String]) {
    if !values.is_empty() {
        asset.set_attribute(key, values.to_vec());
    }
}
