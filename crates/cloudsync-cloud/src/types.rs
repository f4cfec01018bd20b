//! Provider-neutral records returned by adapters.
//!
//! Adapters translate each provider's wire format into these types; the sync
//! layer converts them into inventory assets.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use time::OffsetDateTime;

/// Fields every provider-side instance carries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstanceMeta {
    /// Provider-side identifier, unique within the account.
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub status: String,
    pub region: String,
    #[serde(default)]
    pub zone: Option<String>,
    #[serde(default)]
    pub vpc_id: Option<String>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub created_at: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub expires_at: Option<OffsetDateTime>,
}

impl InstanceMeta {
    pub fn new(id: impl Into<String>, name: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            region: region.into(),
            ..Default::default()
        }
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = status.into();
        self
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComputeInstance {
    #[serde(flatten)]
    pub meta: InstanceMeta,
    pub instance_type: Option<String>,
    pub cpu: Option<u32>,
    pub memory_mb: Option<u64>,
    pub os_name: Option<String>,
    pub image_id: Option<String>,
    pub subnet_id: Option<String>,
    #[serde(default)]
    pub private_ips: Vec<String>,
    #[serde(default)]
    pub public_ips: Vec<String>,
    #[serde(default)]
    pub security_group_ids: Vec<String>,
    pub charge_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelationalDbInstance {
    #[serde(flatten)]
    pub meta: InstanceMeta,
    pub engine: Option<String>,
    pub engine_version: Option<String>,
    pub instance_class: Option<String>,
    pub storage_gb: Option<u64>,
    pub connection_host: Option<String>,
    pub port: Option<u16>,
    pub charge_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheInstance {
    #[serde(flatten)]
    pub meta: InstanceMeta,
    pub engine: Option<String>,
    pub engine_version: Option<String>,
    pub capacity_mb: Option<u64>,
    pub connection_host: Option<String>,
    pub port: Option<u16>,
    pub architecture: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentDbInstance {
    #[serde(flatten)]
    pub meta: InstanceMeta,
    pub engine_version: Option<String>,
    pub instance_class: Option<String>,
    pub storage_gb: Option<u64>,
    pub replica_count: Option<u32>,
    pub connection_host: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VpcInstance {
    #[serde(flatten)]
    pub meta: InstanceMeta,
    pub cidr_block: Option<String>,
    pub ipv6_cidr_block: Option<String>,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub subnet_ids: Vec<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PublicIpInstance {
    #[serde(flatten)]
    pub meta: InstanceMeta,
    pub ip_address: Option<String>,
    pub bandwidth_mbps: Option<u32>,
    pub isp: Option<String>,
    /// Id of the resource the address is bound to.
    pub bound_instance_id: Option<String>,
    pub bound_instance_type: Option<String>,
    pub charge_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileStorageInstance {
    #[serde(flatten)]
    pub meta: InstanceMeta,
    pub protocol_type: Option<String>,
    pub storage_type: Option<String>,
    pub capacity_gb: Option<u64>,
    pub used_gb: Option<u64>,
    #[serde(default)]
    pub mount_targets: Vec<String>,
}

/// Buckets use the bucket name as `meta.id`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectStorageBucket {
    #[serde(flatten)]
    pub meta: InstanceMeta,
    pub storage_class: Option<String>,
    pub acl: Option<String>,
    pub versioning: Option<bool>,
    pub extranet_endpoint: Option<String>,
    pub intranet_endpoint: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageQueueInstance {
    #[serde(flatten)]
    pub meta: InstanceMeta,
    pub version: Option<String>,
    pub spec_type: Option<String>,
    pub topic_quota: Option<u32>,
    pub disk_size_gb: Option<u64>,
    pub endpoint: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchClusterInstance {
    #[serde(flatten)]
    pub meta: InstanceMeta,
    pub version: Option<String>,
    pub node_count: Option<u32>,
    pub node_spec: Option<String>,
    pub disk_size_gb: Option<u64>,
    pub endpoint: Option<String>,
    pub dashboard_endpoint: Option<String>,
}

/// A provider-side IAM user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CloudUserRecord {
    pub user_id: String,
    pub username: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub created_at: Option<OffsetDateTime>,
}

/// A provider-side permission policy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolicyRecord {
    pub policy_id: String,
    pub policy_name: String,
    /// Provider wording, e.g. `System` or `Custom`.
    pub policy_type: Option<String>,
    pub description: Option<String>,
}

/// A provider-side IAM group.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CloudGroupRecord {
    pub group_id: String,
    pub group_name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub member_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
}

/// Policies to attach and detach in a single permission update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionChange {
    pub attach: Vec<String>,
    pub detach: Vec<String>,
}

impl PermissionChange {
    pub fn is_empty(&self) -> bool {
        self.attach.is_empty() && self.detach.is_empty()
    }
}

/// Continuation request for a paginated listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page_size: u32,
    /// `None` for the first page.
    pub token: Option<String>,
}

impl PageRequest {
    pub const DEFAULT_PAGE_SIZE: u32 = 100;

    pub fn first(page_size: u32) -> Self {
        Self {
            page_size,
            token: None,
        }
    }

    pub fn next(&self, token: impl Into<String>) -> Self {
        Self {
            page_size: self.page_size,
            token: Some(token.into()),
        }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::first(Self::DEFAULT_PAGE_SIZE)
    }
}

/// One page of a listing. No `next_token` means there are no more pages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_token: Option<String>,
}

impl<T> Page<T> {
    pub fn last(items: Vec<T>) -> Self {
        Self {
            items,
            next_token: None,
        }
    }

    pub fn with_next(items: Vec<T>, token: impl Into<String>) -> Self {
        Self {
            items,
            next_token: Some(token.into()),
        }
    }
}

/// Narrowing applied by `list_instances_with_filter`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstanceFilter {
    #[serde(default)]
    pub instance_ids: Vec<String>,
    pub status: Option<String>,
    pub vpc_id: Option<String>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

impl InstanceFilter {
    pub fn is_empty(&self) -> bool {
        self.instance_ids.is_empty()
            && self.status.is_none()
            && self.vpc_id.is_none()
            && self.tags.is_empty()
    }

    /// Client-side check for adapters whose provider API cannot filter.
    pub fn matches(&self, meta: &InstanceMeta) -> bool {
        (self.instance_ids.is_empty() || self.instance_ids.contains(&meta.id))
            && self.status.as_ref().is_none_or(|s| *s == meta.status)
            && self
                .vpc_id
                .as_ref()
                .is_none_or(|v| meta.vpc_id.as_ref() == Some(v))
            && self
                .tags
                .iter()
                .all(|(k, v)| meta.tags.get(k) == Some(v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_matches_tags_and_ids() {
        let meta = InstanceMeta::new("i-1", "web", "cn-hangzhou")
            .with_status("Running")
            .with_tag("env", "prod");

        let filter = InstanceFilter {
            tags: BTreeMap::from([("env".to_string(), "prod".to_string())]),
            ..Default::default()
        };
        assert!(filter.matches(&meta));

        let filter = InstanceFilter {
            instance_ids: vec!["i-2".into()],
            ..Default::default()
        };
        assert!(!filter.matches(&meta));
        assert!(InstanceFilter::default().is_empty());
    }

    #[test]
    fn test_flattened_meta_serialization() {
        let vm = ComputeInstance {
            meta: InstanceMeta::new("i-1", "web", "us-east-1"),
            cpu: Some(2),
            ..Default::default()
        };
        let json = serde_json::to_value(&vm).unwrap();
        assert_eq!(json["id"], "i-1");
        assert_eq!(json["region"], "us-east-1");
        assert_eq!(json["cpu"], 2);
    }

    #[test]
    fn test_page_request_next_keeps_size() {
        let first = PageRequest::first(50);
        let second = first.next("tok");
        assert_eq!(second.page_size, 50);
        assert_eq!(second.token.as_deref(), Some("tok"));
    }
}
