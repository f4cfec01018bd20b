use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// Kinds of provider-side resources an adapter can expose.
///
/// Every kind except [`ResourceKind::Identity`] is reconciled into the asset
/// inventory under its own model uid. Identity backs the IAM user and policy
/// workflows instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Compute,
    RelationalDb,
    Cache,
    DocumentDb,
    Vpc,
    PublicIp,
    FileStorage,
    ObjectStorage,
    MessageQueue,
    SearchCluster,
    Identity,
}

impl ResourceKind {
    /// Kinds that are reconciled into the asset inventory, in sync order.
    pub const ASSETS: [ResourceKind; 10] = [
        ResourceKind::Compute,
        ResourceKind::RelationalDb,
        ResourceKind::Cache,
        ResourceKind::DocumentDb,
        ResourceKind::Vpc,
        ResourceKind::PublicIp,
        ResourceKind::FileStorage,
        ResourceKind::ObjectStorage,
        ResourceKind::MessageQueue,
        ResourceKind::SearchCluster,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Compute => "compute",
            ResourceKind::RelationalDb => "relational_db",
            ResourceKind::Cache => "cache",
            ResourceKind::DocumentDb => "document_db",
            ResourceKind::Vpc => "vpc",
            ResourceKind::PublicIp => "public_ip",
            ResourceKind::FileStorage => "file_storage",
            ResourceKind::ObjectStorage => "object_storage",
            ResourceKind::MessageQueue => "message_queue",
            ResourceKind::SearchCluster => "search_cluster",
            ResourceKind::Identity => "identity",
        }
    }

    /// Asset model uid this kind is stored under, `None` for identity.
    pub fn model_uid(&self) -> Option<&'static str> {
        match self {
            ResourceKind::Compute => Some("cloud_vm"),
            ResourceKind::RelationalDb => Some("cloud_rds"),
            ResourceKind::Cache => Some("cloud_redis"),
            ResourceKind::DocumentDb => Some("cloud_mongodb"),
            ResourceKind::Vpc => Some("cloud_vpc"),
            ResourceKind::PublicIp => Some("cloud_eip"),
            ResourceKind::FileStorage => Some("cloud_nas"),
            ResourceKind::ObjectStorage => Some("cloud_oss"),
            ResourceKind::MessageQueue => Some("cloud_kafka"),
            ResourceKind::SearchCluster => Some("cloud_elasticsearch"),
            ResourceKind::Identity => None,
        }
    }

    pub fn is_asset(&self) -> bool {
        self.model_uid().is_some()
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "compute" | "ecs" | "vm" => Ok(ResourceKind::Compute),
            "relational_db" | "rds" => Ok(ResourceKind::RelationalDb),
            "cache" | "redis" => Ok(ResourceKind::Cache),
            "document_db" | "mongodb" => Ok(ResourceKind::DocumentDb),
            "vpc" => Ok(ResourceKind::Vpc),
            "public_ip" | "eip" => Ok(ResourceKind::PublicIp),
            "file_storage" | "nas" => Ok(ResourceKind::FileStorage),
            "object_storage" | "oss" => Ok(ResourceKind::ObjectStorage),
            "message_queue" | "kafka" => Ok(ResourceKind::MessageQueue),
            "search_cluster" | "elasticsearch" => Ok(ResourceKind::SearchCluster),
            "identity" | "iam" => Ok(ResourceKind::Identity),
            _ => Err(CoreError::unknown_resource_kind(s)),
        }
    }
}
