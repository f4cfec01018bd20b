//! The uniform capability contract each provider implements.
//!
//! A provider implements [`InstanceAdapter`] once per resource kind it supports,
//! plus [`IdentityAdapter`] for IAM. Every method has a default body returning
//! [`CloudError::NotImplemented`], so an adapter only writes the subset its SDK
//! offers.

use std::sync::Arc;

use async_trait::async_trait;
use cloudsync_core::ResourceKind;

use crate::CloudResult;
use crate::error::CloudError;
use crate::types::{
    CacheInstance, CloudGroupRecord, CloudUserRecord, ComputeInstance, CreateUserRequest,
    DocumentDbInstance, FileStorageInstance, InstanceFilter, InstanceMeta, MessageQueueInstance,
    ObjectStorageBucket, Page, PageRequest, PermissionChange, PolicyRecord, PublicIpInstance,
    RelationalDbInstance, SearchClusterInstance, VpcInstance,
};

/// A record type that one [`InstanceAdapter`] produces.
pub trait CloudRecord: Clone + Send + Sync + 'static {
    const KIND: ResourceKind;

    fn meta(&self) -> &InstanceMeta;

    /// The capability slot holding adapters for this record type.
    fn slot(caps: &Capabilities) -> Option<&Arc<dyn InstanceAdapter<Self>>>;

    fn slot_mut(caps: &mut Capabilities) -> &mut Option<Arc<dyn InstanceAdapter<Self>>>;
}

/// Instance operations for one resource kind.
#[async_trait]
pub trait InstanceAdapter<T: CloudRecord>: Send + Sync {
    /// Lists one page of instances in a region.
    async fn list_instances(&self, region: &str, page: &PageRequest) -> CloudResult<Page<T>> {
        let _ = (region, page);
        Err(CloudError::not_implemented(format!("{}::list_instances", T::KIND)))
    }

    async fn get_instance(&self, region: &str, instance_id: &str) -> CloudResult<T> {
        let _ = (region, instance_id);
        Err(CloudError::not_implemented(format!("{}::get_instance", T::KIND)))
    }

    async fn list_instances_by_ids(&self, region: &str, ids: &[String]) -> CloudResult<Vec<T>> {
        let _ = (region, ids);
        Err(CloudError::not_implemented(format!(
            "{}::list_instances_by_ids",
            T::KIND
        )))
    }

    /// Provider status string of one instance.
    async fn get_instance_status(&self, region: &str, instance_id: &str) -> CloudResult<String> {
        let _ = (region, instance_id);
        Err(CloudError::not_implemented(format!(
            "{}::get_instance_status",
            T::KIND
        )))
    }

    async fn list_instances_with_filter(
        &self,
        region: &str,
        filter: &InstanceFilter,
        page: &PageRequest,
    ) -> CloudResult<Page<T>> {
        let _ = (region, filter, page);
        Err(CloudError::not_implemented(format!(
            "{}::list_instances_with_filter",
            T::KIND
        )))
    }
}

/// IAM operations. Identity is account-global, so nothing here takes a region.
#[async_trait]
pub trait IdentityAdapter: Send + Sync {
    async fn validate_credentials(&self) -> CloudResult<()> {
        Err(CloudError::not_implemented("identity::validate_credentials"))
    }

    async fn list_users(&self, page: &PageRequest) -> CloudResult<Page<CloudUserRecord>> {
        let _ = page;
        Err(CloudError::not_implemented("identity::list_users"))
    }

    async fn get_user(&self, user_id: &str) -> CloudResult<CloudUserRecord> {
        let _ = user_id;
        Err(CloudError::not_implemented("identity::get_user"))
    }

    async fn create_user(&self, request: &CreateUserRequest) -> CloudResult<CloudUserRecord> {
        let _ = request;
        Err(CloudError::not_implemented("identity::create_user"))
    }

    async fn delete_user(&self, user_id: &str) -> CloudResult<()> {
        let _ = user_id;
        Err(CloudError::not_implemented("identity::delete_user"))
    }

    /// Attaches and detaches policies on a user in one logical update.
    async fn update_user_permissions(
        &self,
        user_id: &str,
        change: &PermissionChange,
    ) -> CloudResult<()> {
        let _ = (user_id, change);
        Err(CloudError::not_implemented("identity::update_user_permissions"))
    }

    async fn list_policies(&self, page: &PageRequest) -> CloudResult<Page<PolicyRecord>> {
        let _ = page;
        Err(CloudError::not_implemented("identity::list_policies"))
    }

    async fn get_policy(&self, policy_id: &str) -> CloudResult<PolicyRecord> {
        let _ = policy_id;
        Err(CloudError::not_implemented("identity::get_policy"))
    }

    /// Policies currently attached directly to a user.
    async fn get_user_policies(&self, user_id: &str) -> CloudResult<Vec<PolicyRecord>> {
        let _ = user_id;
        Err(CloudError::not_implemented("identity::get_user_policies"))
    }

    async fn list_groups(&self, page: &PageRequest) -> CloudResult<Page<CloudGroupRecord>> {
        let _ = page;
        Err(CloudError::not_implemented("identity::list_groups"))
    }

    async fn get_group(&self, group_id: &str) -> CloudResult<CloudGroupRecord> {
        let _ = group_id;
        Err(CloudError::not_implemented("identity::get_group"))
    }

    async fn create_group(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> CloudResult<CloudGroupRecord> {
        let _ = (name, description);
        Err(CloudError::not_implemented("identity::create_group"))
    }

    async fn delete_group(&self, group_id: &str) -> CloudResult<()> {
        let _ = group_id;
        Err(CloudError::not_implemented("identity::delete_group"))
    }

    async fn update_group_permissions(
        &self,
        group_id: &str,
        change: &PermissionChange,
    ) -> CloudResult<()> {
        let _ = (group_id, change);
        Err(CloudError::not_implemented("identity::update_group_permissions"))
    }

    async fn add_user_to_group(&self, group_id: &str, user_id: &str) -> CloudResult<()> {
        let _ = (group_id, user_id);
        Err(CloudError::not_implemented("identity::add_user_to_group"))
    }

    async fn remove_user_from_group(&self, group_id: &str, user_id: &str) -> CloudResult<()> {
        let _ = (group_id, user_id);
        Err(CloudError::not_implemented("identity::remove_user_from_group"))
    }
}

/// The set of capabilities one provider offers for one account.
///
/// An empty slot means the kind is unsupported on that provider.
#[derive(Default, Clone)]
pub struct Capabilities {
    pub compute: Option<Arc<dyn InstanceAdapter<ComputeInstance>>>,
    pub relational_db: Option<Arc<dyn InstanceAdapter<RelationalDbInstance>>>,
    pub cache: Option<Arc<dyn InstanceAdapter<CacheInstance>>>,
    pub document_db: Option<Arc<dyn InstanceAdapter<DocumentDbInstance>>>,
    pub vpc: Option<Arc<dyn InstanceAdapter<VpcInstance>>>,
    pub public_ip: Option<Arc<dyn InstanceAdapter<PublicIpInstance>>>,
    pub file_storage: Option<Arc<dyn InstanceAdapter<FileStorageInstance>>>,
    pub object_storage: Option<Arc<dyn InstanceAdapter<ObjectStorageBucket>>>,
    pub message_queue: Option<Arc<dyn InstanceAdapter<MessageQueueInstance>>>,
    pub search_cluster: Option<Arc<dyn InstanceAdapter<SearchClusterInstance>>>,
    pub identity: Option<Arc<dyn IdentityAdapter>>,
}

impl Capabilities {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the adapter for record type `T`, replacing any previous one.
    pub fn with_instances<T: CloudRecord>(mut self, adapter: Arc<dyn InstanceAdapter<T>>) -> Self {
        *T::slot_mut(&mut self) = Some(adapter);
        self
    }

    pub fn with_identity(mut self, adapter: Arc<dyn IdentityAdapter>) -> Self {
        self.identity = Some(adapter);
        self
    }

    pub fn supports(&self, kind: ResourceKind) -> bool {
        match kind {
            ResourceKind::Compute => self.compute.is_some(),
            ResourceKind::RelationalDb => self.relational_db.is_some(),
            ResourceKind::Cache => self.cache.is_some(),
            ResourceKind::DocumentDb => self.document_db.is_some(),
            ResourceKind::Vpc => self.vpc.is_some(),
            ResourceKind::PublicIp => self.public_ip.is_some(),
            ResourceKind::FileStorage => self.file_storage.is_some(),
            ResourceKind::ObjectStorage => self.object_storage.is_some(),
            ResourceKind::MessageQueue => self.message_queue.is_some(),
            ResourceKind::SearchCluster => self.search_cluster.is_some(),
            ResourceKind::Identity => self.identity.is_some(),
        }
    }

    /// Supported kinds, in [`ResourceKind::ASSETS`] order followed by identity.
    pub fn supported_kinds(&self) -> Vec<ResourceKind> {
        ResourceKind::ASSETS
            .into_iter()
            .chain([ResourceKind::Identity])
            .filter(|kind| self.supports(*kind))
            .collect()
    }
}

impl std::fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Capabilities")
            .field("supported", &self.supported_kinds())
            .finish()
    }
}

macro_rules! cloud_record {
    ($record:ty, $kind:ident, $slot:ident) => {
        impl CloudRecord for $record {
            const KIND: ResourceKind = ResourceKind::$kind;

            fn meta(&self) -> &InstanceMeta {
                &self.meta
            }

            fn slot(caps: &Capabilities) -> Option<&Arc<dyn InstanceAdapter<Self>>> {
                caps.$slot.as_ref()
            }

            fn slot_mut(caps: &mut Capabilities) -> &mut Option<Arc<dyn InstanceAdapter<Self>>> {
                &mut caps.$slot
            }
        }
    };
}

cloud_record!(ComputeInstance, Compute, compute);
cloud_record!(RelationalDbInstance, RelationalDb, relational_db);
cloud_record!(CacheInstance, Cache, cache);
cloud_record!(DocumentDbInstance, DocumentDb, document_db);
cloud_record!(VpcInstance, Vpc, vpc);
cloud_record!(PublicIpInstance, PublicIp, public_ip);
cloud_record!(FileStorageInstance, FileStorage, file_storage);
cloud_record!(ObjectStorageBucket, ObjectStorage, object_storage);
cloud_record!(MessageQueueInstance, MessageQueue, message_queue);
cloud_record!(SearchClusterInstance, SearchCluster, search_cluster);
