use std::sync::Arc;

use cloudsync_storage::{
    DynAssetStorage, DynCloudAccountStorage, DynCloudUserStorage, DynPermissionGroupStorage,
    DynPolicyAuditStorage, DynSyncTaskStorage,
};

use crate::{
    InMemoryAccountStorage, InMemoryAssetStorage, InMemoryGroupStorage,
    InMemoryPolicyAuditStorage, InMemorySyncTaskStorage, InMemoryUserStorage,
};

/// One instance of every in-memory store.
///
/// The concrete handles stay reachable so hosts and tests can seed accounts,
/// groups and users before handing the trait objects to the sync service.
#[derive(Debug, Clone)]
pub struct MemoryStores {
    pub assets: Arc<InMemoryAssetStorage>,
    pub tasks: Arc<InMemorySyncTaskStorage>,
    pub accounts: Arc<InMemoryAccountStorage>,
    pub groups: Arc<InMemoryGroupStorage>,
    pub users: Arc<InMemoryUserStorage>,
    pub audit: Arc<InMemoryPolicyAuditStorage>,
}

impl MemoryStores {
    pub fn asset_storage(&self) -> DynAssetStorage {
        self.assets.clone()
    }

    pub fn task_storage(&self) -> DynSyncTaskStorage {
        self.tasks.clone()
    }

    pub fn account_storage(&self) -> DynCloudAccountStorage {
        self.accounts.clone()
    }

    pub fn group_storage(&self) -> DynPermissionGroupStorage {
        self.groups.clone()
    }

    pub fn user_storage(&self) -> DynCloudUserStorage {
        self.users.clone()
    }

    pub fn audit_storage(&self) -> DynPolicyAuditStorage {
        self.audit.clone()
    }
}

/// Creates an empty set of in-memory stores.
pub fn create_memory_stores() -> MemoryStores {
    MemoryStores {
        assets: Arc::new(InMemoryAssetStorage::new()),
        tasks: Arc::new(InMemorySyncTaskStorage::new()),
        accounts: Arc::new(InMemoryAccountStorage::new()),
        groups: Arc::new(InMemoryGroupStorage::new()),
        users: Arc::new(InMemoryUserStorage::new()),
        audit: Arc::new(InMemoryPolicyAuditStorage::new()),
    }
}
