use cloudsync_storage::{
    DynAssetStorage, DynCloudAccountStorage, DynCloudUserStorage, DynPermissionGroupStorage,
    DynPolicyAuditStorage, DynSyncTaskStorage,
};

/// The persistence collaborators the sync engine consumes.
#[derive(Clone)]
pub struct SyncStores {
    pub assets: DynAssetStorage,
    pub tasks: DynSyncTaskStorage,
    pub accounts: DynCloudAccountStorage,
    pub groups: DynPermissionGroupStorage,
    pub users: DynCloudUserStorage,
    pub audit: DynPolicyAuditStorage,
}

impl std::fmt::Debug for SyncStores {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncStores").finish_non_exhaustive()
    }
}
