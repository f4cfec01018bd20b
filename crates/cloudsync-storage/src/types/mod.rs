//! Record types used by the storage traits.

mod asset;
mod iam;
mod task;

use cloudsync_core::{AccountStatus, CloudAccount, Provider};
use serde::{Deserialize, Serialize};

pub use asset::{Asset, AssetFilter, AssetKey};
pub use iam::{
    CloudUser, CloudUserKey, GroupFilter, PermissionGroup, PolicyChangeRecord, PolicyKey,
    PolicyRef, PolicyType, UserFilter, UserStatus, dedupe_policies,
};
pub use task::{
    DEFAULT_MAX_RETRIES, NewSyncTask, SyncSummary, SyncTask, SyncTaskFilter, SyncTaskKind,
    SyncTaskStatus, TargetKind, TaskTransition, TaskTrigger,
};

/// Filter for listing cloud accounts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountFilter {
    pub tenant_id: Option<String>,
    pub provider: Option<Provider>,
    pub status: Option<AccountStatus>,
}

impl AccountFilter {
    pub fn matches(&self, account: &CloudAccount) -> bool {
        self.tenant_id.as_ref().is_none_or(|t| *t == account.tenant_id)
            && self.provider.is_none_or(|p| p == account.provider)
            && self.status.is_none_or(|s| s == account.status)
    }
}
