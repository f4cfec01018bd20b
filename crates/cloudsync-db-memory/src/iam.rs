//! Accounts, permission groups, cloud users and the policy audit trail.

use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use cloudsync_core::CloudAccount;
use cloudsync_storage::{
    AccountFilter, CloudAccountStorage, CloudUser, CloudUserKey, CloudUserStorage, GroupFilter,
    PermissionGroup, PermissionGroupStorage, PolicyAuditStorage, PolicyChangeRecord, PolicyRef,
    StorageError, UserFilter, UserStatus, dedupe_policies,
};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use time::OffsetDateTime;

use crate::paginate;

/// Account lookup backed by a map the host seeds at startup.
#[derive(Debug, Default)]
pub struct InMemoryAccountStorage {
    data: DashMap<i64, CloudAccount>,
}

impl InMemoryAccountStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces an account. Accounts are owned outside the sync core;
    /// this is the seeding hook.
    pub fn insert(&self, account: CloudAccount) {
        self.data.insert(account.id, account);
    }

    pub fn remove(&self, id: i64) -> Option<CloudAccount> {
        self.data.remove(&id).map(|(_, account)| account)
    }
}

#[async_trait]
impl CloudAccountStorage for InMemoryAccountStorage {
    async fn get_by_id(&self, id: i64) -> Result<Option<CloudAccount>, StorageError> {
        Ok(self.data.get(&id).map(|entry| entry.value().clone()))
    }

    async fn list(&self, filter: &AccountFilter) -> Result<Vec<CloudAccount>, StorageError> {
        let mut accounts: Vec<CloudAccount> = self
            .data
            .iter()
            .filter(|entry| filter.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        accounts.sort_by_key(|a| a.id);
        Ok(accounts)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryGroupStorage {
    data: DashMap<i64, PermissionGroup>,
}

impl InMemoryGroupStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PermissionGroupStorage for InMemoryGroupStorage {
    async fn get_by_id(&self, id: i64) -> Result<Option<PermissionGroup>, StorageError> {
        Ok(self.data.get(&id).map(|entry| entry.value().clone()))
    }

    async fn list(&self, filter: &GroupFilter) -> Result<Vec<PermissionGroup>, StorageError> {
        let mut groups: Vec<PermissionGroup> = self
            .data
            .iter()
            .filter(|entry| filter.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        groups.sort_by_key(|g| g.id);
        Ok(groups)
    }

    async fn save(&self, group: &PermissionGroup) -> Result<(), StorageError> {
        let mut group = group.clone();
        group.policies = dedupe_policies(group.policies);
        self.data.insert(group.id, group);
        Ok(())
    }

    async fn update_policies(
        &self,
        id: i64,
        policies: Vec<PolicyRef>,
    ) -> Result<PermissionGroup, StorageError> {
        let mut entry = self
            .data
            .get_mut(&id)
            .ok_or_else(|| StorageError::not_found("PermissionGroup", id))?;
        let previous = entry.value().clone();
        let group = entry.value_mut();
        group.policies = dedupe_policies(policies);
        group.updated_at = OffsetDateTime::now_utc();
        Ok(previous)
    }
}

/// Cloud users with a secondary index on the natural key.
#[derive(Debug)]
pub struct InMemoryUserStorage {
    data: DashMap<i64, CloudUser>,
    by_key: DashMap<CloudUserKey, i64>,
    next_id: AtomicI64,
}

impl Default for InMemoryUserStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryUserStorage {
    pub fn new() -> Self {
        Self {
            data: DashMap::new(),
            by_key: DashMap::new(),
            next_id: AtomicI64::new(1),
        }
    }
}

#[async_trait]
impl CloudUserStorage for InMemoryUserStorage {
    async fn get_by_id(&self, id: i64) -> Result<Option<CloudUser>, StorageError> {
        Ok(self.data.get(&id).map(|entry| entry.value().clone()))
    }

    async fn find_by_key(&self, key: &CloudUserKey) -> Result<Option<CloudUser>, StorageError> {
        let Some(id) = self.by_key.get(key).map(|entry| *entry.value()) else {
            return Ok(None);
        };
        self.get_by_id(id).await
    }

    async fn list(&self, filter: &UserFilter) -> Result<Vec<CloudUser>, StorageError> {
        let mut users: Vec<CloudUser> = self
            .data
            .iter()
            .filter(|entry| filter.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        users.sort_by_key(|u| u.id);
        Ok(paginate(users, filter.offset, filter.limit))
    }

    async fn upsert(&self, user: &CloudUser) -> Result<CloudUser, StorageError> {
        if user.cloud_user_id.is_empty() {
            return Err(StorageError::invalid_record("cloud_user_id must not be empty"));
        }
        let now = OffsetDateTime::now_utc();
        match self.by_key.entry(user.key()) {
            Entry::Occupied(slot) => {
                let id = *slot.get();
                let mut entry = self
                    .data
                    .get_mut(&id)
                    .ok_or_else(|| StorageError::internal(format!("user index points at missing id {id}")))?;
                let stored = entry.value_mut();
                stored.username = user.username.clone();
                stored.display_name = user.display_name.clone();
                stored.email = user.email.clone();
                stored.status = user.status;
                stored.last_synced_at = user.last_synced_at;
                stored.updated_at = now;
                Ok(stored.clone())
            }
            Entry::Vacant(slot) => {
                let id = self.next_id.fetch_add(1, Ordering::SeqCst);
                let mut stored = user.clone();
                stored.id = id;
                stored.personal_policies = dedupe_policies(stored.personal_policies);
                stored.updated_at = now;
                self.data.insert(id, stored.clone());
                slot.insert(id);
                Ok(stored)
            }
        }
    }

    async fn mark_deleted(&self, id: i64) -> Result<(), StorageError> {
        let mut entry = self
            .data
            .get_mut(&id)
            .ok_or_else(|| StorageError::not_found("CloudUser", id))?;
        let user = entry.value_mut();
        user.status = UserStatus::Deleted;
        user.updated_at = OffsetDateTime::now_utc();
        Ok(())
    }
}

#[derive(Debug)]
pub struct InMemoryPolicyAuditStorage {
    data: DashMap<i64, PolicyChangeRecord>,
    next_id: AtomicI64,
}

impl Default for InMemoryPolicyAuditStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryPolicyAuditStorage {
    pub fn new() -> Self {
        Self {
            data: DashMap::new(),
            next_id: AtomicI64::new(1),
        }
    }
}

#[async_trait]
impl PolicyAuditStorage for InMemoryPolicyAuditStorage {
    async fn record(
        &self,
        mut change: PolicyChangeRecord,
    ) -> Result<PolicyChangeRecord, StorageError> {
        change.id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.data.insert(change.id, change.clone());
        Ok(change)
    }

    async fn list_for_group(
        &self,
        group_id: i64,
    ) -> Result<Vec<PolicyChangeRecord>, StorageError> {
        let mut changes: Vec<PolicyChangeRecord> = self
            .data
            .iter()
            .filter(|entry| entry.value().group_id == group_id)
            .map(|entry| entry.value().clone())
            .collect();
        changes.sort_by_key(|c| c.id);
        Ok(changes)
    }
}
