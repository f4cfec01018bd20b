use cloudsync_core::Provider;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use time::OffsetDateTime;

/// Whether a policy is provider-managed or tenant-defined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyType {
    #[default]
    System,
    Custom,
}

/// Identity of a policy within a policy set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PolicyKey {
    pub policy_id: String,
    pub provider: Provider,
}

impl fmt::Display for PolicyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.provider, self.policy_id)
    }
}

/// A reference to a provider-side permission policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyRef {
    pub policy_id: String,
    pub policy_name: String,
    #[serde(default)]
    pub policy_type: PolicyType,
    pub provider: Provider,
}

impl PolicyRef {
    pub fn new(policy_id: impl Into<String>, provider: Provider) -> Self {
        let policy_id = policy_id.into();
        Self {
            policy_name: policy_id.clone(),
            policy_id,
            policy_type: PolicyType::System,
            provider,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.policy_name = name.into();
        self
    }

    pub fn with_type(mut self, policy_type: PolicyType) -> Self {
        self.policy_type = policy_type;
        self
    }

    pub fn key(&self) -> PolicyKey {
        PolicyKey {
            policy_id: self.policy_id.clone(),
            provider: self.provider,
        }
    }
}

/// Drop repeated `(policy_id, provider)` entries, keeping the first occurrence.
pub fn dedupe_policies(policies: Vec<PolicyRef>) -> Vec<PolicyRef> {
    let mut seen = HashSet::new();
    policies
        .into_iter()
        .filter(|p| seen.insert(p.key()))
        .collect()
}

/// A tenant-defined bundle of policies targeting one or more providers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermissionGroup {
    pub id: i64,
    pub tenant_id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Providers this group's policies are pushed to.
    #[serde(default)]
    pub cloud_platforms: Vec<Provider>,
    #[serde(default)]
    pub policies: Vec<PolicyRef>,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl PermissionGroup {
    pub fn new(id: i64, tenant_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id,
            tenant_id: tenant_id.into(),
            name: name.into(),
            description: None,
            cloud_platforms: Vec::new(),
            policies: Vec::new(),
            updated_at: OffsetDateTime::now_utc(),
        }
    }

    pub fn with_platforms(mut self, platforms: impl IntoIterator<Item = Provider>) -> Self {
        self.cloud_platforms = platforms.into_iter().collect();
        self
    }

    pub fn with_policies(mut self, policies: Vec<PolicyRef>) -> Self {
        self.policies = dedupe_policies(policies);
        self
    }

    pub fn policies_for(&self, provider: Provider) -> impl Iterator<Item = &PolicyRef> {
        self.policies.iter().filter(move |p| p.provider == provider)
    }
}

/// Status of a locally tracked cloud identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    #[default]
    Active,
    Inactive,
    /// Absent from the latest provider listing. Soft delete only.
    Deleted,
}

impl fmt::Display for UserStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserStatus::Active => write!(f, "active"),
            UserStatus::Inactive => write!(f, "inactive"),
            UserStatus::Deleted => write!(f, "deleted"),
        }
    }
}

/// Natural identity of a cloud user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CloudUserKey {
    pub tenant_id: String,
    pub provider: Provider,
    pub cloud_account_id: i64,
    pub cloud_user_id: String,
}

/// A provider-side identity tracked by the inventory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudUser {
    /// Local numeric id, assigned by the store.
    pub id: i64,
    pub tenant_id: String,
    pub provider: Provider,
    pub cloud_account_id: i64,
    pub cloud_user_id: String,
    pub username: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub status: UserStatus,
    /// Permission group ids this user belongs to.
    #[serde(default)]
    pub permission_groups: Vec<i64>,
    #[serde(default)]
    pub personal_policies: Vec<PolicyRef>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub last_synced_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl CloudUser {
    pub fn new(
        tenant_id: impl Into<String>,
        provider: Provider,
        cloud_account_id: i64,
        cloud_user_id: impl Into<String>,
        username: impl Into<String>,
    ) -> Self {
        Self {
            id: 0,
            tenant_id: tenant_id.into(),
            provider,
            cloud_account_id,
            cloud_user_id: cloud_user_id.into(),
            username: username.into(),
            display_name: None,
            email: None,
            status: UserStatus::Active,
            permission_groups: Vec::new(),
            personal_policies: Vec::new(),
            last_synced_at: None,
            updated_at: OffsetDateTime::now_utc(),
        }
    }

    pub fn with_groups(mut self, groups: impl IntoIterator<Item = i64>) -> Self {
        self.permission_groups = groups.into_iter().collect();
        self
    }

    pub fn key(&self) -> CloudUserKey {
        CloudUserKey {
            tenant_id: self.tenant_id.clone(),
            provider: self.provider,
            cloud_account_id: self.cloud_account_id,
            cloud_user_id: self.cloud_user_id.clone(),
        }
    }

    pub fn in_group(&self, group_id: i64) -> bool {
        self.permission_groups.contains(&group_id)
    }
}

/// Filter for listing cloud users.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserFilter {
    pub tenant_id: Option<String>,
    pub provider: Option<Provider>,
    pub cloud_account_id: Option<i64>,
    pub status: Option<UserStatus>,
    pub group_id: Option<i64>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl UserFilter {
    pub fn matches(&self, user: &CloudUser) -> bool {
        self.tenant_id.as_ref().is_none_or(|t| *t == user.tenant_id)
            && self.provider.is_none_or(|p| p == user.provider)
            && self
                .cloud_account_id
                .is_none_or(|a| a == user.cloud_account_id)
            && self.status.is_none_or(|s| s == user.status)
            && self.group_id.is_none_or(|g| user.in_group(g))
    }
}

/// Filter for listing permission groups.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GroupFilter {
    pub tenant_id: Option<String>,
    pub provider: Option<Provider>,
}

impl GroupFilter {
    pub fn matches(&self, group: &PermissionGroup) -> bool {
        self.tenant_id.as_ref().is_none_or(|t| *t == group.tenant_id)
            && self
                .provider
                .is_none_or(|p| group.cloud_platforms.contains(&p))
    }
}

/// Audit entry for one edit of a group's policy set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyChangeRecord {
    pub id: i64,
    pub group_id: i64,
    pub tenant_id: String,
    pub old_policies: Vec<PolicyRef>,
    pub new_policies: Vec<PolicyRef>,
    pub operator: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub changed_at: OffsetDateTime,
}
