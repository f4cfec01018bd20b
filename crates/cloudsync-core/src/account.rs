//! Cloud account records.
//!
//! Accounts are owned by the tenant/account management screens; the sync core
//! only reads them to resolve credentials, regions and eligibility.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use time::OffsetDateTime;

use crate::error::CoreError;
use crate::provider::Provider;

/// Lifecycle status of a cloud account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    Active,
    Disabled,
    Testing,
    Error,
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountStatus::Active => write!(f, "active"),
            AccountStatus::Disabled => write!(f, "disabled"),
            AccountStatus::Testing => write!(f, "testing"),
            AccountStatus::Error => write!(f, "error"),
        }
    }
}

impl FromStr for AccountStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(AccountStatus::Active),
            "disabled" => Ok(AccountStatus::Disabled),
            "testing" => Ok(AccountStatus::Testing),
            "error" => Ok(AccountStatus::Error),
            _ => Err(CoreError::UnknownAccountStatus(s.to_string())),
        }
    }
}

/// Access credentials for one provider account.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub access_key_id: String,
    pub access_key_secret: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_token: Option<String>,
}

impl Credentials {
    pub fn new(access_key_id: impl Into<String>, access_key_secret: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            access_key_secret: access_key_secret.into(),
            session_token: None,
        }
    }

    /// Both halves of the key pair must be present.
    pub fn is_empty(&self) -> bool {
        self.access_key_id.trim().is_empty() || self.access_key_secret.trim().is_empty()
    }
}

// Secrets never reach log output.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("access_key_secret", &"***")
            .field("session_token", &self.session_token.as_ref().map(|_| "***"))
            .finish()
    }
}

/// A provider account registered by a tenant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloudAccount {
    pub id: i64,
    pub tenant_id: String,
    pub name: String,
    pub provider: Provider,
    pub status: AccountStatus,
    pub credentials: Credentials,
    /// Regions enabled for synchronization
    #[serde(default)]
    pub regions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_region: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl CloudAccount {
    pub fn new(
        id: i64,
        tenant_id: impl Into<String>,
        name: impl Into<String>,
        provider: Provider,
        credentials: Credentials,
    ) -> Self {
        Self {
            id,
            tenant_id: tenant_id.into(),
            name: name.into(),
            provider,
            status: AccountStatus::Active,
            credentials,
            regions: Vec::new(),
            default_region: None,
            updated_at: OffsetDateTime::now_utc(),
        }
    }

    pub fn with_regions<I, S>(mut self, regions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.regions = regions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_status(mut self, status: AccountStatus) -> Self {
        self.status = status;
        self
    }

    /// Only active accounts may be scheduled or handed to an adapter.
    pub fn is_active(&self) -> bool {
        self.status == AccountStatus::Active
    }

    /// Region used for global calls (identity, object storage listing).
    pub fn primary_region(&self) -> Option<&str> {
        self.default_region
            .as_deref()
            .or_else(|| self.regions.first().map(String::as_str))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_debug_masks_secret() {
        let creds = Credentials::new("AKID", "super-secret");
        let debug = format!("{creds:?}");
        assert!(debug.contains("AKID"));
        assert!(!debug.contains("super-secret"));
    }

    #[test]
    fn test_credentials_empty() {
        assert!(Credentials::default().is_empty());
        assert!(Credentials::new("AKID", "  ").is_empty());
        assert!(!Credentials::new("AKID", "secret").is_empty());
    }

    #[test]
    fn test_primary_region_prefers_default() {
        let mut account = CloudAccount::new(1, "t1", "prod", Provider::Aliyun, Credentials::default())
            .with_regions(["cn-hangzhou", "cn-beijing"]);
        assert_eq!(account.primary_region(), Some("cn-hangzhou"));
        account.default_region = Some("cn-shanghai".into());
        assert_eq!(account.primary_region(), Some("cn-shanghai"));
    }

    #[test]
    fn test_account_status_gates_activity() {
        let account = CloudAccount::new(1, "t1", "prod", Provider::Aws, Credentials::default())
            .with_status(AccountStatus::Testing);
        assert!(!account.is_active());
        assert_eq!("disabled".parse::<AccountStatus>().unwrap(), AccountStatus::Disabled);
    }
}
