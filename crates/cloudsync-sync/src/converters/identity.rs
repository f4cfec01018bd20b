//! Identity records -> local IAM model.

use cloudsync_cloud::{CloudUserRecord, PolicyRecord};
use cloudsync_core::{CloudAccount, Provider, now_utc};
use cloudsync_storage::{CloudUser, PolicyRef, PolicyType};

/// A provider user as seen by one account, stamped as freshly synced.
pub fn cloud_user(record: &CloudUserRecord, account: &CloudAccount) -> CloudUser {
    let username = if record.username.is_empty() {
        record.user_id.clone()
    } else {
        record.username.clone()
    };
    let mut user = CloudUser::new(
        &account.tenant_id,
        account.provider,
        account.id,
        &record.user_id,
        username,
    );
    user.display_name = record.display_name.clone().filter(|s| !s.is_empty());
    user.email = record.email.clone().filter(|s| !s.is_empty());
    user.last_synced_at = Some(now_utc());
    user
}

/// Copies provider-side profile fields onto an existing local user.
pub fn refresh_user(user: &mut CloudUser, record: &CloudUserRecord) {
    if !record.username.is_empty() {
        user.username = record.username.clone();
    }
    user.display_name = record.display_name.clone().filter(|s| !s.is_empty());
    user.email = record.email.clone().filter(|s| !s.is_empty());
    user.last_synced_at = Some(now_utc());
}

pub fn policy_ref(record: &PolicyRecord, provider: Provider) -> PolicyRef {
    let policy_type = match record.policy_type.as_deref() {
        Some(t) if t.eq_ignore_ascii_case("custom") => PolicyType::Custom,
        _ => PolicyType::System,
    };
    let policy = PolicyRef::new(&record.policy_id, provider).with_type(policy_type);
    if record.policy_name.is_empty() {
        policy
    } else {
        policy.with_name(&record.policy_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cloudsync_core::Credentials;

    #[test]
    fn test_user_record_conversion() {
        let account = CloudAccount::new(4, "t1", "prod", Provider::Huawei, Credentials::new("a", "b"));
        let record = CloudUserRecord {
            user_id: "u-1".into(),
            username: "alice".into(),
            email: Some(String::new()),
            ..Default::default()
        };
        let user = cloud_user(&record, &account);
        assert_eq!(user.key().cloud_user_id, "u-1");
        assert_eq!(user.cloud_account_id, 4);
        assert_eq!(user.provider, Provider::Huawei);
        assert_eq!(user.username, "alice");
        assert!(user.email.is_none());
        assert!(user.last_synced_at.is_some());
    }

    #[test]
    fn test_policy_type_parsing() {
        let record = PolicyRecord {
            policy_id: "ReadOnlyAccess".into(),
            policy_name: "Read only".into(),
            policy_type: Some("Custom".into()),
            description: None,
        };
        let policy = policy_ref(&record, Provider::Aliyun);
        assert_eq!(policy.policy_type, PolicyType::Custom);
        assert_eq!(policy.policy_name, "Read only");

        let system = policy_ref(
            &PolicyRecord {
                policy_id: "AdministratorAccess".into(),
                ..Default::default()
            },
            Provider::Aws,
        );
        assert_eq!(system.policy_type, PolicyType::System);
    }
}
