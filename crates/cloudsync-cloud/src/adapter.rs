//! A live, account-scoped adapter.

use std::future::Future;
use std::sync::Arc;

use cloudsync_core::{CloudAccount, Provider, ResourceKind};
use serde::{Deserialize, Serialize};

use crate::capability::{Capabilities, CloudRecord, IdentityAdapter, InstanceAdapter};
use crate::CloudResult;
use crate::error::CloudError;
use crate::rate_limit::{RateLimitSettings, RateLimiter};
use crate::registry::AdapterBuilder;
use crate::retry::{BackoffPolicy, with_backoff};
use crate::types::{
    CloudUserRecord, InstanceFilter, Page, PageRequest, PermissionChange, PolicyRecord,
};

/// Call-gating settings applied to every adapter the factory builds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AdapterSettings {
    pub rate_limit: RateLimitSettings,
    pub backoff: BackoffPolicy,
}

/// The capability set of one provider bound to one account.
///
/// Every outbound call made through [`CloudAdapter::call`] (and the typed
/// helpers built on it) first takes a token from the adapter's own rate
/// limiter, then runs under the retry-with-backoff policy with the provider's
/// throttling classifier.
pub struct CloudAdapter {
    provider: Provider,
    account_id: i64,
    capabilities: Capabilities,
    limiter: RateLimiter,
    backoff: BackoffPolicy,
    builder: Arc<dyn AdapterBuilder>,
}

impl CloudAdapter {
    pub fn new(
        account: &CloudAccount,
        capabilities: Capabilities,
        settings: &AdapterSettings,
        builder: Arc<dyn AdapterBuilder>,
    ) -> Self {
        Self {
            provider: account.provider,
            account_id: account.id,
            capabilities,
            limiter: RateLimiter::new(settings.rate_limit),
            backoff: settings.backoff,
            builder,
        }
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    pub fn account_id(&self) -> i64 {
        self.account_id
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    pub fn supports(&self, kind: ResourceKind) -> bool {
        self.capabilities.supports(kind)
    }

    /// The adapter for record type `T`, or `Unsupported` when the provider has none.
    pub fn instances<T: CloudRecord>(&self) -> CloudResult<&dyn InstanceAdapter<T>> {
        T::slot(&self.capabilities)
            .map(|adapter| adapter.as_ref())
            .ok_or(CloudError::Unsupported {
                provider: self.provider,
                kind: T::KIND,
            })
    }

    pub fn identity(&self) -> CloudResult<&dyn IdentityAdapter> {
        self.capabilities
            .identity
            .as_deref()
            .ok_or(CloudError::Unsupported {
                provider: self.provider,
                kind: ResourceKind::Identity,
            })
    }

    /// Runs one provider call behind the rate limiter and the backoff helper.
    pub async fn call<T, F, Fut>(&self, operation: &str, mut op: F) -> CloudResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = CloudResult<T>>,
    {
        let limiter = &self.limiter;
        let result = with_backoff(
            &self.backoff,
            || {
                let fut = op();
                async move {
                    limiter.acquire().await;
                    fut.await
                }
            },
            |err| self.builder.is_retryable(err),
        )
        .await;

        if let Err(err) = &result {
            tracing::debug!(
                provider = %self.provider,
                account_id = self.account_id,
                operation,
                error = %err,
                "Provider call failed"
            );
        }
        result
    }

    pub async fn list_instances<T: CloudRecord>(
        &self,
        region: &str,
        page: &PageRequest,
    ) -> CloudResult<Page<T>> {
        let adapter = self.instances::<T>()?;
        self.call("list_instances", || adapter.list_instances(region, page))
            .await
    }

    pub async fn list_instances_with_filter<T: CloudRecord>(
        &self,
        region: &str,
        filter: &InstanceFilter,
        page: &PageRequest,
    ) -> CloudResult<Page<T>> {
        let adapter = self.instances::<T>()?;
        self.call("list_instances_with_filter", || {
            adapter.list_instances_with_filter(region, filter, page)
        })
        .await
    }

    pub async fn get_instance<T: CloudRecord>(&self, region: &str, id: &str) -> CloudResult<T> {
        let adapter = self.instances::<T>()?;
        self.call("get_instance", || adapter.get_instance(region, id))
            .await
    }

    pub async fn list_instances_by_ids<T: CloudRecord>(
        &self,
        region: &str,
        ids: &[String],
    ) -> CloudResult<Vec<T>> {
        let adapter = self.instances::<T>()?;
        self.call("list_instances_by_ids", || {
            adapter.list_instances_by_ids(region, ids)
        })
        .await
    }

    pub async fn get_instance_status<T: CloudRecord>(
        &self,
        region: &str,
        id: &str,
    ) -> CloudResult<String> {
        let adapter = self.instances::<T>()?;
        self.call("get_instance_status", || {
            adapter.get_instance_status(region, id)
        })
        .await
    }

    pub async fn validate_credentials(&self) -> CloudResult<()> {
        let identity = self.identity()?;
        self.call("validate_credentials", || identity.validate_credentials())
            .await
    }

    pub async fn list_users(&self, page: &PageRequest) -> CloudResult<Page<CloudUserRecord>> {
        let identity = self.identity()?;
        self.call("list_users", || identity.list_users(page)).await
    }

    pub async fn get_user(&self, user_id: &str) -> CloudResult<CloudUserRecord> {
        let identity = self.identity()?;
        self.call("get_user", || identity.get_user(user_id)).await
    }

    pub async fn get_user_policies(&self, user_id: &str) -> CloudResult<Vec<PolicyRecord>> {
        let identity = self.identity()?;
        self.call("get_user_policies", || identity.get_user_policies(user_id))
            .await
    }

    pub async fn update_user_permissions(
        &self,
        user_id: &str,
        change: &PermissionChange,
    ) -> CloudResult<()> {
        let identity = self.identity()?;
        self.call("update_user_permissions", || {
            identity.update_user_permissions(user_id, change)
        })
        .await
    }
}

impl std::fmt::Debug for CloudAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudAdapter")
            .field("provider", &self.provider)
            .field("account_id", &self.account_id)
            .field("capabilities", &self.capabilities)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ComputeInstance, InstanceMeta, VpcInstance};
    use async_trait::async_trait;
    use cloudsync_core::Credentials;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    struct FlakyCompute {
        calls: AtomicU32,
    }

    #[async_trait]
    impl InstanceAdapter<ComputeInstance> for FlakyCompute {
        async fn list_instances(
            &self,
            region: &str,
            _page: &PageRequest,
        ) -> CloudResult<Page<ComputeInstance>> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                return Err(CloudError::api("Throttling.User", "Request was denied due to user flow control."));
            }
            Ok(Page::last(vec![ComputeInstance {
                meta: InstanceMeta::new("i-1", "web", region),
                ..Default::default()
            }]))
        }
    }

    struct Builder;

    impl AdapterBuilder for Builder {
        fn provider(&self) -> Provider {
            Provider::Aliyun
        }

        fn build(&self, _account: &CloudAccount) -> CloudResult<Capabilities> {
            Ok(Capabilities::new().with_instances::<ComputeInstance>(Arc::new(FlakyCompute {
                calls: AtomicU32::new(0),
            })))
        }
    }

    fn adapter() -> CloudAdapter {
        let account = CloudAccount::new(1, "t1", "prod", Provider::Aliyun, Credentials::new("ak", "sk"));
        let builder: Arc<dyn AdapterBuilder> = Arc::new(Builder);
        let caps = builder.build(&account).unwrap();
        let settings = AdapterSettings {
            backoff: BackoffPolicy::new(3, Duration::from_secs(1), Duration::from_secs(5)),
            ..Default::default()
        };
        CloudAdapter::new(&account, caps, &settings, builder)
    }

    #[tokio::test(start_paused = true)]
    async fn test_throttled_call_is_retried_with_provider_classifier() {
        let adapter = adapter();
        let page: Page<ComputeInstance> = adapter
            .list_instances("cn-hangzhou", &PageRequest::default())
            .await
            .unwrap();
        assert_eq!(page.items[0].meta.id, "i-1");
    }

    #[tokio::test]
    async fn test_missing_capability_is_typed_unsupported() {
        let adapter = adapter();
        assert!(adapter.supports(ResourceKind::Compute));
        let err = adapter
            .list_instances::<VpcInstance>("cn-hangzhou", &PageRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CloudError::Unsupported {
                kind: ResourceKind::Vpc,
                ..
            }
        ));
        assert!(adapter.identity().is_err());
    }
}
