//! Resolves cloud accounts to cached adapter instances.

use std::sync::Arc;

use cloudsync_core::{CloudAccount, Provider};
use dashmap::DashMap;

use crate::adapter::{AdapterSettings, CloudAdapter};
use crate::error::CloudError;
use crate::registry::AdapterRegistry;

/// Cache key: one adapter per provider account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AdapterKey {
    pub provider: Provider,
    pub account_id: i64,
}

impl AdapterKey {
    pub fn for_account(account: &CloudAccount) -> Self {
        Self {
            provider: account.provider,
            account_id: account.id,
        }
    }
}

/// Builds adapters through the registry and caches them per account.
///
/// Lookups, inserts and evictions are safe from concurrently running tasks.
pub struct AdapterFactory {
    registry: Arc<AdapterRegistry>,
    settings: AdapterSettings,
    cache: DashMap<AdapterKey, Arc<CloudAdapter>>,
}

impl AdapterFactory {
    pub fn new(registry: Arc<AdapterRegistry>, settings: AdapterSettings) -> Self {
        Self {
            registry,
            settings,
            cache: DashMap::new(),
        }
    }

    pub fn registry(&self) -> &AdapterRegistry {
        &self.registry
    }

    /// Returns the cached adapter for the account, building it on first use.
    ///
    /// # Errors
    ///
    /// - `InvalidConfig` when the account has empty credentials
    /// - `AccountDisabled` when the account is not active
    /// - `ProviderNotRegistered` when no builder exists for the provider
    pub fn create_adapter(&self, account: &CloudAccount) -> Result<Arc<CloudAdapter>, CloudError> {
        if account.credentials.is_empty() {
            return Err(CloudError::InvalidConfig(format!(
                "cloud account {} has empty credentials",
                account.id
            )));
        }
        if !account.is_active() {
            return Err(CloudError::AccountDisabled {
                account_id: account.id,
                status: account.status,
            });
        }

        let key = AdapterKey::for_account(account);
        if let Some(adapter) = self.cache.get(&key) {
            tracing::debug!(provider = %key.provider, account_id = key.account_id, "Adapter cache hit");
            return Ok(adapter.clone());
        }

        let builder = self
            .registry
            .get(account.provider)
            .ok_or(CloudError::ProviderNotRegistered(account.provider))?;
        let capabilities = builder.build(account)?;
        let adapter = Arc::new(CloudAdapter::new(
            account,
            capabilities,
            &self.settings,
            builder,
        ));
        tracing::info!(
            provider = %key.provider,
            account_id = key.account_id,
            capabilities = ?adapter.capabilities().supported_kinds(),
            "Created cloud adapter"
        );

        // A concurrent builder may have won the race; keep whichever landed first.
        Ok(self.cache.entry(key).or_insert(adapter).value().clone())
    }

    /// Evicts every cached adapter.
    pub fn clear_cache(&self) {
        let evicted = self.cache.len();
        self.cache.clear();
        tracing::info!(evicted, "Cleared adapter cache");
    }

    /// Evicts one account's adapter, e.g. after credential rotation.
    pub fn clear_account_cache(&self, provider: Provider, account_id: i64) -> bool {
        let removed = self
            .cache
            .remove(&AdapterKey {
                provider,
                account_id,
            })
            .is_some();
        tracing::debug!(provider = %provider, account_id, removed, "Evicted adapter");
        removed
    }

    pub fn cached_count(&self) -> usize {
        self.cache.len()
    }
}

impl std::fmt::Debug for AdapterFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterFactory")
            .field("registry", &self.registry)
            .field("cached", &self.cache.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::Capabilities;
    use crate::registry::AdapterBuilder;
    use cloudsync_core::{AccountStatus, Credentials};
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Default)]
    struct CountingBuilder {
        builds: AtomicU32,
    }

    impl AdapterBuilder for CountingBuilder {
        fn provider(&self) -> Provider {
            Provider::Aws
        }

        fn build(&self, _account: &CloudAccount) -> Result<Capabilities, CloudError> {
            self.builds.fetch_add(1, Ordering::SeqCst);
            Ok(Capabilities::new())
        }
    }

    fn factory() -> (AdapterFactory, Arc<CountingBuilder>) {
        let builder = Arc::new(CountingBuilder::default());
        let registry = AdapterRegistry::new().with(builder.clone());
        (
            AdapterFactory::new(Arc::new(registry), AdapterSettings::default()),
            builder,
        )
    }

    fn account(id: i64) -> CloudAccount {
        CloudAccount::new(id, "t1", "prod", Provider::Aws, Credentials::new("AKIA", "secret"))
    }

    #[test]
    fn test_adapter_is_cached_per_account() {
        let (factory, builder) = factory();
        let first = factory.create_adapter(&account(1)).unwrap();
        let again = factory.create_adapter(&account(1)).unwrap();
        let other = factory.create_adapter(&account(2)).unwrap();

        assert!(Arc::ptr_eq(&first, &again));
        assert!(!Arc::ptr_eq(&first, &other));
        assert_eq!(builder.builds.load(Ordering::SeqCst), 2);
        assert_eq!(factory.cached_count(), 2);
    }

    #[test]
    fn test_empty_credentials_rejected_before_status() {
        let (factory, _) = factory();
        let mut acct = account(1).with_status(AccountStatus::Disabled);
        acct.credentials = Credentials::new(" ", "");
        assert!(matches!(
            factory.create_adapter(&acct),
            Err(CloudError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_inactive_account_rejected() {
        let (factory, _) = factory();
        for status in [AccountStatus::Disabled, AccountStatus::Testing, AccountStatus::Error] {
            let err = factory
                .create_adapter(&account(1).with_status(status))
                .unwrap_err();
            assert!(matches!(err, CloudError::AccountDisabled { account_id: 1, .. }));
        }
        assert_eq!(factory.cached_count(), 0);
    }

    #[test]
    fn test_unregistered_provider() {
        let (factory, _) = factory();
        let acct = CloudAccount::new(3, "t1", "x", Provider::Volcano, Credentials::new("a", "b"));
        assert!(matches!(
            factory.create_adapter(&acct),
            Err(CloudError::ProviderNotRegistered(Provider::Volcano))
        ));
    }

    #[test]
    fn test_clear_account_cache_forces_rebuild() {
        let (factory, builder) = factory();
        factory.create_adapter(&account(1)).unwrap();
        assert!(factory.clear_account_cache(Provider::Aws, 1));
        assert!(!factory.clear_account_cache(Provider::Aws, 1));
        factory.create_adapter(&account(1)).unwrap();
        assert_eq!(builder.builds.load(Ordering::SeqCst), 2);

        factory.clear_cache();
        assert_eq!(factory.cached_count(), 0);
    }
}
