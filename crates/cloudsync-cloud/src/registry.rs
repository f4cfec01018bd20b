use std::collections::HashMap;
use std::sync::Arc;

use cloudsync_core::{CloudAccount, Provider};

use crate::capability::Capabilities;
use crate::error::CloudError;
use crate::throttle;

/// Constructs the capability set of one provider for a given account.
pub trait AdapterBuilder: Send + Sync {
    fn provider(&self) -> Provider;

    /// Builds SDK clients for the account's credentials.
    fn build(&self, account: &CloudAccount) -> Result<Capabilities, CloudError>;

    /// Retry classifier for errors raised by this provider's adapters.
    fn is_retryable(&self, err: &CloudError) -> bool {
        throttle::is_retryable(self.provider(), err)
    }
}

/// Provider -> builder lookup.
///
/// Populated once at startup and handed to the factory; read-only afterwards.
#[derive(Default, Clone)]
pub struct AdapterRegistry {
    builders: HashMap<Provider, Arc<dyn AdapterBuilder>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a builder under its own provider, returning the one it replaced.
    pub fn register(&mut self, builder: Arc<dyn AdapterBuilder>) -> Option<Arc<dyn AdapterBuilder>> {
        let provider = builder.provider();
        tracing::debug!(provider = %provider, "Registered cloud adapter builder");
        self.builders.insert(provider, builder)
    }

    pub fn with(mut self, builder: Arc<dyn AdapterBuilder>) -> Self {
        self.register(builder);
        self
    }

    pub fn get(&self, provider: Provider) -> Option<Arc<dyn AdapterBuilder>> {
        self.builders.get(&provider).cloned()
    }

    pub fn is_registered(&self, provider: Provider) -> bool {
        self.builders.contains_key(&provider)
    }

    /// Registered providers in a stable order.
    pub fn providers(&self) -> Vec<Provider> {
        let mut providers: Vec<Provider> = self.builders.keys().copied().collect();
        providers.sort();
        providers
    }

    pub fn is_empty(&self) -> bool {
        self.builders.is_empty()
    }
}

impl std::fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterRegistry")
            .field("providers", &self.providers())
            .finish()
    }
}
