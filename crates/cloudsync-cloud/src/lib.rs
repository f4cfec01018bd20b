//! # cloudsync-cloud
//!
//! The provider side of CloudSync:
//!
//! - [`capability`]: the per-kind [`InstanceAdapter`] and the [`IdentityAdapter`]
//!   contracts each provider implements against its own SDK
//! - [`CloudAdapter`]: one provider's capabilities bound to one account, with its
//!   own [`RateLimiter`] and the shared [`with_backoff`] policy
//! - [`AdapterRegistry`] / [`AdapterFactory`]: provider -> builder lookup and the
//!   per-account adapter cache
//! - [`throttle`]: per-provider rate-limit signatures used as retry classifiers

mod adapter;
pub mod capability;
mod error;
mod factory;
mod rate_limit;
mod registry;
mod retry;
pub mod throttle;
pub mod types;

pub use adapter::{AdapterSettings, CloudAdapter};
pub use capability::{Capabilities, CloudRecord, IdentityAdapter, InstanceAdapter};
pub use error::{CloudError, ErrorCategory};
pub use factory::{AdapterFactory, AdapterKey};
pub use rate_limit::{RateLimitSettings, RateLimiter};
pub use registry::{AdapterBuilder, AdapterRegistry};
pub use retry::{BackoffPolicy, with_backoff};
pub use types::{
    CacheInstance, CloudGroupRecord, CloudUserRecord, ComputeInstance, CreateUserRequest,
    DocumentDbInstance, FileStorageInstance, InstanceFilter, InstanceMeta, MessageQueueInstance,
    ObjectStorageBucket, Page, PageRequest, PermissionChange, PolicyRecord, PublicIpInstance,
    RelationalDbInstance, SearchClusterInstance, VpcInstance,
};

/// Result type for provider calls.
pub type CloudResult<T> = Result<T, CloudError>;
