//! In-memory storage backend for CloudSync.
//!
//! This crate implements every trait from `cloudsync-storage` on top of
//! `dashmap::DashMap`, so all stores are safe to share between concurrently
//! running tasks without external locking.
//!
//! # Example
//!
//! ```ignore
//! use cloudsync_db_memory::create_memory_stores;
//! use cloudsync_storage::SyncTaskStorage;
//!
//! let stores = create_memory_stores();
//! let pending = stores.tasks.list_pending_tasks(10).await?;
//! ```

mod assets;
mod factory;
mod iam;
mod tasks;

pub use assets::InMemoryAssetStorage;
pub use factory::{MemoryStores, create_memory_stores};
pub use iam::{
    InMemoryAccountStorage, InMemoryGroupStorage, InMemoryPolicyAuditStorage,
    InMemoryUserStorage,
};
pub use tasks::InMemorySyncTaskStorage;

pub use cloudsync_storage::{StorageError, StorageResult};

/// Applies `offset`/`limit` to an already ordered result set.
pub(crate) fn paginate<T>(items: Vec<T>, offset: Option<usize>, limit: Option<usize>) -> Vec<T> {
    items
        .into_iter()
        .skip(offset.unwrap_or(0))
        .take(limit.unwrap_or(usize::MAX))
        .collect()
}
