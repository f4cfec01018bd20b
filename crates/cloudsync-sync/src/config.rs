use std::time::Duration;

use cloudsync_storage::{DEFAULT_MAX_RETRIES, SyncTaskKind};
use serde::{Deserialize, Serialize};

const MIN_INTERVAL: Duration = Duration::from_secs(1);

/// Tuning knobs of the sync engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Tasks executed in parallel by the queue's worker pool.
    pub workers: usize,
    /// Submissions buffered before `submit` waits.
    pub queue_capacity: usize,
    /// Concurrency ceiling of one pending-task sweep.
    pub max_concurrent: usize,
    pub poll_interval_secs: u64,
    pub account_sync_interval_secs: u64,
    pub default_max_retries: u32,
    pub user_sync_timeout_secs: u64,
    pub permission_sync_timeout_secs: u64,
    pub batch_sync_timeout_secs: u64,
    pub validation_timeout_secs: u64,
    /// Page size used when scanning a tenant's users during propagation.
    pub propagation_page_size: usize,
    /// Tasks pulled per sweep.
    pub sweep_batch_size: usize,
    /// Page size requested from provider list calls.
    pub list_page_size: u32,
    /// Ceiling on pages followed in one listing.
    pub max_pages: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            queue_capacity: 1024,
            max_concurrent: 4,
            poll_interval_secs: 30,
            account_sync_interval_secs: 3600,
            default_max_retries: DEFAULT_MAX_RETRIES,
            user_sync_timeout_secs: 60,
            permission_sync_timeout_secs: 60,
            batch_sync_timeout_secs: 1800,
            validation_timeout_secs: 10,
            propagation_page_size: 500,
            sweep_batch_size: 100,
            list_page_size: 100,
            max_pages: 1000,
        }
    }
}

impl SyncConfig {
    /// Execution deadline for one task of the given kind.
    pub fn timeout_for(&self, kind: SyncTaskKind) -> Duration {
        let secs = match kind {
            SyncTaskKind::UserSync => self.user_sync_timeout_secs,
            SyncTaskKind::PermissionSync => self.permission_sync_timeout_secs,
            SyncTaskKind::GroupSync | SyncTaskKind::BatchUserSync => self.batch_sync_timeout_secs,
        };
        Duration::from_secs(secs)
    }

    pub fn validation_timeout(&self) -> Duration {
        Duration::from_secs(self.validation_timeout_secs)
    }

    /// Never shorter than one second.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs).max(MIN_INTERVAL)
    }

    /// Never shorter than one second.
    pub fn account_sync_interval(&self) -> Duration {
        Duration::from_secs(self.account_sync_interval_secs).max(MIN_INTERVAL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeouts_per_kind() {
        let config = SyncConfig::default();
        assert_eq!(
            config.timeout_for(SyncTaskKind::PermissionSync),
            Duration::from_secs(60)
        );
        assert_eq!(
            config.timeout_for(SyncTaskKind::BatchUserSync),
            Duration::from_secs(1800)
        );
        assert!(config.validation_timeout() < config.timeout_for(SyncTaskKind::UserSync));
    }

    #[test]
    fn test_zero_intervals_are_clamped() {
        let config = SyncConfig {
            poll_interval_secs: 0,
            account_sync_interval_secs: 0,
            ..Default::default()
        };
        assert_eq!(config.poll_interval(), Duration::from_secs(1));
        assert_eq!(config.account_sync_interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: SyncConfig = serde_json::from_str(r#"{"workers": 8}"#).unwrap();
        assert_eq!(config.workers, 8);
        assert_eq!(config.default_max_retries, 3);
        assert_eq!(config.propagation_page_size, 500);
    }
}
