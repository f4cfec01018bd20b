use cloudsync_core::Provider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use time::OffsetDateTime;

/// Retry budget applied when a request does not name one.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Upper bound on error samples kept in a [`SyncSummary`].
const MAX_ERROR_SAMPLES: usize = 20;

/// The unit of work a sync task performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncTaskKind {
    /// Refresh one cloud user from its provider.
    UserSync,
    /// Push the effective policy set of one user to its provider.
    PermissionSync,
    /// Permission-sync every member of one permission group.
    GroupSync,
    /// Full account sweep: users plus every asset kind and region.
    BatchUserSync,
}

impl fmt::Display for SyncTaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncTaskKind::UserSync => write!(f, "user_sync"),
            SyncTaskKind::PermissionSync => write!(f, "permission_sync"),
            SyncTaskKind::GroupSync => write!(f, "group_sync"),
            SyncTaskKind::BatchUserSync => write!(f, "batch_user_sync"),
        }
    }
}

impl FromStr for SyncTaskKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.replace('-', "_").as_str() {
            "user_sync" => Ok(SyncTaskKind::UserSync),
            "permission_sync" => Ok(SyncTaskKind::PermissionSync),
            "group_sync" => Ok(SyncTaskKind::GroupSync),
            "batch_user_sync" => Ok(SyncTaskKind::BatchUserSync),
            _ => Err(format!("unrecognized task type '{s}'")),
        }
    }
}

/// What a task's `target_id` refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    User,
    Group,
    Account,
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetKind::User => write!(f, "user"),
            TargetKind::Group => write!(f, "group"),
            TargetKind::Account => write!(f, "account"),
        }
    }
}

impl FromStr for TargetKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(TargetKind::User),
            "group" => Ok(TargetKind::Group),
            "account" => Ok(TargetKind::Account),
            _ => Err(format!("unrecognized target type '{s}'")),
        }
    }
}

/// Sync task lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncTaskStatus {
    Pending,
    Running,
    Success,
    Failed,
    Retrying,
}

impl SyncTaskStatus {
    /// Transitions are one-directional except `failed -> retrying -> pending`.
    pub fn can_transition_to(self, next: SyncTaskStatus) -> bool {
        use SyncTaskStatus::*;
        matches!(
            (self, next),
            (Pending, Running)
                | (Running, Success)
                | (Running, Failed)
                | (Failed, Retrying)
                | (Retrying, Pending)
        )
    }

    pub fn is_finished(self) -> bool {
        matches!(self, SyncTaskStatus::Success | SyncTaskStatus::Failed)
    }
}

impl fmt::Display for SyncTaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncTaskStatus::Pending => write!(f, "pending"),
            SyncTaskStatus::Running => write!(f, "running"),
            SyncTaskStatus::Success => write!(f, "success"),
            SyncTaskStatus::Failed => write!(f, "failed"),
            SyncTaskStatus::Retrying => write!(f, "retrying"),
        }
    }
}

/// Who asked for the task, kept for the audit trail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskTrigger {
    #[default]
    Manual,
    Propagation,
    Scheduled,
}

/// Aggregate per-item outcome of a task, recorded on completion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSummary {
    pub total: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub deleted: u64,
    pub skipped: u64,
    /// First few per-item error messages.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl SyncSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&mut self) {
        self.total += 1;
        self.succeeded += 1;
    }

    pub fn record_failure(&mut self, message: impl Into<String>) {
        self.total += 1;
        self.failed += 1;
        self.push_error(message.into());
    }

    pub fn record_skip(&mut self) {
        self.skipped += 1;
    }

    pub fn record_deleted(&mut self, count: u64) {
        self.deleted += count;
    }

    pub fn merge(&mut self, other: SyncSummary) {
        self.total += other.total;
        self.succeeded += other.succeeded;
        self.failed += other.failed;
        self.deleted += other.deleted;
        self.skipped += other.skipped;
        for err in other.errors {
            self.push_error(err);
        }
    }

    /// Some items failed while the step as a whole completed.
    pub fn is_partial(&self) -> bool {
        self.failed > 0
    }

    fn push_error(&mut self, message: String) {
        if self.errors.len() < MAX_ERROR_SAMPLES {
            self.errors.push(message);
        }
    }
}

/// A persisted, retryable unit of synchronization work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncTask {
    pub id: i64,
    pub tenant_id: String,
    pub task_type: SyncTaskKind,
    pub target_type: TargetKind,
    pub target_id: i64,
    pub cloud_account_id: i64,
    pub provider: Provider,
    pub status: SyncTaskStatus,
    /// Percentage, 0..=100.
    pub progress: u8,
    pub retry_count: u32,
    pub max_retries: u32,
    pub error_message: Option<String>,
    pub trigger: TaskTrigger,
    pub result: Option<SyncSummary>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub start_time: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub end_time: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl SyncTask {
    /// Whether the retry command may still move this task back to pending.
    pub fn can_retry(&self) -> bool {
        self.status == SyncTaskStatus::Failed && self.retry_count < self.max_retries
    }
}

/// Outcome of a conditional task update.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskTransition {
    /// The update was applied; carries the task as stored afterwards.
    Applied(SyncTask),
    /// The guard did not hold and nothing was written; carries the task as found.
    Refused(SyncTask),
}

/// A validated request to persist a new task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSyncTask {
    pub tenant_id: String,
    pub task_type: SyncTaskKind,
    pub target_type: TargetKind,
    pub target_id: i64,
    pub cloud_account_id: i64,
    pub provider: Provider,
    pub max_retries: u32,
    pub trigger: TaskTrigger,
}

/// Filter for listing sync tasks.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncTaskFilter {
    pub tenant_id: Option<String>,
    pub status: Option<SyncTaskStatus>,
    pub task_type: Option<SyncTaskKind>,
    pub cloud_account_id: Option<i64>,
    pub target_type: Option<TargetKind>,
    pub target_id: Option<i64>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl SyncTaskFilter {
    pub fn matches(&self, task: &SyncTask) -> bool {
        self.tenant_id.as_ref().is_none_or(|t| *t == task.tenant_id)
            && self.status.is_none_or(|s| s == task.status)
            && self.task_type.is_none_or(|k| k == task.task_type)
            && self
                .cloud_account_id
                .is_none_or(|a| a == task.cloud_account_id)
            && self.target_type.is_none_or(|t| t == task.target_type)
            && self.target_id.is_none_or(|t| t == task.target_id)
    }
}
