//! Error taxonomy of the sync engine.

use std::fmt;
use std::time::Duration;

use cloudsync_cloud::CloudError;
use cloudsync_core::AccountStatus;
use cloudsync_storage::{StorageError, SyncTaskStatus};

/// Errors raised by the sync engine.
///
/// Above the executor boundary every variant ends up as the `error_message`
/// of a failed task; nothing here crosses into callers of
/// [`crate::TaskExecutor::execute`] other than the pre-execution rejections
/// (`NotFound`, `AlreadyRunning`, `InvalidTransition`).
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// A request field is missing or malformed. Never retried.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A task, account, user or group does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// The task is executing elsewhere.
    #[error("Sync task {0} is already running")]
    AlreadyRunning(i64),

    #[error("Cloud account {account_id} is not active (status: {status})")]
    AccountDisabled {
        account_id: i64,
        status: AccountStatus,
    },

    /// The provider kept throttling after the backoff budget ran out.
    #[error("Throttled by provider: {0}")]
    Throttling(String),

    #[error("Credential error: {0}")]
    Credential(String),

    #[error(
        "Sync task {task_id} cannot be retried (retry {retry_count} of {max_retries}, status {status})"
    )]
    MaxRetriesExceeded {
        task_id: i64,
        retry_count: u32,
        max_retries: u32,
        status: SyncTaskStatus,
    },

    #[error("Sync task {task_id} cannot move from {from} to {to}")]
    InvalidTransition {
        task_id: i64,
        from: SyncTaskStatus,
        to: SyncTaskStatus,
    },

    #[error("{operation} timed out after {}s", .after.as_secs())]
    Timeout { operation: String, after: Duration },

    /// The provider has no capability for the requested operation.
    #[error("Unsupported: {0}")]
    Unsupported(String),

    #[error("Task queue is closed")]
    QueueClosed,

    #[error(transparent)]
    Cloud(CloudError),

    #[error(transparent)]
    Storage(StorageError),
}

impl SyncError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    pub fn timeout(operation: impl Into<String>, after: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            after,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_already_running(&self) -> bool {
        matches!(self, Self::AlreadyRunning(_))
    }

    /// Errors after which nothing else on the same account can succeed.
    pub fn is_account_fatal(&self) -> bool {
        matches!(self, Self::AccountDisabled { .. } | Self::Credential(_))
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Validation(_) => ErrorCategory::Validation,
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::AlreadyRunning(_) | Self::InvalidTransition { .. } => ErrorCategory::Conflict,
            Self::AccountDisabled { .. } => ErrorCategory::AccountState,
            Self::Throttling(_) => ErrorCategory::Throttling,
            Self::Credential(_) => ErrorCategory::Credential,
            Self::MaxRetriesExceeded { .. } => ErrorCategory::RetryBudget,
            Self::Timeout { .. } => ErrorCategory::Timeout,
            Self::Unsupported(_) => ErrorCategory::Unsupported,
            Self::QueueClosed => ErrorCategory::Internal,
            Self::Cloud(_) => ErrorCategory::Provider,
            Self::Storage(_) => ErrorCategory::Storage,
        }
    }
}

impl From<CloudError> for SyncError {
    fn from(err: CloudError) -> Self {
        match err {
            CloudError::AccountDisabled { account_id, status } => {
                Self::AccountDisabled { account_id, status }
            }
            CloudError::Throttled { .. } => Self::Throttling(err.to_string()),
            CloudError::Credential(message) => Self::Credential(message),
            CloudError::Unsupported { .. } | CloudError::NotImplemented { .. } => {
                Self::Unsupported(err.to_string())
            }
            other => Self::Cloud(other),
        }
    }
}

impl From<StorageError> for SyncError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound { entity, id } => Self::NotFound { entity, id },
            other => Self::Storage(other),
        }
    }
}

/// Categories of sync errors for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Validation,
    NotFound,
    Conflict,
    AccountState,
    Throttling,
    Credential,
    RetryBudget,
    Timeout,
    Unsupported,
    Provider,
    Storage,
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation => write!(f, "validation"),
            Self::NotFound => write!(f, "not_found"),
            Self::Conflict => write!(f, "conflict"),
            Self::AccountState => write!(f, "account_state"),
            Self::Throttling => write!(f, "throttling"),
            Self::Credential => write!(f, "credential"),
            Self::RetryBudget => write!(f, "retry_budget"),
            Self::Timeout => write!(f, "timeout"),
            Self::Unsupported => write!(f, "unsupported"),
            Self::Provider => write!(f, "provider"),
            Self::Storage => write!(f, "storage"),
            Self::Internal => write!(f, "internal"),
        }
    }
}
