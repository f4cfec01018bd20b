//! Errors raised by provider adapters and the adapter factory.

use cloudsync_core::{AccountStatus, Provider, ResourceKind};
use std::fmt;

/// Errors that can occur while talking to a cloud provider.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CloudError {
    /// The account cannot be turned into an adapter (e.g. empty credentials).
    #[error("Invalid adapter configuration: {0}")]
    InvalidConfig(String),

    /// The account is not active and must not be synced.
    #[error("Cloud account {account_id} is not active (status: {status})")]
    AccountDisabled {
        account_id: i64,
        status: AccountStatus,
    },

    /// The provider has no adapter for this resource kind.
    #[error("{kind} is not supported on {provider}")]
    Unsupported { provider: Provider, kind: ResourceKind },

    /// The adapter exists but does not implement this operation.
    #[error("Operation not implemented: {operation}")]
    NotImplemented { operation: String },

    /// The provider rejected the call with a rate-limit signature.
    #[error("Throttled by provider [{code}]: {message}")]
    Throttled { code: String, message: String },

    /// Credentials were rejected.
    #[error("Credential error: {0}")]
    Credential(String),

    /// The provider reports the object as absent.
    #[error("Not found on provider: {0}")]
    NotFound(String),

    /// Any other provider-side failure, with the provider's own error code.
    #[error("Provider API error [{code}]: {message}")]
    Api { code: String, message: String },

    /// The call did not complete before its deadline.
    #[error("Provider call timed out: {0}")]
    Timeout(String),

    /// No builder is registered for the provider.
    #[error("No adapter registered for provider {0}")]
    ProviderNotRegistered(Provider),
}

impl CloudError {
    pub fn not_implemented(operation: impl Into<String>) -> Self {
        Self::NotImplemented {
            operation: operation.into(),
        }
    }

    pub fn throttled(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Throttled {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn api(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Provider error code, when the error carries one.
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Throttled { code, .. } | Self::Api { code, .. } => Some(code),
            _ => None,
        }
    }

    pub fn is_throttling(&self) -> bool {
        matches!(self, Self::Throttled { .. })
    }

    pub fn is_not_implemented(&self) -> bool {
        matches!(self, Self::NotImplemented { .. })
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidConfig(_) | Self::ProviderNotRegistered(_) => ErrorCategory::Configuration,
            Self::AccountDisabled { .. } => ErrorCategory::AccountState,
            Self::Unsupported { .. } | Self::NotImplemented { .. } => ErrorCategory::Unsupported,
            Self::Throttled { .. } => ErrorCategory::Throttling,
            Self::Credential(_) => ErrorCategory::Credential,
            Self::NotFound(_) => ErrorCategory::NotFound,
            Self::Api { .. } | Self::Timeout(_) => ErrorCategory::Provider,
        }
    }
}

/// Categories of cloud errors for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Configuration,
    AccountState,
    Unsupported,
    Throttling,
    Credential,
    NotFound,
    Provider,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration => write!(f, "configuration"),
            Self::AccountState => write!(f, "account_state"),
            Self::Unsupported => write!(f, "unsupported"),
            Self::Throttling => write!(f, "throttling"),
            Self::Credential => write!(f, "credential"),
            Self::NotFound => write!(f, "not_found"),
            Self::Provider => write!(f, "provider"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CloudError::Unsupported {
            provider: Provider::Huawei,
            kind: ResourceKind::SearchCluster,
        };
        assert_eq!(err.to_string(), "search_cluster is not supported on huawei");

        let err = CloudError::AccountDisabled {
            account_id: 4,
            status: AccountStatus::Disabled,
        };
        assert_eq!(err.to_string(), "Cloud account 4 is not active (status: disabled)");
    }

    #[test]
    fn test_code_and_category() {
        let err = CloudError::throttled("Throttling.User", "slow down");
        assert_eq!(err.code(), Some("Throttling.User"));
        assert!(err.is_throttling());
        assert_eq!(err.category(), ErrorCategory::Throttling);

        assert_eq!(CloudError::Credential("bad key".into()).code(), None);
        assert_eq!(
            CloudError::not_implemented("get_instance_status").category().to_string(),
            "unsupported"
        );
    }
}
