use thiserror::Error;

/// Core error types for CloudSync vocabulary parsing
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Unknown cloud provider: {0}")]
    UnknownProvider(String),

    #[error("Unknown resource kind: {0}")]
    UnknownResourceKind(String),

    #[error("Unknown account status: {0}")]
    UnknownAccountStatus(String),

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),
}

impl CoreError {
    /// Create a new UnknownProvider error
    pub fn unknown_provider(value: impl Into<String>) -> Self {
        Self::UnknownProvider(value.into())
    }

    /// Create a new UnknownResourceKind error
    pub fn unknown_resource_kind(value: impl Into<String>) -> Self {
        Self::UnknownResourceKind(value.into())
    }

    /// Create a new InvalidTimestamp error
    pub fn invalid_timestamp(value: impl Into<String>) -> Self {
        Self::InvalidTimestamp(value.into())
    }

    /// Get error category for logging/monitoring
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::UnknownProvider(_)
            | Self::UnknownResourceKind(_)
            | Self::UnknownAccountStatus(_) => ErrorCategory::Validation,
            Self::InvalidTimestamp(_) => ErrorCategory::Parse,
        }
    }
}

/// Error categories for monitoring and classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Parse,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation => write!(f, "validation"),
            Self::Parse => write!(f, "parse"),
        }
    }
}

/// Convenience result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;
