//! Storage error types for the CloudSync persistence contracts.

use std::fmt;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The requested record was not found.
    #[error("Record not found: {entity}/{id}")]
    NotFound {
        /// The kind of record that was not found (e.g. "SyncTask").
        entity: String,
        /// The identifier that was looked up.
        id: String,
    },

    /// Attempted to create a record that already exists.
    #[error("Record already exists: {entity}/{id}")]
    AlreadyExists {
        /// The kind of record that already exists.
        entity: String,
        /// The conflicting identifier.
        id: String,
    },

    /// The record data is invalid.
    #[error("Invalid record: {message}")]
    InvalidRecord {
        /// Description of why the record is invalid.
        message: String,
    },

    /// A conditional update lost against a concurrent writer.
    #[error("Conflict: {message}")]
    Conflict {
        /// Description of the conflicting state.
        message: String,
    },

    /// Failed to connect to the storage backend.
    #[error("Connection error: {message}")]
    ConnectionError {
        /// Description of the connection error.
        message: String,
    },

    /// An internal storage error occurred.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl StorageError {
    /// Creates a new `NotFound` error.
    #[must_use]
    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Creates a new `AlreadyExists` error.
    #[must_use]
    pub fn already_exists(entity: impl Into<String>, id: impl ToString) -> Self {
        Self::AlreadyExists {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Creates a new `InvalidRecord` error.
    #[must_use]
    pub fn invalid_record(message: impl Into<String>) -> Self {
        Self::InvalidRecord {
            message: message.into(),
        }
    }

    /// Creates a new `Conflict` error.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// Creates a new `ConnectionError` error.
    #[must_use]
    pub fn connection_error(message: impl Into<String>) -> Self {
        Self::ConnectionError {
            message: message.into(),
        }
    }

    /// Creates a new `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns `true` if this is a not found error.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns `true` if this is an already exists error.
    #[must_use]
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }

    /// Returns the error category for logging/monitoring purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::AlreadyExists { .. } | Self::Conflict { .. } => ErrorCategory::Conflict,
            Self::InvalidRecord { .. } => ErrorCategory::Validation,
            Self::ConnectionError { .. } => ErrorCategory::Infrastructure,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }
}

/// Categories of storage errors for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Record not found.
    NotFound,
    /// Conflict (existence or concurrent update).
    Conflict,
    /// Validation error.
    Validation,
    /// Infrastructure/connection error.
    Infrastructure,
    /// Internal error.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not_found"),
            Self::Conflict => write!(f, "conflict"),
            Self::Validation => write!(f, "validation"),
            Self::Infrastructure => write!(f, "infrastructure"),
            Self::Internal => write!(f, "internal"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StorageError::not_found("SyncTask", 17);
        assert_eq!(err.to_string(), "Record not found: SyncTask/17");

        let err = StorageError::already_exists("CloudUser", "u-1");
        assert_eq!(err.to_string(), "Record already exists: CloudUser/u-1");
    }

    #[test]
    fn test_error_predicates() {
        let err = StorageError::not_found("SyncTask", 1);
        assert!(err.is_not_found());
        assert!(!err.is_already_exists());
    }

    #[test]
    fn test_error_category() {
        assert_eq!(
            StorageError::not_found("SyncTask", 1).category(),
            ErrorCategory::NotFound
        );
        assert_eq!(
            StorageError::conflict("task already running").category(),
            ErrorCategory::Conflict
        );
        assert_eq!(
            StorageError::invalid_record("bad data").category(),
            ErrorCategory::Validation
        );
        assert_eq!(ErrorCategory::Infrastructure.to_string(), "infrastructure");
    }
}
