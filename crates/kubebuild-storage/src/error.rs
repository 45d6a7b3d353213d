//! Store error types.

use kubebuild_core::{ObjectKey, ResourceKind};
use std::fmt;

/// Errors that can occur during store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested object was not found.
    #[error("{kind} {key} not found")]
    NotFound { kind: ResourceKind, key: ObjectKey },

    /// Attempted to create an object that already exists.
    #[error("{kind} {key} already exists")]
    AlreadyExists { kind: ResourceKind, key: ObjectKey },

    /// The object was modified since it was read.
    #[error("conflict on {kind} {key}: expected resourceVersion {expected}, found {actual}")]
    Conflict {
        kind: ResourceKind,
        key: ObjectKey,
        expected: String,
        actual: String,
    },

    /// The object is malformed.
    #[error("invalid object: {message}")]
    Invalid { message: String },

    /// The backend could not be reached.
    #[error("connection error: {message}")]
    Connection { message: String },

    /// An internal backend error occurred.
    #[error("internal error: {message}")]
    Internal { message: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    #[must_use]
    pub fn not_found(kind: ResourceKind, key: ObjectKey) -> Self {
        Self::NotFound { kind, key }
    }

    #[must_use]
    pub fn already_exists(kind: ResourceKind, key: ObjectKey) -> Self {
        Self::AlreadyExists { kind, key }
    }

    #[must_use]
    pub fn conflict(
        kind: ResourceKind,
        key: ObjectKey,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::Conflict {
            kind,
            key,
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    #[must_use]
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

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

    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    #[must_use]
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }

    /// Returns the error category for logging purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::AlreadyExists { .. } | Self::Conflict { .. } => ErrorCategory::Conflict,
            Self::Invalid { .. } | Self::Serialization(_) => ErrorCategory::Validation,
            Self::Connection { .. } => ErrorCategory::Infrastructure,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }
}

/// Categories of store errors for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    NotFound,
    /// Version or existence conflict.
    Conflict,
    Validation,
    Infrastructure,
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
