use thiserror::Error;

/// Core error types for kubebuild operations
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid resource kind: {0}")]
    InvalidKind(String),

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Object {kind} {name} is already controlled by {owner}")]
    AlreadyOwned {
        kind: String,
        name: String,
        owner: String,
    },

    #[error("Owner {kind}/{name} has no uid")]
    MissingOwnerUid { kind: String, name: String },

    #[error("Invalid object: {message}")]
    InvalidObject { message: String },
}

impl CoreError {
    /// Create a new InvalidKind error
    pub fn invalid_kind(kind: impl Into<String>) -> Self {
        Self::InvalidKind(kind.into())
    }

    /// Create a new AlreadyOwned error
    pub fn already_owned(
        kind: impl Into<String>,
        name: impl Into<String>,
        owner: impl Into<String>,
    ) -> Self {
        Self::AlreadyOwned {
            kind: kind.into(),
            name: name.into(),
            owner: owner.into(),
        }
    }

    /// Create a new MissingOwnerUid error
    pub fn missing_owner_uid(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self::MissingOwnerUid {
            kind: kind.into(),
            name: name.into(),
        }
    }

    /// Create a new InvalidObject error
    pub fn invalid_object(message: impl Into<String>) -> Self {
        Self::InvalidObject {
            message: message.into(),
        }
    }

    /// Get error category for logging/monitoring
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidKind(_) | Self::InvalidObject { .. } => ErrorCategory::Validation,
            Self::JsonError(_) => ErrorCategory::Serialization,
            Self::AlreadyOwned { .. } | Self::MissingOwnerUid { .. } => ErrorCategory::Ownership,
        }
    }
}

/// Error categories for monitoring and classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Serialization,
    Ownership,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation => write!(f, "validation"),
            Self::Serialization => write!(f, "serialization"),
            Self::Ownership => write!(f, "ownership"),
        }
    }
}

/// Convenience result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = CoreError::invalid_kind("CronJob");
        assert_eq!(err.to_string(), "Invalid resource kind: CronJob");
        assert_eq!(err.category(), ErrorCategory::Validation);
    }

    #[test]
    fn test_already_owned_error() {
        let err = CoreError::already_owned("Deployment", "web-deployment", "App/other");
        assert_eq!(
            err.to_string(),
            "Object Deployment web-deployment is already controlled by App/other"
        );
        assert_eq!(err.category(), ErrorCategory::Ownership);
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: CoreError = json_err.into();
        assert_eq!(err.category(), ErrorCategory::Serialization);
        assert_eq!(ErrorCategory::Serialization.to_string(), "serialization");
    }
}
