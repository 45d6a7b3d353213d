use kubebuild_core::CoreError;
use kubebuild_storage::StoreError;

use crate::render::RenderError;

/// Errors surfaced by a reconcile invocation.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("render error: {0}")]
    Render(#[from] RenderError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("ownership error: {0}")]
    Ownership(#[from] CoreError),
}

impl ReconcileError {
    /// Every store failure is retried with a fixed delay. Render and
    /// ownership failures need a fix to the template or the object.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Store(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Store(e) if e.is_not_found())
    }
}

pub type Result<T> = std::result::Result<T, ReconcileError>;

#[cfg(test)]
mod tests {
    use super::*;
    use kubebuild_core::{ObjectKey, ResourceKind};

    #[test]
    fn test_store_errors_are_retryable() {
        let err: ReconcileError = StoreError::connection("refused").into();
        assert!(err.is_retryable());
        assert!(!err.is_not_found());

        let err: ReconcileError =
            StoreError::not_found(ResourceKind::App, ObjectKey::new("a", "b")).into();
        assert!(err.is_retryable());
        assert!(err.is_not_found());
    }

    #[test]
    fn test_render_errors_are_not_retryable() {
        let err: ReconcileError = RenderError::parse(ResourceKind::Service, "bad").into();
        assert!(!err.is_retryable());
        assert_eq!(err.to_string(), "render error: rendered Service is not valid: bad");
    }
}
