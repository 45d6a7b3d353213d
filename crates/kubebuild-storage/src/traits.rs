//! The object store contract.

use async_trait::async_trait;
use kubebuild_core::ResourceKind;
use serde_json::Value;

use crate::error::StoreError;
use crate::types::{DeleteOptions, ListParams, UpdateOptions};

/// The trait every object store backend implements.
///
/// Objects are plain JSON carrying `apiVersion`, `kind` and `metadata`.
/// Backends own `metadata.uid`, `metadata.resourceVersion` and
/// `metadata.creationTimestamp`; callers never set them.
///
/// Implementations must be thread-safe (`Send + Sync`).
#[async_trait]
pub trait Store: Send + Sync {
    /// Reads one object.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the object does not exist.
    async fn get(&self, kind: ResourceKind, namespace: &str, name: &str)
    -> Result<Value, StoreError>;

    /// Lists the objects of `kind` in `namespace` that match `params`.
    async fn list(
        &self,
        kind: ResourceKind,
        namespace: &str,
        params: &ListParams,
    ) -> Result<Vec<Value>, StoreError>;

    /// Lists the objects of `kind` across every namespace.
    async fn list_all(&self, kind: ResourceKind) -> Result<Vec<Value>, StoreError>;

    /// Creates an object and returns it as stored.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::AlreadyExists` on a duplicate key and
    /// `StoreError::Invalid` if `kind` or `metadata.name` is missing.
    async fn create(&self, object: &Value) -> Result<Value, StoreError>;

    /// Replaces an existing object and returns it as stored.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the object does not exist and
    /// `StoreError::Conflict` if `metadata.resourceVersion` is stale.
    async fn update(&self, object: &Value, options: &UpdateOptions) -> Result<Value, StoreError>;

    /// Deletes one object.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the object does not exist.
    async fn delete(
        &self,
        kind: ResourceKind,
        namespace: &str,
        name: &str,
        options: &DeleteOptions,
    ) -> Result<(), StoreError>;

    /// Returns the name of this backend for logging.
    fn backend_name(&self) -> &'static str;
}
