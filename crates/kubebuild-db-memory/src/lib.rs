//! In-memory object store for kubebuild.
//!
//! This crate provides an in-memory implementation of the `Store` trait from
//! `kubebuild-storage`, backed by a `dashmap` concurrent map. Every mutation
//! is journaled so tests can assert exactly which writes a reconcile issued.
//!
//! # Example
//!
//! ```ignore
//! use kubebuild_db_memory::InMemoryStore;
//! use kubebuild_storage::Store;
//!
//! let store = InMemoryStore::new();
//! let app = serde_json::json!({
//!     "apiVersion": "buildcrd.k8s.example.io/v1",
//!     "kind": "App",
//!     "metadata": { "name": "web", "namespace": "default" },
//!     "spec": { "replicas": 1, "image": "nginx" }
//! });
//! let stored = store.create(&app).await?;
//! ```

mod store_impl;
pub mod storage;

pub use kubebuild_storage::{Store, StoreError};
pub use storage::{InMemoryStore, Mutation, MutationOp, StoreKey};

/// Type alias for a shareable store instance.
pub type DynStore = std::sync::Arc<dyn Store>;

/// Creates a new in-memory store behind a trait object.
pub fn create_store() -> DynStore {
    std::sync::Arc::new(InMemoryStore::new())
}
