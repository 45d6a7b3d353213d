//! # kubebuild-storage
//!
//! Object store abstraction for kubebuild.
//!
//! This crate defines the contract every store backend implements. It holds
//! no implementation; the in-memory backend lives in `kubebuild-db-memory`.
//!
//! ## Overview
//!
//! [`Store`] is an untyped, object-safe trait over JSON objects addressed by
//! kind, namespace and name:
//! - `get` and `list` reads
//! - `create`, `update` and `delete` writes, each carrying the options the
//!   caller needs (field manager, grace period)
//!
//! [`StoreExt`] layers typed access on top for anything implementing
//! [`kubebuild_core::Resource`].
//!
//! ## Example
//!
//! ```ignore
//! use kubebuild_core::{AppV1, ObjectKey};
//! use kubebuild_storage::{Store, StoreExt, StoreError};
//!
//! async fn replicas(store: &dyn Store, key: &ObjectKey) -> Result<i32, StoreError> {
//!     let app: AppV1 = store.get_as(key).await?;
//!     Ok(app.spec.replicas)
//! }
//! ```

mod error;
mod ext;
mod traits;
mod types;

pub use error::{ErrorCategory, StoreError};
pub use ext::StoreExt;
pub use traits::Store;
pub use types::{DeleteOptions, ListParams, UpdateOptions};

/// Type alias for a store result.
pub type StoreResult<T> = Result<T, StoreError>;

/// Type alias for a shared store trait object.
pub type DynStore = std::sync::Arc<dyn Store>;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::error::{ErrorCategory, StoreError};
    pub use crate::ext::StoreExt;
    pub use crate::traits::Store;
    pub use crate::types::{DeleteOptions, ListParams, UpdateOptions};
    pub use crate::{DynStore, StoreResult};
}
