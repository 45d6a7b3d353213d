//! Typed access over [`Store`].

use async_trait::async_trait;
use kubebuild_core::{ObjectKey, Resource};

use crate::error::StoreError;
use crate::traits::Store;
use crate::types::{DeleteOptions, ListParams, UpdateOptions};

/// Typed helpers, implemented for every [`Store`].
#[async_trait]
pub trait StoreExt: Store {
    async fn get_as<T: Resource>(&self, key: &ObjectKey) -> Result<T, StoreError> {
        let value = self.get(T::KIND, &key.namespace, &key.name).await?;
        Ok(T::from_value(value)?)
    }

    /// Like [`get_as`](Self::get_as) but maps `NotFound` to `Ok(None)`.
    async fn try_get_as<T: Resource>(&self, key: &ObjectKey) -> Result<Option<T>, StoreError> {
        match self.get_as::<T>(key).await {
            Ok(object) => Ok(Some(object)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn list_as<T: Resource>(
        &self,
        namespace: &str,
        params: &ListParams,
    ) -> Result<Vec<T>, StoreError> {
        self.list(T::KIND, namespace, params)
            .await?
            .into_iter()
            .map(|value| T::from_value(value).map_err(StoreError::from))
            .collect()
    }

    async fn create_typed<T: Resource>(&self, object: &T) -> Result<T, StoreError> {
        let stored = self.create(&object.to_value()?).await?;
        Ok(T::from_value(stored)?)
    }

    async fn update_typed<T: Resource>(
        &self,
        object: &T,
        options: &UpdateOptions,
    ) -> Result<T, StoreError> {
        let stored = self.update(&object.to_value()?, options).await?;
        Ok(T::from_value(stored)?)
    }

    async fn delete_object<T: Resource>(
        &self,
        object: &T,
        options: &DeleteOptions,
    ) -> Result<(), StoreError> {
        let meta = object.meta();
        self.delete(T::KIND, &meta.namespace, &meta.name, options)
            .await
    }
}

impl<S: Store + ?Sized> StoreExt for S {}
