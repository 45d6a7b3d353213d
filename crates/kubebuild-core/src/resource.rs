use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::kind::ResourceKind;
use crate::meta::{ObjectKey, ObjectMeta};

/// A typed object that can be stored and exchanged as JSON.
pub trait Resource: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const KIND: ResourceKind;
    const API_VERSION: &'static str;

    fn meta(&self) -> &ObjectMeta;

    fn meta_mut(&mut self) -> &mut ObjectMeta;

    fn key(&self) -> ObjectKey {
        self.meta().key()
    }

    fn to_value(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }

    fn from_value(value: serde_json::Value) -> serde_json::Result<Self> {
        serde_json::from_value(value)
    }
}

/// Implements [`Resource`] for a struct with a `metadata: ObjectMeta` field.
macro_rules! impl_resource {
    ($ty:ty, $kind:expr, $api_version:expr) => {
        impl $crate::resource::Resource for $ty {
            const KIND: $crate::kind::ResourceKind = $kind;
            const API_VERSION: &'static str = $api_version;

            fn meta(&self) -> &$crate::meta::ObjectMeta {
                &self.metadata
            }

            fn meta_mut(&mut self) -> &mut $crate::meta::ObjectMeta {
                &mut self.metadata
            }
        }
    };
}

pub(crate) use impl_resource;
