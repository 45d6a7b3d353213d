use serde::{Deserialize, Serialize};

use super::{V1_API_VERSION, default_kind};
use crate::kind::ResourceKind;
use crate::meta::ObjectMeta;
use crate::resource::impl_resource;

/// Desired state of an `App`, storage version.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSpecV1 {
    #[serde(default)]
    pub replicas: i32,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub enable_service: bool,
    #[serde(default)]
    pub enable_ingress: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppV1 {
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default = "default_kind")]
    pub kind: String,
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: AppSpecV1,
}

fn default_api_version() -> String {
    V1_API_VERSION.to_string()
}

impl AppV1 {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            api_version: default_api_version(),
            kind: default_kind(),
            metadata: ObjectMeta::new(namespace, name),
            spec: AppSpecV1::default(),
        }
    }

    pub fn with_spec(mut self, spec: AppSpecV1) -> Self {
        self.spec = spec;
        self
    }
}

impl_resource!(AppV1, ResourceKind::App, V1_API_VERSION);
