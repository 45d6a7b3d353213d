use serde::{Deserialize, Serialize};

use super::{V2_API_VERSION, default_kind};
use crate::kind::ResourceKind;
use crate::meta::ObjectMeta;
use crate::resource::impl_resource;

/// Desired state of an `App`, served version.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSpecV2 {
    #[serde(default)]
    pub replicas: i32,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub enable_service: bool,
    #[serde(default)]
    pub enable_ingress: bool,
    /// `None` until a client writes it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_pod: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppV2 {
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default = "default_kind")]
    pub kind: String,
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: AppSpecV2,
}

fn default_api_version() -> String {
    V2_API_VERSION.to_string()
}

impl AppV2 {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            api_version: default_api_version(),
            kind: default_kind(),
            metadata: ObjectMeta::new(namespace, name),
            spec: AppSpecV2::default(),
        }
    }

    pub fn with_spec(mut self, spec: AppSpecV2) -> Self {
        self.spec = spec;
        self
    }
}

impl_resource!(AppV2, ResourceKind::App, V2_API_VERSION);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_v2_from_json() {
        let app: AppV2 = serde_json::from_value(serde_json::json!({
            "apiVersion": "buildcrd.k8s.example.io/v2",
            "kind": "App",
            "metadata": { "name": "web", "namespace": "default" },
            "spec": { "replicas": 1, "image": "nginx:1.27", "enableService": true }
        }))
        .unwrap();

        assert_eq!(app.metadata.name, "web");
        assert_eq!(app.spec.replicas, 1);
        assert!(app.spec.enable_service);
        assert!(!app.spec.enable_ingress);
        assert_eq!(app.spec.enable_pod, None);
    }

    #[test]
    fn test_unset_enable_pod_not_serialized() {
        let app = AppV2::new("default", "web");
        let value = serde_json::to_value(&app).unwrap();
        assert!(value["spec"].get("enablePod").is_none());
        assert_eq!(value["apiVersion"], "buildcrd.k8s.example.io/v2");
    }
}
