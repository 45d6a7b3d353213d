//! Dependent resources derived from an `App`.
//!
//! Each shape models only the fields kubebuild reads or writes. Everything
//! else lands in `extra` and is written back untouched, so an update never
//! clobbers fields owned by another writer.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::kind::ResourceKind;
use crate::meta::{ObjectKey, ObjectMeta};
use crate::resource::impl_resource;

pub const DEPLOYMENT_SUFFIX: &str = "-deployment";
pub const SERVICE_SUFFIX: &str = "-svc";
pub const INGRESS_SUFFIX: &str = "-ingress";

/// Name of the Deployment owned by `app`.
pub fn deployment_key(app: &ObjectKey) -> ObjectKey {
    app.with_suffix(DEPLOYMENT_SUFFIX)
}

/// Name of the Service owned by `app`.
pub fn service_key(app: &ObjectKey) -> ObjectKey {
    app.with_suffix(SERVICE_SUFFIX)
}

/// Name of the Ingress owned by `app`.
pub fn ingress_key(app: &ObjectKey) -> ObjectKey {
    app.with_suffix(INGRESS_SUFFIX)
}

/// Prefix shared by the generated names of every Pod of `app`'s Deployment.
pub fn pod_name_prefix(app: &ObjectKey) -> String {
    format!("{}{}-", app.name, DEPLOYMENT_SUFFIX)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i32>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deployment {
    pub api_version: String,
    pub kind: String,
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: DeploymentSpec,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl_resource!(Deployment, ResourceKind::Deployment, "apps/v1");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub api_version: String,
    pub kind: String,
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub spec: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl_resource!(Service, ResourceKind::Service, "v1");

/// Routing rule in front of an App's Service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ingress {
    pub api_version: String,
    pub kind: String,
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub spec: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl_resource!(Ingress, ResourceKind::Ingress, "networking.k8s.io/v1");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PodPhase {
    Pending,
    Running,
    Succeeded,
    Failed,
    Unknown,
}

impl PodPhase {
    /// Terminal phases never transition again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, PodPhase::Succeeded | PodPhase::Failed)
    }
}

impl fmt::Display for PodPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PodPhase::Pending => "Pending",
            PodPhase::Running => "Running",
            PodPhase::Succeeded => "Succeeded",
            PodPhase::Failed => "Failed",
            PodPhase::Unknown => "Unknown",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PodStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<PodPhase>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Observed only; kubebuild never creates Pods.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pod {
    pub api_version: String,
    pub kind: String,
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub status: PodStatus,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl_resource!(Pod, ResourceKind::Pod, "v1");

impl Pod {
    pub fn phase(&self) -> Option<PodPhase> {
        self.status.phase
    }

    pub fn is_failed(&self) -> bool {
        self.status.phase == Some(PodPhase::Failed)
    }
}
