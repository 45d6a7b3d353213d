//! # kubebuild-core
//!
//! Core types shared by every kubebuild crate:
//!
//! - the `App` entity in its two schema versions (`v1` is the hub and storage
//!   version, `v2` is the spoke served to newer clients)
//! - object metadata, owner references and namespaced keys
//! - the dependent resource shapes the controller manages (Deployment,
//!   Service, Ingress) or observes (Pod)
//! - lossless conversion between the two `App` versions
//! - the admission rules (defaulting and validation) applied before an `App`
//!   is accepted

pub mod admission;
pub mod app;
pub mod conversion;
pub mod error;
pub mod kind;
pub mod meta;
pub mod resource;
pub mod workload;

pub use admission::{FieldViolation, ValidationError, apply_defaults, check, validate, validate_update};
pub use app::{API_GROUP, APP_KIND, AppSpecV1, AppSpecV2, AppV1, AppV2, V1_API_VERSION, V2_API_VERSION};
pub use conversion::{
    AppVersion, ConversionError, ENABLE_POD_ANNOTATION, VersionedApp, convert, downgrade, upgrade,
};
pub use error::{CoreError, ErrorCategory, Result};
pub use kind::ResourceKind;
pub use meta::{ObjectKey, ObjectMeta, OwnerReference};
pub use resource::Resource;
pub use workload::{
    Deployment, DeploymentSpec, Ingress, Pod, PodPhase, PodStatus, Service, deployment_key,
    ingress_key, pod_name_prefix, service_key,
};
