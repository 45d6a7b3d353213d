//! Conversion between the `App` schema versions.
//!
//! `v1` is the hub. `v2` converts into it with [`upgrade`] and back out with
//! [`downgrade`]. The `v2`-only `enablePod` toggle travels through the hub as
//! the string annotation [`ENABLE_POD_ANNOTATION`]; that key is a wire
//! contract with every previously stored object and must never change.
//!
//! Both directions are total. A malformed annotation value downgrades to
//! `false`. A `v2` object whose `enablePod` was never written comes back
//! with `Some(false)`.

use serde_json::Value;
use std::collections::BTreeMap;
use std::str::FromStr;
use thiserror::Error;

use crate::app::{AppSpecV1, AppSpecV2, AppV1, AppV2, V1_API_VERSION, V2_API_VERSION};
use crate::meta::ObjectKey;

/// Hub annotation carrying the `v2` `enablePod` toggle.
pub const ENABLE_POD_ANNOTATION: &str = "apps.v2.buildcrd.k8s.example.io/enable_pod";

#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("object has no apiVersion")]
    MissingApiVersion,

    #[error("unsupported App version: {0}")]
    UnsupportedVersion(String),

    #[error("malformed App object: {0}")]
    Json(#[from] serde_json::Error),
}

/// Converts a `v2` App into the hub version.
///
/// The annotation map is allocated if the source had none.
pub fn upgrade(app: &AppV2) -> AppV1 {
    let mut metadata = app.metadata.clone();
    let enable_pod = app.spec.enable_pod.unwrap_or(false);
    metadata
        .annotations_mut()
        .insert(ENABLE_POD_ANNOTATION.to_string(), enable_pod.to_string());

    AppV1 {
        api_version: V1_API_VERSION.to_string(),
        kind: app.kind.clone(),
        metadata,
        spec: AppSpecV1 {
            replicas: app.spec.replicas,
            image: app.spec.image.clone(),
            enable_service: app.spec.enable_service,
            enable_ingress: app.spec.enable_ingress,
        },
    }
}

/// Converts a hub App into `v2`.
///
/// The conversion annotation is consumed: it is folded into `enablePod` and
/// removed from the `v2` metadata. An annotation map left empty by that
/// removal becomes absent.
pub fn downgrade(app: &AppV1) -> AppV2 {
    let mut metadata = app.metadata.clone();
    let encoded = metadata
        .annotations
        .as_mut()
        .and_then(|annotations| annotations.remove(ENABLE_POD_ANNOTATION));
    if metadata
        .annotations
        .as_ref()
        .is_some_and(BTreeMap::is_empty)
    {
        metadata.annotations = None;
    }

    let enable_pod = matches!(encoded.as_deref(), Some("true"));

    AppV2 {
        api_version: V2_API_VERSION.to_string(),
        kind: app.kind.clone(),
        metadata,
        spec: AppSpecV2 {
            replicas: app.spec.replicas,
            image: app.spec.image.clone(),
            enable_service: app.spec.enable_service,
            enable_ingress: app.spec.enable_ingress,
            enable_pod: Some(enable_pod),
        },
    }
}

/// Known `App` schema versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AppVersion {
    V1,
    V2,
}

impl AppVersion {
    pub fn api_version(&self) -> &'static str {
        match self {
            AppVersion::V1 => V1_API_VERSION,
            AppVersion::V2 => V2_API_VERSION,
        }
    }
}

impl FromStr for AppVersion {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            V1_API_VERSION => Ok(AppVersion::V1),
            V2_API_VERSION => Ok(AppVersion::V2),
            other => Err(ConversionError::UnsupportedVersion(other.to_string())),
        }
    }
}

/// An `App` in any known version.
#[derive(Debug, Clone, PartialEq)]
pub enum VersionedApp {
    V1(AppV1),
    V2(AppV2),
}

impl VersionedApp {
    /// Decode an App, dispatching on its `apiVersion`.
    ///
    /// # Errors
    ///
    /// Returns `ConversionError::UnsupportedVersion` for an unknown version and
    /// `ConversionError::Json` if the body does not match that version's schema.
    pub fn from_value(value: Value) -> Result<Self, ConversionError> {
        let version = value
            .get("apiVersion")
            .and_then(Value::as_str)
            .ok_or(ConversionError::MissingApiVersion)?
            .parse::<AppVersion>()?;

        Ok(match version {
            AppVersion::V1 => VersionedApp::V1(serde_json::from_value(value)?),
            AppVersion::V2 => VersionedApp::V2(serde_json::from_value(value)?),
        })
    }

    pub fn version(&self) -> AppVersion {
        match self {
            VersionedApp::V1(_) => AppVersion::V1,
            VersionedApp::V2(_) => AppVersion::V2,
        }
    }

    pub fn key(&self) -> ObjectKey {
        match self {
            VersionedApp::V1(app) => app.metadata.key(),
            VersionedApp::V2(app) => app.metadata.key(),
        }
    }

    /// Convert into the hub version.
    pub fn into_hub(self) -> AppV1 {
        match self {
            VersionedApp::V1(app) => app,
            VersionedApp::V2(app) => upgrade(&app),
        }
    }

    /// Convert to `target`, going through the hub. Converting to the
    /// object's own version returns it unchanged.
    pub fn convert_to(self, target: AppVersion) -> VersionedApp {
        if self.version() == target {
            return self;
        }

        let hub = self.into_hub();
        match target {
            AppVersion::V1 => VersionedApp::V1(hub),
            AppVersion::V2 => VersionedApp::V2(downgrade(&hub)),
        }
    }

    pub fn to_value(&self) -> Result<Value, ConversionError> {
        let value = match self {
            VersionedApp::V1(app) => serde_json::to_value(app)?,
            VersionedApp::V2(app) => serde_json::to_value(app)?,
        };
        Ok(value)
    }
}

/// Convert a raw App object to `desired_api_version`.
///
/// # Errors
///
/// Fails if either the object's version or the desired version is unknown.
pub fn convert(object: Value, desired_api_version: &str) -> Result<Value, ConversionError> {
    let target = desired_api_version.parse::<AppVersion>()?;
    VersionedApp::from_value(object)?
        .convert_to(target)
        .to_value()
}
