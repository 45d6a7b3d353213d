//! Object metadata shared by every kind.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{CoreError, Result};
use crate::resource::Resource;

/// Namespace and name of an object. Unique per kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectKey {
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Key of a dependent object named `<name><suffix>` in the same namespace.
    pub fn with_suffix(&self, suffix: &str) -> Self {
        Self {
            namespace: self.namespace.clone(),
            name: format!("{}{}", self.name, suffix),
        }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Back-reference from a dependent object to the object that controls it.
///
/// Only ever written at creation time. The store uses it for cascading
/// deletion; kubebuild never follows it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerReference {
    pub api_version: String,
    pub kind: String,
    pub name: String,
    pub uid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub controller: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_owner_deletion: Option<bool>,
}

impl OwnerReference {
    /// Build a controller reference pointing at `owner`.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::MissingOwnerUid` if the owner has not been persisted yet.
    pub fn controlled_by<R: Resource>(owner: &R) -> Result<Self> {
        let meta = owner.meta();
        let uid = meta
            .uid
            .clone()
            .filter(|uid| !uid.is_empty())
            .ok_or_else(|| CoreError::missing_owner_uid(R::KIND.as_str(), &meta.name))?;

        Ok(Self {
            api_version: R::API_VERSION.to_string(),
            kind: R::KIND.to_string(),
            name: meta.name.clone(),
            uid,
            controller: Some(true),
            block_owner_deletion: Some(true),
        })
    }

    pub fn is_controller(&self) -> bool {
        self.controller.unwrap_or(false)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generate_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    /// Allocated lazily; `None` and an empty map are distinct on the wire.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub owner_references: Vec<OwnerReference>,
    /// Metadata fields kubebuild does not model, kept verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ObjectMeta {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            ..Default::default()
        }
    }

    pub fn key(&self) -> ObjectKey {
        ObjectKey::new(&self.namespace, &self.name)
    }

    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.annotations
            .as_ref()
            .and_then(|annotations| annotations.get(key))
            .map(String::as_str)
    }

    /// Mutable access to the annotation map, allocating it if absent.
    pub fn annotations_mut(&mut self) -> &mut BTreeMap<String, String> {
        self.annotations.get_or_insert_with(BTreeMap::new)
    }

    pub fn controller_reference(&self) -> Option<&OwnerReference> {
        self.owner_references.iter().find(|r| r.is_controller())
    }

    /// Record `owner` as the controller of this object.
    ///
    /// Re-setting the same controller is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::AlreadyOwned` if a different controller is already set.
    pub fn set_controller_reference(&mut self, owner: OwnerReference, kind: &str) -> Result<()> {
        if let Some(existing) = self.controller_reference() {
            if existing.uid != owner.uid {
                return Err(CoreError::already_owned(
                    kind,
                    &self.name,
                    format!("{}/{}", existing.kind, existing.name),
                ));
            }
        }

        self.owner_references.retain(|r| r.uid != owner.uid);
        self.owner_references.push(owner);
        Ok(())
    }
}
