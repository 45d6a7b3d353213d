//! Parameter types for store operations.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Filters for [`Store::list`](crate::Store::list).
///
/// Every label pair must match. The name prefix matches either
/// `metadata.generateName` or `metadata.name`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListParams {
    pub label_selector: BTreeMap<String, String>,
    pub name_prefix: Option<String>,
}

impl ListParams {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.label_selector.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.name_prefix = Some(prefix.into());
        self
    }

    /// Returns `true` if `object` passes every filter.
    pub fn matches(&self, object: &Value) -> bool {
        let metadata = &object["metadata"];

        let labels_match = self.label_selector.iter().all(|(key, expected)| {
            metadata["labels"][key.as_str()].as_str() == Some(expected.as_str())
        });
        if !labels_match {
            return false;
        }

        match &self.name_prefix {
            None => true,
            Some(prefix) => ["generateName", "name"].iter().any(|field| {
                metadata[*field]
                    .as_str()
                    .is_some_and(|value| value.starts_with(prefix.as_str()))
            }),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateOptions {
    /// Identity of the writer, recorded by backends that track field ownership.
    pub field_manager: Option<String>,
}

impl UpdateOptions {
    #[must_use]
    pub fn with_field_manager(manager: impl Into<String>) -> Self {
        Self {
            field_manager: Some(manager.into()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteOptions {
    pub grace_period_seconds: Option<i64>,
}

impl DeleteOptions {
    #[must_use]
    pub fn with_grace_period(seconds: i64) -> Self {
        Self {
            grace_period_seconds: Some(seconds),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_list_params_match_everything_by_default() {
        assert!(ListParams::new().matches(&json!({ "metadata": { "name": "a" } })));
    }

    #[test]
    fn test_list_params_name_prefix() {
        let params = ListParams::new().with_name_prefix("web-deployment-");

        assert!(params.matches(&json!({
            "metadata": { "name": "web-deployment-5d9c7-x2x4z" }
        })));
        assert!(params.matches(&json!({
            "metadata": { "name": "renamed", "generateName": "web-deployment-5d9c7-" }
        })));
        assert!(!params.matches(&json!({
            "metadata": { "name": "web-svc" }
        })));
        assert!(!params.matches(&json!({ "metadata": {} })));
    }

    #[test]
    fn test_list_params_labels() {
        let params = ListParams::new().with_label("app", "web").with_label("tier", "front");

        assert!(params.matches(&json!({
            "metadata": { "name": "p", "labels": { "app": "web", "tier": "front", "x": "y" } }
        })));
        assert!(!params.matches(&json!({
            "metadata": { "name": "p", "labels": { "app": "web" } }
        })));
    }
}
