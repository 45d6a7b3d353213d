//! Implementation of the `Store` trait for `InMemoryStore`.

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use serde_json::{Map, Value};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use kubebuild_core::{ObjectKey, ResourceKind};
use kubebuild_storage::{DeleteOptions, ListParams, Store, StoreError, UpdateOptions};

use crate::storage::{InMemoryStore, Mutation, MutationOp, make_store_key};

const DEFAULT_NAMESPACE: &str = "default";

/// Extracts and parses `kind` from an object.
fn extract_kind(object: &Value) -> Result<ResourceKind, StoreError> {
    let kind = object
        .get("kind")
        .and_then(Value::as_str)
        .ok_or_else(|| StoreError::invalid("missing kind field"))?;
    kind.parse::<ResourceKind>()
        .map_err(|_| StoreError::invalid(format!("unknown kind: {kind}")))
}

fn metadata_mut(object: &mut Value) -> Result<&mut Map<String, Value>, StoreError> {
    object
        .get_mut("metadata")
        .and_then(Value::as_object_mut)
        .ok_or_else(|| StoreError::invalid("missing metadata"))
}

fn str_field<'a>(metadata: &'a Map<String, Value>, field: &str) -> Option<&'a str> {
    metadata
        .get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

/// Resolves the key of an incoming object, defaulting the namespace.
fn object_key(metadata: &mut Map<String, Value>) -> Result<ObjectKey, StoreError> {
    let name = str_field(metadata, "name")
        .ok_or_else(|| StoreError::invalid("metadata.name is required"))?
        .to_string();
    let namespace = match str_field(metadata, "namespace") {
        Some(ns) => ns.to_string(),
        None => {
            metadata.insert("namespace".into(), Value::from(DEFAULT_NAMESPACE));
            DEFAULT_NAMESPACE.to_string()
        }
    };
    Ok(ObjectKey::new(namespace, name))
}

/// Fills `metadata.name` from `metadata.generateName` when only the latter is set.
fn generate_name(metadata: &mut Map<String, Value>) {
    if str_field(metadata, "name").is_some() {
        return;
    }
    if let Some(prefix) = str_field(metadata, "generateName") {
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        let name = format!("{prefix}{}", &suffix[..5]);
        metadata.insert("name".into(), Value::from(name));
    }
}

fn now_rfc3339() -> Result<String, StoreError> {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .map_err(|e| StoreError::internal(format!("failed to format timestamp: {e}")))
}

#[async_trait]
impl Store for InMemoryStore {
    async fn get(
        &self,
        kind: ResourceKind,
        namespace: &str,
        name: &str,
    ) -> Result<Value, StoreError> {
        let key = make_store_key(kind, namespace, name);
        self.data
            .get(&key)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| StoreError::not_found(kind, ObjectKey::new(namespace, name)))
    }

    async fn list(
        &self,
        kind: ResourceKind,
        namespace: &str,
        params: &ListParams,
    ) -> Result<Vec<Value>, StoreError> {
        let prefix = format!("{kind}/{namespace}/");
        let mut objects: Vec<(String, Value)> = self
            .data
            .iter()
            .filter(|entry| entry.key().starts_with(&prefix) && params.matches(entry.value()))
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        objects.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(objects.into_iter().map(|(_, object)| object).collect())
    }

    async fn list_all(&self, kind: ResourceKind) -> Result<Vec<Value>, StoreError> {
        let prefix = format!("{kind}/");
        let mut objects: Vec<(String, Value)> = self
            .data
            .iter()
            .filter(|entry| entry.key().starts_with(&prefix))
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        objects.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(objects.into_iter().map(|(_, object)| object).collect())
    }

    async fn create(&self, object: &Value) -> Result<Value, StoreError> {
        let kind = extract_kind(object)?;
        let mut stored = object.clone();
        let metadata = metadata_mut(&mut stored)?;
        generate_name(metadata);
        let key = object_key(metadata)?;

        metadata.insert(
            "uid".into(),
            Value::from(uuid::Uuid::new_v4().to_string()),
        );
        metadata.insert("resourceVersion".into(), Value::from(self.next_version()));
        metadata.insert("creationTimestamp".into(), Value::from(now_rfc3339()?));

        // Entry guard must be released before the journal await
        {
            match self
                .data
                .entry(make_store_key(kind, &key.namespace, &key.name))
            {
                Entry::Occupied(_) => return Err(StoreError::already_exists(kind, key)),
                Entry::Vacant(slot) => {
                    slot.insert(stored.clone());
                }
            }
        }

        self.record(Mutation::new(MutationOp::Create, kind, key))
            .await;
        Ok(stored)
    }

    async fn update(&self, object: &Value, options: &UpdateOptions) -> Result<Value, StoreError> {
        let kind = extract_kind(object)?;
        let mut next = object.clone();
        let metadata = metadata_mut(&mut next)?;
        let key = object_key(metadata)?;
        let store_key = make_store_key(kind, &key.namespace, &key.name);

        {
            let mut current = self
                .data
                .get_mut(&store_key)
                .ok_or_else(|| StoreError::not_found(kind, key.clone()))?;
            let current_meta = &current.value()["metadata"];
            let current_version = current_meta["resourceVersion"]
                .as_str()
                .unwrap_or_default()
                .to_string();

            if let Some(incoming) = str_field(metadata, "resourceVersion")
                && incoming != current_version
            {
                return Err(StoreError::conflict(
                    kind,
                    key,
                    incoming,
                    current_version,
                ));
            }

            for field in ["uid", "creationTimestamp"] {
                if let Some(value) = current_meta.get(field) {
                    metadata.insert(field.into(), value.clone());
                }
            }
            metadata.insert("resourceVersion".into(), Value::from(self.next_version()));
            *current.value_mut() = next.clone();
        }

        if let Some(manager) = &options.field_manager {
            self.field_managers.insert(store_key, manager.clone());
        }

        let mut mutation = Mutation::new(MutationOp::Update, kind, key);
        mutation.field_manager = options.field_manager.clone();
        self.record(mutation).await;
        Ok(next)
    }

    async fn delete(
        &self,
        kind: ResourceKind,
        namespace: &str,
        name: &str,
        options: &DeleteOptions,
    ) -> Result<(), StoreError> {
        let key = ObjectKey::new(namespace, name);
        let store_key = make_store_key(kind, namespace, name);

        if self.data.remove(&store_key).is_none() {
            return Err(StoreError::not_found(kind, key));
        }
        self.field_managers.remove(&store_key);

        let mut mutation = Mutation::new(MutationOp::Delete, kind, key);
        mutation.grace_period_seconds = options.grace_period_seconds;
        self.record(mutation).await;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
