use dashmap::DashMap;
use kubebuild_core::{ObjectKey, ResourceKind};
use serde_json::Value;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

/// Format: `Kind/namespace/name`.
pub type StoreKey = String;

pub(crate) fn make_store_key(kind: ResourceKind, namespace: &str, name: &str) -> StoreKey {
    format!("{kind}/{namespace}/{name}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationOp {
    Create,
    Update,
    Delete,
}

impl fmt::Display for MutationOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => write!(f, "create"),
            Self::Update => write!(f, "update"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

/// One successful write, as recorded in the journal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mutation {
    pub op: MutationOp,
    pub kind: ResourceKind,
    pub key: ObjectKey,
    pub field_manager: Option<String>,
    pub grace_period_seconds: Option<i64>,
}

impl Mutation {
    pub(crate) fn new(op: MutationOp, kind: ResourceKind, key: ObjectKey) -> Self {
        Self {
            op,
            kind,
            key,
            field_manager: None,
            grace_period_seconds: None,
        }
    }
}

/// In-memory object store backed by `dashmap`.
///
/// This store provides:
/// - concurrent access to objects keyed by kind, namespace and name
/// - server-assigned `uid`, `resourceVersion` and `creationTimestamp`
/// - optimistic concurrency on `resourceVersion`
/// - a journal of every successful mutation
#[derive(Debug)]
pub struct InMemoryStore {
    pub(crate) data: DashMap<StoreKey, Value>,
    /// Last writer per object, as given in `UpdateOptions::field_manager`.
    pub(crate) field_managers: DashMap<StoreKey, String>,
    pub(crate) version_counter: AtomicU64,
    pub(crate) journal: RwLock<Vec<Mutation>>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            data: DashMap::new(),
            field_managers: DashMap::new(),
            version_counter: AtomicU64::new(1),
            journal: RwLock::new(Vec::new()),
        }
    }

    /// Generates the next resource version.
    pub(crate) fn next_version(&self) -> String {
        self.version_counter
            .fetch_add(1, Ordering::SeqCst)
            .to_string()
    }

    pub(crate) async fn record(&self, mutation: Mutation) {
        tracing::trace!(
            op = %mutation.op,
            kind = %mutation.kind,
            key = %mutation.key,
            "store mutation"
        );
        self.journal.write().await.push(mutation);
    }

    /// Every successful mutation since creation or the last [`clear_journal`](Self::clear_journal).
    pub async fn journal(&self) -> Vec<Mutation> {
        self.journal.read().await.clone()
    }

    pub async fn clear_journal(&self) {
        self.journal.write().await.clear();
    }

    /// Journal entries for one kind.
    pub async fn mutations_of(&self, kind: ResourceKind) -> Vec<Mutation> {
        self.journal
            .read()
            .await
            .iter()
            .filter(|m| m.kind == kind)
            .cloned()
            .collect()
    }

    /// The field manager of the last update to an object, if any.
    pub fn last_field_manager(&self, kind: ResourceKind, key: &ObjectKey) -> Option<String> {
        self.field_managers
            .get(&make_store_key(kind, &key.namespace, &key.name))
            .map(|entry| entry.value().clone())
    }

    pub fn contains(&self, kind: ResourceKind, key: &ObjectKey) -> bool {
        self.data
            .contains_key(&make_store_key(kind, &key.namespace, &key.name))
    }

    pub fn count(&self) -> usize {
        self.data.len()
    }

    pub fn count_by_kind(&self, kind: ResourceKind) -> usize {
        let prefix = format!("{kind}/");
        self.data
            .iter()
            .filter(|entry| entry.key().starts_with(&prefix))
            .count()
    }
}
