//! Reconciliation engine behaviour against the in-memory store.

use async_trait::async_trait;
use kubebuild_controller::{
    Action, DirectoryTemplateSource, ReconcileOptions, Reconciler, Renderer, Step, StepOutcome,
};
use kubebuild_core::{
    AppSpecV1, AppV1, Deployment, ObjectKey, Pod, ResourceKind, Service, deployment_key,
    service_key,
};
use kubebuild_db_memory::{InMemoryStore, MutationOp};
use kubebuild_storage::{
    DeleteOptions, DynStore, ListParams, Store, StoreError, StoreExt, UpdateOptions,
};
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn app_key() -> ObjectKey {
    ObjectKey::new("shop", "web")
}

fn app(replicas: i32, enable_service: bool, enable_ingress: bool) -> AppV1 {
    AppV1::new("shop", "web").with_spec(AppSpecV1 {
        replicas,
        image: "nginx:1.27".into(),
        enable_service,
        enable_ingress,
    })
}

fn reconciler(store: DynStore, options: ReconcileOptions) -> Reconciler {
    Reconciler::new(store, Renderer::default(), options)
}

async fn seeded(app: AppV1) -> (Arc<InMemoryStore>, AppV1) {
    let memory = Arc::new(InMemoryStore::new());
    let stored = memory.create_typed(&app).await.unwrap();
    memory.clear_journal().await;
    (memory, stored)
}

fn pod(name: &str, phase: &str) -> Value {
    json!({
        "apiVersion": "v1",
        "kind": "Pod",
        "metadata": { "name": name, "namespace": "shop" },
        "status": { "phase": phase }
    })
}

#[tokio::test]
async fn creates_dependents_owned_by_the_app() {
    let (memory, stored_app) = seeded(app(2, true, true)).await;
    let engine = reconciler(memory.clone(), ReconcileOptions::full());

    let report = engine.reconcile_with_report(&app_key()).await.unwrap();
    assert_eq!(report.action, Action::Done);
    assert_eq!(report.outcome(Step::Deployment), Some(StepOutcome::Created));
    assert_eq!(report.outcome(Step::Service), Some(StepOutcome::Created));

    let deployment: Deployment = memory.get_as(&deployment_key(&app_key())).await.unwrap();
    assert_eq!(deployment.spec.replicas, Some(2));
    let owner = deployment.metadata.controller_reference().unwrap();
    assert_eq!(owner.kind, "App");
    assert_eq!(owner.name, "web");
    assert_eq!(owner.uid, stored_app.metadata.uid.clone().unwrap());

    let service: Service = memory.get_as(&service_key(&app_key())).await.unwrap();
    assert_eq!(
        service.metadata.controller_reference().unwrap().uid,
        stored_app.metadata.uid.unwrap()
    );
}

#[tokio::test]
async fn second_pass_is_a_no_op() {
    let (memory, _) = seeded(app(1, true, true)).await;
    let engine = reconciler(memory.clone(), ReconcileOptions::full());

    engine.reconcile_with_report(&app_key()).await.unwrap();
    let first = memory.journal().await;
    for kind in [ResourceKind::Deployment, ResourceKind::Service] {
        let creates = first
            .iter()
            .filter(|m| m.kind == kind && m.op == MutationOp::Create)
            .count();
        let updates = first
            .iter()
            .filter(|m| m.kind == kind && m.op == MutationOp::Update)
            .count();
        assert!(creates <= 1 && updates <= 1, "{kind}: {first:?}");
    }

    memory.clear_journal().await;
    let report = engine.reconcile_with_report(&app_key()).await.unwrap();
    assert_eq!(report.action, Action::Done);
    assert!(memory.journal().await.is_empty());
    assert!(
        report
            .steps
            .iter()
            .all(|(_, outcome)| *outcome == StepOutcome::Unchanged)
    );
}

#[tokio::test]
async fn drifted_replicas_get_exactly_one_update() {
    let (memory, _) = seeded(app(2, true, true)).await;
    let engine = reconciler(memory.clone(), ReconcileOptions::full());
    engine.reconcile_with_report(&app_key()).await.unwrap();

    // Another writer scales down and pauses the Deployment
    let key = deployment_key(&app_key());
    let mut drifted: Value = memory
        .get(ResourceKind::Deployment, &key.namespace, &key.name)
        .await
        .unwrap();
    drifted["spec"]["replicas"] = json!(1);
    drifted["spec"]["paused"] = json!(true);
    memory
        .update(&drifted, &UpdateOptions::with_field_manager("kubectl"))
        .await
        .unwrap();
    memory.clear_journal().await;

    let report = engine.reconcile_with_report(&app_key()).await.unwrap();
    assert_eq!(report.outcome(Step::Deployment), Some(StepOutcome::Updated));

    let journal = memory.journal().await;
    assert_eq!(journal.len(), 1);
    assert_eq!(journal[0].op, MutationOp::Update);
    assert_eq!(journal[0].kind, ResourceKind::Deployment);
    assert_eq!(
        journal[0].field_manager.as_deref(),
        Some("app-resource-controller")
    );

    let after: Value = memory
        .get(ResourceKind::Deployment, &key.namespace, &key.name)
        .await
        .unwrap();
    let mut expected = drifted.clone();
    expected["spec"]["replicas"] = json!(2);
    assert_eq!(after["spec"], expected["spec"]);
    assert_eq!(after["metadata"]["labels"], drifted["metadata"]["labels"]);
}

#[tokio::test]
async fn ingress_toggle_follows_service_toggle() {
    let (memory, _) = seeded(app(1, true, false)).await;
    let engine = reconciler(memory.clone(), ReconcileOptions::full());

    let report = engine.reconcile_with_report(&app_key()).await.unwrap();
    assert_eq!(report.outcome(Step::AppToggles), Some(StepOutcome::Updated));

    let stored: AppV1 = memory.get_as(&app_key()).await.unwrap();
    assert!(stored.spec.enable_service);
    assert!(stored.spec.enable_ingress);

    let app_writes = memory.mutations_of(ResourceKind::App).await;
    assert_eq!(app_writes.len(), 1);
    assert_eq!(
        app_writes[0].field_manager.as_deref(),
        Some("app-resource-controller")
    );
}

#[tokio::test]
async fn minimal_preset_leaves_toggles_and_pods_alone() {
    let (memory, _) = seeded(app(1, false, true)).await;
    memory.create(&pod("web-deployment-7dffccdb9f-aaaaa", "Failed")).await.unwrap();
    memory.clear_journal().await;

    let engine = reconciler(memory.clone(), ReconcileOptions::minimal());
    let report = engine.reconcile_with_report(&app_key()).await.unwrap();
    assert_eq!(report.outcome(Step::AppToggles), None);
    assert_eq!(report.outcome(Step::PodSweep), None);

    assert!(memory.mutations_of(ResourceKind::App).await.is_empty());
    assert!(memory.mutations_of(ResourceKind::Pod).await.is_empty());
}

#[tokio::test]
async fn sweep_deletes_only_failed_pods_of_the_app() {
    let (memory, _) = seeded(app(2, true, true)).await;
    memory.create(&pod("web-deployment-7dffccdb9f-aaaaa", "Failed")).await.unwrap();
    memory.create(&pod("web-deployment-7dffccdb9f-bbbbb", "Running")).await.unwrap();
    memory.create(&pod("api-deployment-5c4d8b7f6-ccccc", "Failed")).await.unwrap();
    memory.clear_journal().await;

    let engine = reconciler(
        memory.clone(),
        ReconcileOptions::full().with_pod_grace_period(10),
    );
    let report = engine.reconcile_with_report(&app_key()).await.unwrap();
    assert_eq!(report.outcome(Step::PodSweep), Some(StepOutcome::Deleted(1)));

    let deletes = memory.mutations_of(ResourceKind::Pod).await;
    assert_eq!(deletes.len(), 1);
    assert_eq!(deletes[0].op, MutationOp::Delete);
    assert_eq!(deletes[0].key.name, "web-deployment-7dffccdb9f-aaaaa");
    assert_eq!(deletes[0].grace_period_seconds, Some(10));

    let remaining: Vec<Pod> = memory.list_as("shop", &ListParams::new()).await.unwrap();
    let names: Vec<&str> = remaining.iter().map(|p| p.metadata.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["api-deployment-5c4d8b7f6-ccccc", "web-deployment-7dffccdb9f-bbbbb"]
    );
}

#[tokio::test]
async fn missing_template_requeues_without_mutation() {
    let (memory, _) = seeded(app(2, true, true)).await;
    let dir = tempfile::tempdir().unwrap();
    let engine = Reconciler::new(
        memory.clone(),
        Renderer::new(Arc::new(DirectoryTemplateSource::new(dir.path()))),
        ReconcileOptions::full(),
    );

    let report = engine.reconcile_with_report(&app_key()).await.unwrap();
    assert_eq!(report.action, Action::RequeueAfter(Duration::from_secs(3)));
    assert_eq!(report.failed_step, Some(Step::Deployment));
    assert!(memory.journal().await.is_empty());
}

#[tokio::test]
async fn missing_app_follows_policy() {
    let memory: DynStore = Arc::new(InMemoryStore::new());

    let full = reconciler(memory.clone(), ReconcileOptions::full());
    let report = full.reconcile_with_report(&app_key()).await.unwrap();
    assert_eq!(report.action, Action::Done);
    assert!(report.steps.is_empty());

    let minimal = reconciler(memory, ReconcileOptions::minimal());
    let err = minimal.reconcile_with_report(&app_key()).await.unwrap_err();
    assert!(err.is_not_found());
}

/// Store wrapper that fails selected operations.
struct FlakyStore {
    inner: Arc<InMemoryStore>,
    failures: Mutex<Vec<(&'static str, ResourceKind)>>,
}

impl FlakyStore {
    fn new(inner: Arc<InMemoryStore>) -> Self {
        Self {
            inner,
            failures: Mutex::new(Vec::new()),
        }
    }

    fn fail(&self, op: &'static str, kind: ResourceKind) {
        self.failures.lock().unwrap().push((op, kind));
    }

    fn check(&self, op: &'static str, kind: ResourceKind) -> Result<(), StoreError> {
        if self.failures.lock().unwrap().contains(&(op, kind)) {
            return Err(StoreError::connection(format!("injected {op} failure")));
        }
        Ok(())
    }
}

fn kind_of(object: &Value) -> ResourceKind {
    object["kind"].as_str().unwrap().parse().unwrap()
}

#[async_trait]
impl Store for FlakyStore {
    async fn get(&self, kind: ResourceKind, namespace: &str, name: &str) -> Result<Value, StoreError> {
        self.check("get", kind)?;
        self.inner.get(kind, namespace, name).await
    }

    async fn list(
        &self,
        kind: ResourceKind,
        namespace: &str,
        params: &ListParams,
    ) -> Result<Vec<Value>, StoreError> {
        self.check("list", kind)?;
        self.inner.list(kind, namespace, params).await
    }

    async fn list_all(&self, kind: ResourceKind) -> Result<Vec<Value>, StoreError> {
        self.check("list", kind)?;
        self.inner.list_all(kind).await
    }

    async fn create(&self, object: &Value) -> Result<Value, StoreError> {
        self.check("create", kind_of(object))?;
        self.inner.create(object).await
    }

    async fn update(&self, object: &Value, options: &UpdateOptions) -> Result<Value, StoreError> {
        self.check("update", kind_of(object))?;
        self.inner.update(object, options).await
    }

    async fn delete(
        &self,
        kind: ResourceKind,
        namespace: &str,
        name: &str,
        options: &DeleteOptions,
    ) -> Result<(), StoreError> {
        self.check("delete", kind)?;
        self.inner.delete(kind, namespace, name, options).await
    }

    fn backend_name(&self) -> &'static str {
        "flaky"
    }
}

#[tokio::test]
async fn create_failure_stops_before_later_steps() {
    let (memory, _) = seeded(app(2, true, true)).await;
    let flaky = Arc::new(FlakyStore::new(memory.clone()));
    flaky.fail("create", ResourceKind::Deployment);

    let engine = reconciler(flaky, ReconcileOptions::full());
    let report = engine.reconcile_with_report(&app_key()).await.unwrap();
    assert_eq!(report.action, Action::RequeueAfter(Duration::from_secs(3)));
    assert_eq!(report.failed_step, Some(Step::Deployment));
    assert!(memory.journal().await.is_empty());
}

#[tokio::test]
async fn get_failure_other_than_not_found_does_not_create() {
    let (memory, _) = seeded(app(2, true, true)).await;
    let flaky = Arc::new(FlakyStore::new(memory.clone()));
    flaky.fail("get", ResourceKind::Service);

    let engine = reconciler(flaky, ReconcileOptions::full());
    let report = engine.reconcile_with_report(&app_key()).await.unwrap();
    assert_eq!(report.failed_step, Some(Step::Service));
    assert_eq!(report.outcome(Step::Deployment), Some(StepOutcome::Created));
    assert!(memory.mutations_of(ResourceKind::Service).await.is_empty());
}

#[tokio::test]
async fn delete_failure_aborts_the_sweep() {
    let (memory, _) = seeded(app(2, true, true)).await;
    memory.create(&pod("web-deployment-7dffccdb9f-aaaaa", "Failed")).await.unwrap();
    memory.create(&pod("web-deployment-7dffccdb9f-bbbbb", "Failed")).await.unwrap();
    let flaky = Arc::new(FlakyStore::new(memory.clone()));
    flaky.fail("delete", ResourceKind::Pod);

    let engine = reconciler(flaky, ReconcileOptions::full());
    let report = engine.reconcile_with_report(&app_key()).await.unwrap();
    assert_eq!(report.failed_step, Some(Step::PodSweep));
    assert_eq!(report.action, Action::RequeueAfter(Duration::from_secs(3)));
    assert_eq!(memory.count_by_kind(ResourceKind::Pod), 2);
}

#[tokio::test]
async fn retry_after_failure_converges() {
    let (memory, _) = seeded(app(2, true, false)).await;
    let flaky = Arc::new(FlakyStore::new(memory.clone()));
    flaky.fail("update", ResourceKind::App);

    let engine = reconciler(flaky.clone(), ReconcileOptions::full());
    let report = engine.reconcile_with_report(&app_key()).await.unwrap();
    assert_eq!(report.failed_step, Some(Step::AppToggles));

    flaky.failures.lock().unwrap().clear();
    let report = engine.reconcile_with_report(&app_key()).await.unwrap();
    assert_eq!(report.action, Action::Done);
    assert_eq!(report.outcome(Step::Deployment), Some(StepOutcome::Unchanged));
    assert_eq!(report.outcome(Step::AppToggles), Some(StepOutcome::Updated));
}

#[tokio::test]
async fn scalar_like_names_converge() {
    for (namespace, name) in [("shop", "123"), ("shop", "true"), ("shop", "null"), ("2024", "web")] {
        let app = AppV1::new(namespace, name).with_spec(AppSpecV1 {
            replicas: 1,
            image: r#"registry.local/we"ird:1"#.into(),
            enable_service: true,
            enable_ingress: true,
        });
        let (memory, _) = seeded(app).await;
        let engine = reconciler(memory.clone(), ReconcileOptions::full());
        let key = ObjectKey::new(namespace, name);

        let report = engine.reconcile_with_report(&key).await.unwrap();
        assert_eq!(report.action, Action::Done, "{key}: {report:?}");
        assert_eq!(report.outcome(Step::Deployment), Some(StepOutcome::Created));
        assert_eq!(report.outcome(Step::Service), Some(StepOutcome::Created));

        let deployment: Deployment = memory.get_as(&deployment_key(&key)).await.unwrap();
        assert_eq!(deployment.metadata.namespace, namespace);
        assert_eq!(deployment.metadata.labels["app"], name);
        assert!(memory.get_as::<Service>(&service_key(&key)).await.is_ok());
    }
}
