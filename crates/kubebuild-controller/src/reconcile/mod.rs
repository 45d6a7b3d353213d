//! Desired-state reconciliation for Apps.
//!
//! One invocation reads the App, then converges its dependents in order:
//! - the Deployment (`<app>-deployment`), created from a template and kept at
//!   the App's replica count
//! - the Service (`<app>-svc`), created once; with toggle sync the App's
//!   `enableIngress` is forced to follow `enableService`
//! - Failed Pods of the Deployment, deleted with a fixed grace period
//!
//! The first failing step ends the invocation with a fixed-delay requeue.
//! Nothing is carried between invocations; each one re-reads everything.

mod deployment;
mod options;
mod pods;
mod service;

pub use options::{
    DEFAULT_FIELD_MANAGER, DEFAULT_POD_GRACE_PERIOD_SECONDS, DEFAULT_REQUEUE_AFTER,
    MissingAppPolicy, Preset, ReconcileOptions,
};

use async_trait::async_trait;
use kubebuild_core::{AppV1, ObjectKey};
use kubebuild_storage::{DynStore, StoreExt};
use std::fmt;
use std::time::Duration;
use tracing::Instrument;

use crate::error::{ReconcileError, Result};
use crate::render::Renderer;

/// What the caller should do after an invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Done,
    RequeueAfter(Duration),
}

/// A unit of work inside one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    Deployment,
    Service,
    AppToggles,
    PodSweep,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Deployment => write!(f, "deployment"),
            Step::Service => write!(f, "service"),
            Step::AppToggles => write!(f, "app_toggles"),
            Step::PodSweep => write!(f, "pod_sweep"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Created,
    Updated,
    Unchanged,
    /// Number of Pods removed by the sweep.
    Deleted(usize),
}

/// Per-step record of one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    pub action: Action,
    pub steps: Vec<(Step, StepOutcome)>,
    pub failed_step: Option<Step>,
}

impl ReconcileReport {
    fn new() -> Self {
        Self {
            action: Action::Done,
            steps: Vec::new(),
            failed_step: None,
        }
    }

    pub fn outcome(&self, step: Step) -> Option<StepOutcome> {
        self.steps
            .iter()
            .find(|(s, _)| *s == step)
            .map(|(_, outcome)| *outcome)
    }
}

/// Anything the controller runtime can drive.
#[async_trait]
pub trait Reconcile: Send + Sync {
    async fn reconcile(&self, key: &ObjectKey) -> Result<Action>;
}

/// The App reconciler.
#[derive(Clone)]
pub struct Reconciler {
    pub(crate) store: DynStore,
    pub(crate) renderer: Renderer,
    pub(crate) options: ReconcileOptions,
}

impl fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reconciler")
            .field("store", &self.store.backend_name())
            .field("renderer", &self.renderer)
            .field("options", &self.options)
            .finish()
    }
}

impl Reconciler {
    pub fn new(store: DynStore, renderer: Renderer, options: ReconcileOptions) -> Self {
        Self {
            store,
            renderer,
            options,
        }
    }

    pub fn options(&self) -> &ReconcileOptions {
        &self.options
    }

    pub fn store(&self) -> &DynStore {
        &self.store
    }

    /// Run one invocation and return the per-step report.
    ///
    /// # Errors
    ///
    /// Only the App fetch can fail the invocation; step failures are folded
    /// into a requeue.
    pub async fn reconcile_with_report(&self, key: &ObjectKey) -> Result<ReconcileReport> {
        let span = tracing::info_span!("reconcile", app = %key);
        self.run(key).instrument(span).await
    }

    async fn run(&self, key: &ObjectKey) -> Result<ReconcileReport> {
        let mut report = ReconcileReport::new();

        let app = match self.store.get_as::<AppV1>(key).await {
            Ok(app) => app,
            Err(e) if e.is_not_found() && self.options.missing_app == MissingAppPolicy::Ignore => {
                tracing::debug!("App no longer exists, nothing to do");
                return Ok(report);
            }
            Err(e) => {
                if e.is_not_found() {
                    tracing::debug!("App no longer exists");
                } else {
                    tracing::error!(error = %e, "failed to get App");
                }
                return Err(ReconcileError::Store(e));
            }
        };

        let deployment = self.reconcile_deployment(&app).await;
        if !self.record(&mut report, Step::Deployment, deployment) {
            return Ok(report);
        }

        let service = self.reconcile_service(&app).await;
        if !self.record(&mut report, Step::Service, service) {
            return Ok(report);
        }

        if self.options.sync_toggles {
            let toggles = self.sync_toggles(app.clone()).await;
            if !self.record(&mut report, Step::AppToggles, toggles) {
                return Ok(report);
            }
        }

        if self.options.sweep_failed_pods {
            let sweep = self.sweep_failed_pods(&app).await;
            if !self.record(&mut report, Step::PodSweep, sweep) {
                return Ok(report);
            }
        }

        tracing::debug!(steps = report.steps.len(), "reconcile complete");
        Ok(report)
    }

    /// Adds a step result to `report`. Returns `false` if the invocation must stop.
    fn record(
        &self,
        report: &mut ReconcileReport,
        step: Step,
        result: Result<StepOutcome>,
    ) -> bool {
        match result {
            Ok(outcome) => {
                if outcome != StepOutcome::Unchanged {
                    tracing::info!(step = %step, outcome = ?outcome, "step converged");
                } else {
                    tracing::debug!(step = %step, outcome = ?outcome, "step converged");
                }
                report.steps.push((step, outcome));
                true
            }
            Err(e) => {
                tracing::warn!(
                    step = %step,
                    error = %e,
                    retryable = e.is_retryable(),
                    requeue_after_ms = self.options.requeue_after.as_millis() as u64,
                    "step failed, requeueing"
                );
                report.failed_step = Some(step);
                report.action = Action::RequeueAfter(self.options.requeue_after);
                false
            }
        }
    }
}

#[async_trait]
impl Reconcile for Reconciler {
    async fn reconcile(&self, key: &ObjectKey) -> Result<Action> {
        self.reconcile_with_report(key)
            .await
            .map(|report| report.action)
    }
}
